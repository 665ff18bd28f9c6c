use std::process::Stdio;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::Notifier;
use crate::config::EmailConfig;

const SENDMAIL: &str = "/usr/sbin/sendmail";
const SUBJECT_PREFIX: &str = "[zbakd]";

/// Delivers plain-text mail by piping a composed message to sendmail.
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn compose(&self, subject: &str, body: &str) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {SUBJECT_PREFIX} {subject}\r\n\r\n{body}\n",
            self.config.from,
            self.config.recipients.join(", "),
        )
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.compose(subject, body);

        // -t reads recipients from the message headers, -i keeps a lone dot
        // from terminating the input.
        let mut child = Command::new(SENDMAIL)
            .args(["-t", "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn sendmail")?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("sendmail stdin not captured"))?;
        stdin
            .write_all(message.as_bytes())
            .await
            .context("failed to write message to sendmail")?;
        drop(stdin);

        let status = child
            .wait()
            .await
            .context("failed to wait for sendmail")?;
        if !status.success() {
            bail!("sendmail exited with status {status}");
        }

        tracing::debug!(
            recipients = %self.config.recipients.join(", "),
            %subject,
            "email sent"
        );
        Ok(())
    }
}
