mod email;
mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AppConfig;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

/// A channel for human-readable status and error messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// Build every channel the config enables: email when recipients are
/// configured, push when a webhook URL is set. An empty result means
/// notifications are disabled.
pub fn create_notifiers(config: &AppConfig) -> Vec<Arc<dyn Notifier>> {
    let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();

    if !config.email.recipients.is_empty() {
        channels.push(Arc::new(EmailNotifier::new(config.email.clone())));
    }

    if let Some(url) = config
        .push
        .webhook_url
        .as_deref()
        .filter(|url| !url.is_empty())
    {
        channels.push(Arc::new(WebhookNotifier::new(url.to_string())));
    }

    channels
}
