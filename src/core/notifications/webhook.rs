use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::Notifier;

/// Push channel: POSTs the subject/body pair as JSON to a webhook endpoint.
pub struct WebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    fn format_message(&self, subject: &str, body: &str) -> serde_json::Value {
        json!({
            "subject": subject,
            "body": body,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let payload = self.format_message(subject, body);
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_subject_and_body() {
        let notifier = WebhookNotifier::new("https://hooks.example.org".to_string());
        let payload = notifier.format_message("Error backing up TANK1", "import failed");

        assert_eq!(payload["subject"], "Error backing up TANK1");
        assert_eq!(payload["body"], "import failed");
    }
}
