use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{NotificationError, PushMessage};

/// Fire-and-forget delivery seam. Callers treat failures as log-only: a
/// delivery outage must never fail or block an appointment mutation.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, message: PushMessage) -> Result<(), NotificationError>;
}

/// Gateway posting to the push-delivery service, which fans the message out
/// to the target user's registered device tokens.
pub struct PushGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PushGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.notification_url.clone(),
            api_key: config.notification_api_key.clone(),
        }
    }
}

#[async_trait]
impl NotificationGateway for PushGateway {
    async fn send(&self, message: PushMessage) -> Result<(), NotificationError> {
        if self.base_url.is_empty() {
            debug!(
                "Notification service not configured, dropping message for user {}",
                message.target_user_id
            );
            return Ok(());
        }

        let url = format!("{}/notify-user", self.base_url);
        debug!(
            "Sending notification to user {}: {}",
            message.target_user_id, message.title
        );

        let payload = json!({
            "user_id": message.target_user_id,
            "title": message.title,
            "body": message.body,
            "data": message.data,
        });

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "Notification delivery rejected ({}) for user {}: {}",
                status, message.target_user_id, error_text
            );
            return Err(NotificationError::Rejected(format!(
                "{}: {}",
                status, error_text
            )));
        }

        debug!("Notification delivered for user {}", message.target_user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn push_message_builder_collects_data() {
        let target = Uuid::new_v4();
        let message = PushMessage::new(target, "Appointment Confirmed", "See you tomorrow")
            .with_data("type", "appointment_update")
            .with_data("new_status", "confirmed");

        assert_eq!(message.target_user_id, target);
        assert_eq!(message.data.get("type").unwrap(), "appointment_update");
        assert_eq!(message.data.get("new_status").unwrap(), "confirmed");
    }
}
