use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A push message addressed to one user. The delivery service resolves the
/// target's device tokens; the core only knows user ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub target_user_id: Uuid,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

impl PushMessage {
    pub fn new(target_user_id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target_user_id,
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<String>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}
