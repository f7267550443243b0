use std::env;
use tracing::warn;

pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub jwt_secret: String,
    pub notification_url: String,
    pub notification_api_key: String,
    pub store_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, using empty value");
                    String::new()
                }),
            store_api_key: env::var("STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            notification_url: env::var("NOTIFICATION_URL")
                .unwrap_or_else(|_| {
                    warn!("NOTIFICATION_URL not set, using empty value");
                    String::new()
                }),
            notification_api_key: env::var("NOTIFICATION_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("NOTIFICATION_API_KEY not set, using empty value");
                    String::new()
                }),
            store_timeout_secs: env::var("STORE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_STORE_TIMEOUT_SECS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty()
            && !self.store_api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_notifications_configured(&self) -> bool {
        !self.notification_url.is_empty()
    }
}
