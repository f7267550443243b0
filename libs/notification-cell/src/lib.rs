pub mod models;
pub mod services;

pub use models::{NotificationError, PushMessage};
pub use services::gateway::{NotificationGateway, PushGateway};
