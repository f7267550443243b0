use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directory view of a doctor, as stored by the provider registry. Only
/// verified and available doctors are bookable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialty: String,
    pub is_verified: bool,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorSummary {
    pub fn is_bookable(&self) -> bool {
        self.is_verified && self.is_available
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Directory error: {0}")]
    Directory(String),
}
