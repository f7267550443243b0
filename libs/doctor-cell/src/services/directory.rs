use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{DoctorError, DoctorSummary};

/// Lookup seam consumed at booking time: resolve a doctor id to a bookable
/// profile, or list doctors for the booking UI's picker.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool, DoctorError>;

    async fn get_summary(&self, doctor_id: Uuid) -> Result<DoctorSummary, DoctorError>;

    async fn list_available(
        &self,
        specialty_filter: Option<&str>,
    ) -> Result<Vec<DoctorSummary>, DoctorError>;
}

pub struct RestDoctorDirectory {
    store: StoreClient,
}

impl RestDoctorDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }
}

#[async_trait]
impl DoctorDirectory for RestDoctorDirectory {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool, DoctorError> {
        match self.get_summary(doctor_id).await {
            Ok(doctor) => Ok(doctor.is_bookable()),
            Err(DoctorError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_summary(&self, doctor_id: Uuid) -> Result<DoctorSummary, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::Directory(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: DoctorSummary = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::Directory(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    async fn list_available(
        &self,
        specialty_filter: Option<&str>,
    ) -> Result<Vec<DoctorSummary>, DoctorError> {
        debug!("Listing available doctors (specialty: {:?})", specialty_filter);

        let mut path =
            "/rest/v1/doctors?is_available=eq.true&is_verified=eq.true&order=full_name.asc"
                .to_string();
        if let Some(specialty) = specialty_filter {
            path.push_str(&format!("&specialty=eq.{}", urlencoding::encode(specialty)));
        }

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DoctorError::Directory(e.to_string()))?;

        let doctors: Vec<DoctorSummary> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorSummary>, _>>()
            .map_err(|e| DoctorError::Directory(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }
}
