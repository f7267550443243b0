// libs/appointment-cell/src/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;
use shared_models::auth::Role;

use crate::models::{
    AppointmentDraft, AppointmentError, AppointmentPatch, AppointmentRecord, AppointmentStatus,
};

/// Persistence seam for appointment records. `update_fields` is a
/// compare-and-swap on `updated_at`: the write only lands if the record has
/// not changed since `expected_version` was read, otherwise the caller gets
/// `VersionConflict` and must re-fetch before retrying.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, draft: AppointmentDraft) -> Result<AppointmentRecord, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<AppointmentRecord, AppointmentError>;

    async fn list_by_participant(
        &self,
        user_id: Uuid,
        role_hint: Role,
        status_filter: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError>;

    async fn update_fields(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: DateTime<Utc>,
    ) -> Result<AppointmentRecord, AppointmentError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError>;
}

/// Version timestamps are equality-matched on the wire, so they are
/// truncated to the store's microsecond precision before being persisted.
pub fn version_now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

/// The version written by a commit must be strictly greater than the one it
/// replaces, even when both land within the same clock reading; otherwise a
/// writer still holding the older version would pass the equality match and
/// overwrite the newer state.
pub fn next_version(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = version_now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

pub struct RestAppointmentStore {
    store: StoreClient,
}

impl RestAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    fn participant_column(role_hint: Role) -> Result<&'static str, AppointmentError> {
        match role_hint {
            Role::Patient => Ok("patient_id"),
            Role::Doctor => Ok("doctor_id"),
            Role::Nurse => Ok("nurse_id"),
            _ => Err(AppointmentError::Auth(format!(
                "Role {} has no appointment listing",
                role_hint
            ))),
        }
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }

    fn parse_record(value: &Value) -> Result<AppointmentRecord, AppointmentError> {
        serde_json::from_value(value.clone())
            .map_err(|e| AppointmentError::Store(format!("Failed to parse appointment: {}", e)))
    }
}

#[async_trait]
impl AppointmentStore for RestAppointmentStore {
    async fn create(&self, draft: AppointmentDraft) -> Result<AppointmentRecord, AppointmentError> {
        debug!(
            "Creating appointment for patient {} with doctor {}",
            draft.patient_id, draft.doctor_id
        );

        let now = version_now();
        let appointment_data = json!({
            "patient_id": draft.patient_id,
            "doctor_id": draft.doctor_id,
            "nurse_id": null,
            "patient_name": draft.patient_name,
            "doctor_name": draft.doctor_name,
            "date_time": draft.date_time.to_rfc3339(),
            "reason": draft.reason,
            "notes": draft.notes,
            "status": AppointmentStatus::Pending.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(appointment_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        let created = result
            .first()
            .ok_or_else(|| AppointmentError::Store("Failed to create appointment".to_string()))?;

        Self::parse_record(created)
    }

    async fn get(&self, id: Uuid) -> Result<AppointmentRecord, AppointmentError> {
        debug!("Fetching appointment: {}", id);

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        match result.first() {
            Some(value) => Self::parse_record(value),
            None => Err(AppointmentError::NotFound),
        }
    }

    async fn list_by_participant(
        &self,
        user_id: Uuid,
        role_hint: Role,
        status_filter: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        let column = Self::participant_column(role_hint)?;
        debug!(
            "Listing appointments where {}={} (status: {:?})",
            column, user_id, status_filter
        );

        let mut path = format!(
            "/rest/v1/appointments?{}=eq.{}&order=date_time.asc",
            column, user_id
        );
        if let Some(status) = status_filter {
            path.push_str(&format!("&status=eq.{}", status));
        }

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        result
            .iter()
            .map(Self::parse_record)
            .collect::<Result<Vec<AppointmentRecord>, AppointmentError>>()
    }

    async fn update_fields(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: DateTime<Utc>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        debug!("Updating appointment {} (version {})", id, expected_version);

        let mut update_data = serde_json::to_value(&patch)
            .map_err(|e| AppointmentError::Store(e.to_string()))?;
        if let Value::Object(map) = &mut update_data {
            map.insert(
                "updated_at".to_string(),
                json!(next_version(expected_version).to_rfc3339()),
            );
        }

        // Conditional write: the filter only matches while the stored
        // version equals what the caller last read.
        let version_str = expected_version.to_rfc3339();
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&updated_at=eq.{}",
            id,
            urlencoding::encode(&version_str)
        );

        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(update_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        match result.first() {
            Some(value) => Self::parse_record(value),
            // Nothing matched: either the record is gone, or someone else
            // won the race. Disambiguate with a plain fetch.
            None => match self.get(id).await {
                Ok(_) => Err(AppointmentError::VersionConflict),
                Err(AppointmentError::NotFound) => Err(AppointmentError::NotFound),
                Err(e) => Err(e),
            },
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        debug!("Deleting appointment: {}", id);

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .store
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::Store(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        Ok(())
    }
}
