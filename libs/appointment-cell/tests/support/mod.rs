// Shared test doubles implementing the collaborator seams of the
// appointment core. The in-memory store enforces the same compare-and-swap
// contract as the REST store, so concurrency behavior is exercised for
// real.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentDraft, AppointmentError, AppointmentPatch, AppointmentRecord, AppointmentStatus,
};
use appointment_cell::services::AppointmentService;
use appointment_cell::store::{next_version, version_now, AppointmentStore};
use doctor_cell::{DoctorDirectory, DoctorError, DoctorSummary};
use notification_cell::{NotificationError, NotificationGateway, PushMessage};
use shared_models::auth::Role;

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<Uuid, AppointmentRecord>>,
    fail_writes: Mutex<Option<AppointmentError>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a record directly, bypassing create-time rules.
    pub fn insert_record(&self, record: AppointmentRecord) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    pub fn record(&self, id: Uuid) -> Option<AppointmentRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Make every subsequent write fail with the given error.
    pub fn fail_writes_with(&self, error: AppointmentError) {
        *self.fail_writes.lock().unwrap() = Some(error);
    }

    pub fn heal_writes(&self) {
        *self.fail_writes.lock().unwrap() = None;
    }

    fn write_gate(&self) -> Result<(), AppointmentError> {
        match self.fail_writes.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn create(&self, draft: AppointmentDraft) -> Result<AppointmentRecord, AppointmentError> {
        self.write_gate()?;

        let now = version_now();
        let record = AppointmentRecord {
            id: Uuid::new_v4(),
            patient_id: draft.patient_id,
            doctor_id: draft.doctor_id,
            nurse_id: None,
            patient_name: draft.patient_name,
            doctor_name: draft.doctor_name,
            date_time: draft.date_time,
            reason: draft.reason,
            notes: draft.notes,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.records.lock().unwrap().insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<AppointmentRecord, AppointmentError> {
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn list_by_participant(
        &self,
        user_id: Uuid,
        role_hint: Role,
        status_filter: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        let records = self.records.lock().unwrap();
        let mut result: Vec<AppointmentRecord> = records
            .values()
            .filter(|r| match role_hint {
                Role::Patient => r.patient_id == user_id,
                Role::Doctor => r.doctor_id == user_id,
                Role::Nurse => r.nurse_id == Some(user_id),
                _ => false,
            })
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        result.sort_by_key(|r| r.date_time);
        Ok(result)
    }

    async fn update_fields(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: DateTime<Utc>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.write_gate()?;

        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&id).ok_or(AppointmentError::NotFound)?;

        if record.updated_at != expected_version {
            return Err(AppointmentError::VersionConflict);
        }

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(date_time) = patch.date_time {
            record.date_time = date_time;
        }
        if let Some(nurse_id) = patch.nurse_id {
            record.nurse_id = nurse_id;
        }
        if let Some(notes) = patch.notes {
            record.notes = Some(notes);
        }
        record.updated_at = next_version(record.updated_at);

        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.write_gate()?;

        self.records
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(AppointmentError::NotFound)
    }
}

// ==============================================================================
// RACING STORE
// ==============================================================================

/// Wraps the in-memory store and injects one competing write just before a
/// chosen update lands, so the wrapped call loses the compare-and-swap the
/// way a concurrent writer would make it lose.
pub struct RacingStore {
    inner: Arc<InMemoryStore>,
    competitor: Mutex<Option<(Uuid, AppointmentPatch)>>,
}

impl RacingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            competitor: Mutex::new(None),
        })
    }

    /// Arrange for `patch` to be applied to `id` immediately before the
    /// next `update_fields` call targeting it.
    pub fn race_with(&self, id: Uuid, patch: AppointmentPatch) {
        *self.competitor.lock().unwrap() = Some((id, patch));
    }
}

#[async_trait]
impl AppointmentStore for RacingStore {
    async fn create(&self, draft: AppointmentDraft) -> Result<AppointmentRecord, AppointmentError> {
        self.inner.create(draft).await
    }

    async fn get(&self, id: Uuid) -> Result<AppointmentRecord, AppointmentError> {
        self.inner.get(id).await
    }

    async fn list_by_participant(
        &self,
        user_id: Uuid,
        role_hint: Role,
        status_filter: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        self.inner
            .list_by_participant(user_id, role_hint, status_filter)
            .await
    }

    async fn update_fields(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        expected_version: DateTime<Utc>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        let competitor = {
            let mut slot = self.competitor.lock().unwrap();
            match slot.take() {
                Some((target, competing)) if target == id => Some(competing),
                other => {
                    *slot = other;
                    None
                }
            }
        };

        if let Some(competing) = competitor {
            let current = self.inner.get(id).await?;
            self.inner
                .update_fields(id, competing, current.updated_at)
                .await?;
        }

        self.inner.update_fields(id, patch, expected_version).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.inner.delete(id).await
    }
}

// ==============================================================================
// DIRECTORY AND NOTIFIER DOUBLES
// ==============================================================================

#[derive(Default)]
pub struct StaticDirectory {
    doctors: Mutex<HashMap<Uuid, DoctorSummary>>,
}

impl StaticDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_doctor(self: &Arc<Self>, id: Uuid, full_name: &str) -> Arc<Self> {
        self.doctors.lock().unwrap().insert(
            id,
            DoctorSummary {
                id,
                full_name: full_name.to_string(),
                email: "doctor@example.com".to_string(),
                specialty: "Obstetrics".to_string(),
                is_verified: true,
                is_available: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        Arc::clone(self)
    }
}

#[async_trait]
impl DoctorDirectory for StaticDirectory {
    async fn exists(&self, doctor_id: Uuid) -> Result<bool, DoctorError> {
        Ok(self.doctors.lock().unwrap().contains_key(&doctor_id))
    }

    async fn get_summary(&self, doctor_id: Uuid) -> Result<DoctorSummary, DoctorError> {
        self.doctors
            .lock()
            .unwrap()
            .get(&doctor_id)
            .cloned()
            .ok_or(DoctorError::NotFound)
    }

    async fn list_available(
        &self,
        _specialty_filter: Option<&str>,
    ) -> Result<Vec<DoctorSummary>, DoctorError> {
        Ok(self.doctors.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications are dispatched post-commit on a spawned task; poll
    /// briefly instead of racing it.
    pub async fn wait_for(&self, count: usize) -> Vec<PushMessage> {
        for _ in 0..100 {
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn send(&self, message: PushMessage) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

// ==============================================================================
// FIXTURES
// ==============================================================================

pub fn sample_record(
    patient_id: Uuid,
    doctor_id: Uuid,
    status: AppointmentStatus,
) -> AppointmentRecord {
    let now = version_now();
    AppointmentRecord {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id,
        nurse_id: None,
        patient_name: "Amina Diallo".to_string(),
        doctor_name: "Okafor".to_string(),
        date_time: now + Duration::days(3),
        reason: "Checkup".to_string(),
        notes: None,
        status,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_service(
    store: Arc<dyn AppointmentStore>,
    directory: Arc<StaticDirectory>,
    notifier: Arc<RecordingNotifier>,
) -> AppointmentService {
    AppointmentService::new(store, directory, notifier)
}
