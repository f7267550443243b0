// libs/appointment-cell/src/services/appointment.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::{DoctorDirectory, DoctorError, RestDoctorDirectory};
use notification_cell::{NotificationGateway, PushGateway, PushMessage};
use shared_config::AppConfig;
use shared_models::auth::Role;

use crate::models::{
    Actor, AppointmentDraft, AppointmentError, AppointmentPatch, AppointmentRecord,
    AppointmentStatus, RequestAppointmentPayload,
};
use crate::policy::{
    can_be_deleted_by_doctor, can_be_rescheduled, StatusPolicy,
};
use crate::services::notify;
use crate::store::{AppointmentStore, RestAppointmentStore};

/// Orchestrates one logical appointment operation: authorize the actor,
/// validate the move against the status policy, write through the store
/// with a compare-and-swap, and fire a best-effort notification to the
/// counterpart after the write commits.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn DoctorDirectory>,
    notifier: Arc<dyn NotificationGateway>,
    policy: StatusPolicy,
}

impl AppointmentService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn DoctorDirectory>,
        notifier: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            policy: StatusPolicy::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(RestAppointmentStore::new(config)),
            Arc::new(RestDoctorDirectory::new(config)),
            Arc::new(PushGateway::new(config)),
        )
    }

    /// Create a pending appointment request on behalf of a patient.
    pub async fn request_appointment(
        &self,
        actor: Actor,
        payload: RequestAppointmentPayload,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.ensure_authenticated(actor)?;
        if actor.role != Role::Patient {
            return Err(AppointmentError::Auth(
                "Only patients can request appointments".to_string(),
            ));
        }

        info!(
            "Appointment request from patient {} for doctor {}",
            actor.user_id, payload.doctor_id
        );

        if payload.reason.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "Reason must not be empty".to_string(),
            ));
        }
        if payload.date_time < Utc::now() {
            return Err(AppointmentError::Validation(
                "Appointment time must not be in the past".to_string(),
            ));
        }
        if payload.doctor_id == actor.user_id {
            return Err(AppointmentError::Validation(
                "Patient and doctor must be different users".to_string(),
            ));
        }

        let doctor = match self.directory.get_summary(payload.doctor_id).await {
            Ok(doctor) => doctor,
            Err(DoctorError::NotFound) => {
                return Err(AppointmentError::Validation(
                    "Doctor does not exist".to_string(),
                ))
            }
            Err(DoctorError::Directory(msg)) => return Err(AppointmentError::Store(msg)),
        };
        if !doctor.is_bookable() {
            return Err(AppointmentError::Validation(
                "Doctor is not accepting appointments".to_string(),
            ));
        }

        let draft = AppointmentDraft {
            patient_id: actor.user_id,
            doctor_id: payload.doctor_id,
            patient_name: payload.patient_name,
            doctor_name: doctor.full_name,
            date_time: payload.date_time,
            reason: payload.reason,
            notes: payload.notes,
        };

        let record = self.store.create(draft).await?;
        info!("Appointment {} created as pending", record.id);

        self.spawn_notify(notify::appointment_requested(&record));

        Ok(record)
    }

    /// Apply one status transition. Re-applying the current status is a
    /// success no-op: nothing is written and nothing is notified.
    pub async fn set_status(
        &self,
        actor: Actor,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.ensure_authenticated(actor)?;

        let current = self.store.get(appointment_id).await?;
        self.ensure_ownership(actor, &current)?;

        if current.status == new_status {
            debug!(
                "Appointment {} already {}, treating as no-op",
                appointment_id, new_status
            );
            return Ok(current);
        }

        self.policy
            .validate_transition(current.status, new_status, actor.role)?;

        let patch = AppointmentPatch {
            status: Some(new_status),
            notes: reason
                .as_deref()
                .map(|r| Self::append_note(&current, new_status, actor.role, r)),
            ..AppointmentPatch::default()
        };

        let updated = match self
            .store
            .update_fields(appointment_id, patch.clone(), current.updated_at)
            .await
        {
            Ok(updated) => updated,
            Err(AppointmentError::VersionConflict) => {
                // Common race: two near-simultaneous reads. Re-fetch and
                // retry exactly once against the fresh version.
                debug!(
                    "Version conflict on appointment {}, re-fetching for one retry",
                    appointment_id
                );
                let fresh = self.store.get(appointment_id).await?;
                if fresh.status == new_status {
                    return Ok(fresh);
                }
                self.ensure_ownership(actor, &fresh)?;
                self.policy
                    .validate_transition(fresh.status, new_status, actor.role)?;
                self.store
                    .update_fields(appointment_id, patch, fresh.updated_at)
                    .await?
            }
            Err(e) => return Err(e),
        };

        info!(
            "Appointment {} moved {} -> {} by {} {}",
            appointment_id, current.status, updated.status, actor.role, actor.user_id
        );

        self.spawn_notify(notify::status_changed(&updated, actor.role, reason.as_deref()));

        Ok(updated)
    }

    /// Move the appointment to a new time. A patient moving an
    /// already-agreed time sends the record back to pending for
    /// re-confirmation; a doctor's move leaves the status alone.
    pub async fn reschedule(
        &self,
        actor: Actor,
        appointment_id: Uuid,
        new_date_time: DateTime<Utc>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.ensure_authenticated(actor)?;
        if !matches!(actor.role, Role::Patient | Role::Doctor) {
            return Err(AppointmentError::Auth(
                "Only the patient or the doctor can reschedule".to_string(),
            ));
        }

        let current = self.store.get(appointment_id).await?;
        self.ensure_ownership(actor, &current)?;

        let patch = self.reschedule_patch(actor, &current, new_date_time)?;

        let updated = match self
            .store
            .update_fields(appointment_id, patch, current.updated_at)
            .await
        {
            Ok(updated) => updated,
            Err(AppointmentError::VersionConflict) => {
                debug!(
                    "Version conflict rescheduling appointment {}, re-fetching for one retry",
                    appointment_id
                );
                let fresh = self.store.get(appointment_id).await?;
                let patch = self.reschedule_patch(actor, &fresh, new_date_time)?;
                self.store
                    .update_fields(appointment_id, patch, fresh.updated_at)
                    .await?
            }
            Err(e) => return Err(e),
        };

        info!(
            "Appointment {} rescheduled to {} by {} {}",
            appointment_id, new_date_time, actor.role, actor.user_id
        );

        self.spawn_notify(notify::rescheduled(&updated, actor.role));

        Ok(updated)
    }

    /// Assign or clear the assisting nurse. Doctor-only, non-terminal only.
    pub async fn assign_nurse(
        &self,
        actor: Actor,
        appointment_id: Uuid,
        nurse_id: Option<Uuid>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.ensure_authenticated(actor)?;
        if actor.role != Role::Doctor {
            return Err(AppointmentError::Auth(
                "Only the doctor manages nurse assignment".to_string(),
            ));
        }

        let current = self.store.get(appointment_id).await?;
        self.ensure_ownership(actor, &current)?;

        if current.status.is_terminal() {
            return Err(AppointmentError::InvalidTransition(format!(
                "{} appointments cannot be reassigned",
                current.status
            )));
        }
        if current.nurse_id == nurse_id {
            return Ok(current);
        }
        if let Some(nurse) = nurse_id {
            if nurse == current.patient_id || nurse == current.doctor_id {
                return Err(AppointmentError::Validation(
                    "Nurse must be a third participant".to_string(),
                ));
            }
        }

        let patch = AppointmentPatch {
            nurse_id: Some(nurse_id),
            ..AppointmentPatch::default()
        };

        let updated = match self
            .store
            .update_fields(appointment_id, patch.clone(), current.updated_at)
            .await
        {
            Ok(updated) => updated,
            Err(AppointmentError::VersionConflict) => {
                let fresh = self.store.get(appointment_id).await?;
                if fresh.status.is_terminal() {
                    return Err(AppointmentError::InvalidTransition(format!(
                        "{} appointments cannot be reassigned",
                        fresh.status
                    )));
                }
                self.store
                    .update_fields(appointment_id, patch, fresh.updated_at)
                    .await?
            }
            Err(e) => return Err(e),
        };

        info!(
            "Appointment {} nurse assignment set to {:?} by doctor {}",
            appointment_id, nurse_id, actor.user_id
        );

        if let Some(nurse) = nurse_id {
            self.spawn_notify(notify::nurse_assigned(&updated, nurse));
        }

        Ok(updated)
    }

    /// Hard-delete a terminal appointment. Doctor-only; no notification.
    pub async fn delete_appointment(
        &self,
        actor: Actor,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        self.ensure_authenticated(actor)?;
        if actor.role != Role::Doctor {
            return Err(AppointmentError::Auth(
                "Only doctors can delete appointments".to_string(),
            ));
        }

        let current = self.store.get(appointment_id).await?;
        self.ensure_ownership(actor, &current)?;

        if !can_be_deleted_by_doctor(current.status) {
            return Err(AppointmentError::InvalidTransition(format!(
                "Only completed, cancelled or declined appointments can be deleted, not {}",
                current.status
            )));
        }

        self.store.delete(appointment_id).await?;
        info!(
            "Appointment {} deleted by doctor {}",
            appointment_id, actor.user_id
        );

        Ok(())
    }

    /// All appointments where the actor is a named participant, optionally
    /// filtered to one status, ordered by date ascending.
    pub async fn list_for_role(
        &self,
        actor: Actor,
        status_filter: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentRecord>, AppointmentError> {
        self.ensure_authenticated(actor)?;
        if !matches!(actor.role, Role::Patient | Role::Doctor | Role::Nurse) {
            return Err(AppointmentError::Auth(format!(
                "Role {} has no appointment listing",
                actor.role
            )));
        }

        let mut records = self
            .store
            .list_by_participant(actor.user_id, actor.role, status_filter)
            .await?;
        records.sort_by_key(|r| r.date_time);

        Ok(records)
    }

    /// Fetch one appointment; participants only.
    pub async fn get_appointment(
        &self,
        actor: Actor,
        appointment_id: Uuid,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.ensure_authenticated(actor)?;

        let record = self.store.get(appointment_id).await?;
        if !record.is_participant(actor.user_id) {
            return Err(AppointmentError::Auth(
                "Not a participant of this appointment".to_string(),
            ));
        }

        Ok(record)
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    fn ensure_authenticated(&self, actor: Actor) -> Result<(), AppointmentError> {
        if !actor.role.is_authenticated() {
            return Err(AppointmentError::Auth("Not authenticated".to_string()));
        }
        Ok(())
    }

    /// Participant-by-role ownership: patients act on their own records,
    /// doctors on theirs, nurses only where assigned.
    fn ensure_ownership(
        &self,
        actor: Actor,
        record: &AppointmentRecord,
    ) -> Result<(), AppointmentError> {
        let owns = match actor.role {
            Role::Patient => record.patient_id == actor.user_id,
            Role::Doctor => record.doctor_id == actor.user_id,
            Role::Nurse => record.nurse_id == Some(actor.user_id),
            Role::Admin | Role::Unknown => false,
        };

        if !owns {
            return Err(AppointmentError::Auth(
                "Not a participant of this appointment".to_string(),
            ));
        }
        Ok(())
    }

    fn reschedule_patch(
        &self,
        actor: Actor,
        current: &AppointmentRecord,
        new_date_time: DateTime<Utc>,
    ) -> Result<AppointmentPatch, AppointmentError> {
        if !can_be_rescheduled(current.status) {
            return Err(AppointmentError::InvalidTransition(format!(
                "{} appointments cannot be rescheduled",
                current.status
            )));
        }
        if new_date_time == current.date_time {
            return Err(AppointmentError::Validation(
                "New time is identical to the current time".to_string(),
            ));
        }
        // Doctors may backfill a past slot; patients may not.
        if actor.role == Role::Patient && new_date_time < Utc::now() {
            return Err(AppointmentError::Validation(
                "Appointment time must not be in the past".to_string(),
            ));
        }

        let status = if actor.role == Role::Patient
            && matches!(
                current.status,
                AppointmentStatus::Confirmed | AppointmentStatus::Scheduled
            ) {
            Some(AppointmentStatus::Pending)
        } else {
            None
        };

        Ok(AppointmentPatch {
            date_time: Some(new_date_time),
            status,
            ..AppointmentPatch::default()
        })
    }

    fn append_note(
        current: &AppointmentRecord,
        new_status: AppointmentStatus,
        role: Role,
        reason: &str,
    ) -> String {
        let line = format!("{} by {}: {}", new_status.title_case(), role, reason);
        match &current.notes {
            Some(existing) => format!("{}\n{}", existing, line),
            None => line,
        }
    }

    /// Post-commit hook: delivery runs outside the critical path, failures
    /// are logged and never reach the caller.
    fn spawn_notify(&self, message: PushMessage) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let target = message.target_user_id;
            if let Err(e) = notifier.send(message).await {
                warn!("Notification to user {} failed (ignored): {}", target, e);
            }
        });
    }
}
