// libs/appointment-cell/src/controllers/doctor.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::controllers::optimistic;
use crate::models::{Actor, AppointmentError, AppointmentRecord, AppointmentStatus};
use crate::policy::{
    can_be_approved_or_declined, can_be_completed_by_doctor, can_be_deleted_by_doctor,
    can_be_rescheduled,
};
use crate::services::AppointmentService;

/// The doctor's view of their appointment book: approve/decline pending
/// requests, mark logistics scheduled, complete consultations, manage nurse
/// assignment and purge terminal records.
pub struct DoctorAppointments {
    service: Arc<AppointmentService>,
    actor: Actor,
    appointments: Vec<AppointmentRecord>,
    status_filter: Option<AppointmentStatus>,
    in_flight: HashSet<Uuid>,
    busy: bool,
    last_error: Option<AppointmentError>,
}

impl DoctorAppointments {
    pub fn new(service: Arc<AppointmentService>, doctor_id: Uuid) -> Self {
        Self {
            service,
            actor: Actor::new(doctor_id, Role::Doctor),
            appointments: Vec::new(),
            status_filter: None,
            in_flight: HashSet::new(),
            busy: false,
            last_error: None,
        }
    }

    pub fn appointments(&self) -> &[AppointmentRecord] {
        &self.appointments
    }

    pub fn status_filter(&self) -> Option<AppointmentStatus> {
        self.status_filter
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&AppointmentError> {
        self.last_error.as_ref()
    }

    pub async fn refresh(&mut self) -> Result<(), AppointmentError> {
        self.busy = true;
        let result = self.service.list_for_role(self.actor, self.status_filter).await;
        self.busy = !self.in_flight.is_empty();

        match result {
            Ok(records) => {
                self.appointments = records;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub async fn set_filter(
        &mut self,
        filter: Option<AppointmentStatus>,
    ) -> Result<(), AppointmentError> {
        self.status_filter = filter;
        self.refresh().await
    }

    pub async fn approve(&mut self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.gate_cached(appointment_id, can_be_approved_or_declined, "approved")?;
        self.change_status(appointment_id, AppointmentStatus::Confirmed, None)
            .await
    }

    pub async fn decline(
        &mut self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<(), AppointmentError> {
        self.gate_cached(appointment_id, can_be_approved_or_declined, "declined")?;
        self.change_status(appointment_id, AppointmentStatus::Declined, reason)
            .await
    }

    /// Administrative confirmation of logistics.
    pub async fn mark_scheduled(&mut self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.change_status(appointment_id, AppointmentStatus::Scheduled, None)
            .await
    }

    pub async fn complete(&mut self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.gate_cached(appointment_id, can_be_completed_by_doctor, "completed")?;
        self.change_status(appointment_id, AppointmentStatus::Completed, None)
            .await
    }

    pub async fn reschedule(
        &mut self,
        appointment_id: Uuid,
        new_date_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        self.gate_cached(appointment_id, can_be_rescheduled, "rescheduled")?;
        self.begin_mutation(appointment_id)?;

        let snapshot = optimistic::apply(
            &mut self.appointments,
            |r| r.id == appointment_id,
            |r| r.date_time = new_date_time,
        );

        let result = self
            .service
            .reschedule(self.actor, appointment_id, new_date_time)
            .await;
        self.finish_mutation(appointment_id);

        self.settle(snapshot, result)
    }

    pub async fn assign_nurse(
        &mut self,
        appointment_id: Uuid,
        nurse_id: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        self.begin_mutation(appointment_id)?;

        let snapshot = optimistic::apply(
            &mut self.appointments,
            |r| r.id == appointment_id,
            |r| r.nurse_id = nurse_id,
        );

        let result = self
            .service
            .assign_nurse(self.actor, appointment_id, nurse_id)
            .await;
        self.finish_mutation(appointment_id);

        self.settle(snapshot, result)
    }

    /// Purge a terminal record. On success the record is removed from the
    /// cached list locally; no reload.
    pub async fn delete(&mut self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.gate_cached(appointment_id, can_be_deleted_by_doctor, "deleted")?;
        self.begin_mutation(appointment_id)?;

        let result = self.service.delete_appointment(self.actor, appointment_id).await;
        self.finish_mutation(appointment_id);

        match result {
            Ok(()) => {
                self.appointments.retain(|r| r.id != appointment_id);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn change_status(
        &mut self,
        appointment_id: Uuid,
        target: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<(), AppointmentError> {
        self.begin_mutation(appointment_id)?;

        let snapshot = optimistic::apply(
            &mut self.appointments,
            |r| r.id == appointment_id,
            |r| r.status = target,
        );

        let result = self
            .service
            .set_status(self.actor, appointment_id, target, reason)
            .await;
        self.finish_mutation(appointment_id);

        self.settle(snapshot, result)
    }

    /// Pre-flight gate on the cached copy: when the record is in view and
    /// the status predicate already rules the action out, fail locally
    /// without a store round-trip.
    fn gate_cached(
        &mut self,
        appointment_id: Uuid,
        allowed: fn(AppointmentStatus) -> bool,
        action: &str,
    ) -> Result<(), AppointmentError> {
        if let Some(record) = self.appointments.iter().find(|r| r.id == appointment_id) {
            if !allowed(record.status) {
                let err = AppointmentError::InvalidTransition(format!(
                    "{} appointments cannot be {}",
                    record.status, action
                ));
                self.last_error = Some(err.clone());
                return Err(err);
            }
        }
        Ok(())
    }

    fn begin_mutation(&mut self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        if !self.in_flight.insert(appointment_id) {
            debug!(
                "Rejecting concurrent mutation for appointment {}",
                appointment_id
            );
            return Err(AppointmentError::Validation(
                "Another change for this appointment is still in flight".to_string(),
            ));
        }
        self.busy = true;
        Ok(())
    }

    fn finish_mutation(&mut self, appointment_id: Uuid) {
        self.in_flight.remove(&appointment_id);
        self.busy = !self.in_flight.is_empty();
    }

    fn settle(
        &mut self,
        snapshot: Option<optimistic::Snapshot<AppointmentRecord>>,
        result: Result<AppointmentRecord, AppointmentError>,
    ) -> Result<(), AppointmentError> {
        match result {
            Ok(updated) => {
                if let Some(snapshot) = snapshot {
                    snapshot.confirm(&mut self.appointments, updated);
                }
                let filter = self.status_filter;
                self.appointments
                    .retain(|r| filter.map_or(true, |f| r.status == f));
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                if let Some(snapshot) = snapshot {
                    snapshot.revert(&mut self.appointments);
                }
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}
