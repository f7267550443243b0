// libs/appointment-cell/src/controllers/patient.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::controllers::optimistic;
use crate::models::{
    Actor, AppointmentError, AppointmentRecord, AppointmentStatus, RequestAppointmentPayload,
};
use crate::policy::{can_be_cancelled, can_be_rescheduled};
use crate::services::AppointmentService;

/// The patient's view of their own appointments: a cached, filtered list
/// with optimistic mutation. The cache is owned exclusively by this
/// controller; cross-role visibility comes only from each side's own
/// refresh.
pub struct PatientAppointments {
    service: Arc<AppointmentService>,
    actor: Actor,
    display_name: String,
    appointments: Vec<AppointmentRecord>,
    status_filter: Option<AppointmentStatus>,
    in_flight: HashSet<Uuid>,
    busy: bool,
    last_error: Option<AppointmentError>,
}

impl PatientAppointments {
    pub fn new(service: Arc<AppointmentService>, patient_id: Uuid, display_name: String) -> Self {
        Self {
            service,
            actor: Actor::new(patient_id, Role::Patient),
            display_name,
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

    /// Replace the cached list wholesale from the store.
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

    /// Filtering is server-side: changing the filter re-queries the store.
    pub async fn set_filter(
        &mut self,
        filter: Option<AppointmentStatus>,
    ) -> Result<(), AppointmentError> {
        self.status_filter = filter;
        self.refresh().await
    }

    /// Request a new appointment; on success the created record joins the
    /// cached list without a full reload.
    pub async fn request(
        &mut self,
        doctor_id: Uuid,
        reason: String,
        date_time: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, AppointmentError> {
        self.busy = true;
        let result = self
            .service
            .request_appointment(
                self.actor,
                RequestAppointmentPayload {
                    doctor_id,
                    patient_name: self.display_name.clone(),
                    reason,
                    date_time,
                    notes,
                },
            )
            .await;
        self.busy = !self.in_flight.is_empty();

        match result {
            Ok(record) => {
                if self.matches_filter(record.status) {
                    self.appointments.push(record.clone());
                    self.appointments.sort_by_key(|r| r.date_time);
                }
                self.last_error = None;
                Ok(record)
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Cancel one of the patient's appointments.
    pub async fn cancel(
        &mut self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<(), AppointmentError> {
        self.gate_cached(appointment_id, can_be_cancelled, "cancelled")?;
        self.begin_mutation(appointment_id)?;

        let snapshot = optimistic::apply(
            &mut self.appointments,
            |r| r.id == appointment_id,
            |r| r.status = AppointmentStatus::Cancelled,
        );

        let result = self
            .service
            .set_status(self.actor, appointment_id, AppointmentStatus::Cancelled, reason)
            .await;
        self.finish_mutation(appointment_id);

        self.settle(snapshot, result)
    }

    /// Ask for a new time. A confirmed or scheduled appointment goes back
    /// to pending for the doctor to re-confirm.
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

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    /// Pre-flight gate on the cached copy: when the record is in view and
    /// the status predicate already rules the action out, fail locally
    /// without a store round-trip. Records outside the current filter fall
    /// through to the service's authoritative check.
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

    /// At most one in-flight mutating action per appointment: a second call
    /// for the same record is rejected while the first has not resolved.
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

    fn matches_filter(&self, status: AppointmentStatus) -> bool {
        self.status_filter.map_or(true, |f| f == status)
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
