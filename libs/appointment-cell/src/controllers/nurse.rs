// libs/appointment-cell/src/controllers/nurse.rs
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::controllers::optimistic;
use crate::models::{Actor, AppointmentError, AppointmentRecord, AppointmentStatus};
use crate::services::AppointmentService;

/// The assisting nurse's read-mostly view: appointments the nurse is
/// assigned to, with a single write, the administrative confirmation that
/// moves a confirmed appointment to scheduled.
pub struct NurseView {
    service: Arc<AppointmentService>,
    actor: Actor,
    appointments: Vec<AppointmentRecord>,
    status_filter: Option<AppointmentStatus>,
    in_flight: HashSet<Uuid>,
    busy: bool,
    last_error: Option<AppointmentError>,
}

impl NurseView {
    pub fn new(service: Arc<AppointmentService>, nurse_id: Uuid) -> Self {
        Self {
            service,
            actor: Actor::new(nurse_id, Role::Nurse),
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

    /// Confirm the logistics of a confirmed appointment.
    pub async fn mark_scheduled(&mut self, appointment_id: Uuid) -> Result<(), AppointmentError> {
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

        let snapshot = optimistic::apply(
            &mut self.appointments,
            |r| r.id == appointment_id,
            |r| r.status = AppointmentStatus::Scheduled,
        );

        let result = self
            .service
            .set_status(self.actor, appointment_id, AppointmentStatus::Scheduled, None)
            .await;

        self.in_flight.remove(&appointment_id);
        self.busy = !self.in_flight.is_empty();

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
