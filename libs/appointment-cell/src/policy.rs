// libs/appointment-cell/src/policy.rs
use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::models::{AppointmentError, AppointmentStatus};

/// Pure predicates over the current status. These gate UI actions and
/// service calls; the transition table below is their authoritative source.
pub fn can_be_approved_or_declined(status: AppointmentStatus) -> bool {
    status == AppointmentStatus::Pending
}

pub fn can_be_cancelled(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Scheduled
    )
}

pub fn can_be_completed_by_doctor(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Confirmed | AppointmentStatus::Scheduled
    )
}

pub fn can_be_rescheduled(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Scheduled
    )
}

/// Only terminal records may be purged.
pub fn can_be_deleted_by_doctor(status: AppointmentStatus) -> bool {
    status.is_terminal()
}

/// Status transition rules: which target statuses a given actor role may
/// move an appointment to from its current status.
pub struct StatusPolicy;

impl StatusPolicy {
    pub fn new() -> Self {
        Self
    }

    /// All target statuses `role` may legally move an appointment to from
    /// `current`. Terminal statuses allow none, for any role.
    pub fn allowed_targets(&self, current: AppointmentStatus, role: Role) -> Vec<AppointmentStatus> {
        use AppointmentStatus::*;

        match (current, role) {
            (Pending, Role::Doctor) => vec![Confirmed, Declined],
            (Pending, Role::Patient) => vec![Cancelled],
            (Confirmed, Role::Patient) => vec![Cancelled],
            // Scheduling is the administrative confirmation of logistics;
            // the assisting nurse may perform it alongside the doctor.
            (Confirmed, Role::Doctor) => vec![Scheduled, Completed],
            (Confirmed, Role::Nurse) => vec![Scheduled],
            (Scheduled, Role::Doctor) => vec![Completed],
            // The other arms mirror enumerated transition rows; this one is
            // granted because can_be_cancelled() includes scheduled, and the
            // predicate wins where the two disagree.
            (Scheduled, Role::Patient) => vec![Cancelled],
            _ => vec![],
        }
    }

    /// Validate one status move for one actor role. Ownership (acting user
    /// vs record participants) is checked by the service, not here.
    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        target: AppointmentStatus,
        role: Role,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Validating status transition {} -> {} by {}",
            current, target, role
        );

        if self.allowed_targets(current, role).contains(&target) {
            return Ok(());
        }

        warn!(
            "Rejected status transition {} -> {} by {}",
            current, target, role
        );
        Err(AppointmentError::InvalidTransition(format!(
            "{} -> {} is not permitted for role {}",
            current, target, role
        )))
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new()
    }
}
