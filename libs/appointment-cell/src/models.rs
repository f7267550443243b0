// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::{Role, User};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Booking lifecycle status. `Completed`, `Cancelled` and `Declined` are
/// terminal: no further transition is legal from them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Scheduled,
    Completed,
    Cancelled,
    Declined,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Declined,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::Declined
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Declined => "declined",
        }
    }

    /// Title-cased form used in notification titles ("Appointment Confirmed").
    pub fn title_case(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Declined => "Declined",
        }
    }
}

/// Stored status strings are not trusted: anything unparseable decodes to
/// `Pending` rather than silently dropping the record or landing it in a
/// terminal state.
impl From<String> for AppointmentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => AppointmentStatus::Pending,
            "confirmed" => AppointmentStatus::Confirmed,
            "scheduled" => AppointmentStatus::Scheduled,
            "completed" => AppointmentStatus::Completed,
            "cancelled" => AppointmentStatus::Cancelled,
            "declined" => AppointmentStatus::Declined,
            _ => AppointmentStatus::Pending,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted appointment. `patient_name` and `doctor_name` are display
/// strings captured at creation time, not a source of truth for identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub nurse_id: Option<Uuid>,
    pub patient_name: String,
    pub doctor_name: String,
    pub date_time: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id
            || self.doctor_id == user_id
            || self.nurse_id == Some(user_id)
    }

    /// The other principal participant: the doctor for a patient or nurse
    /// action, the patient for a doctor action.
    pub fn counterpart_of(&self, role: Role) -> Uuid {
        match role {
            Role::Patient => self.doctor_id,
            _ => self.patient_id,
        }
    }
}

/// Creation payload; the store assigns `id` and the timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date_time: DateTime<Utc>,
    pub reason: String,
    pub notes: Option<String>,
}

/// Field map for a conditional update. `None` leaves a field untouched;
/// `nurse_id: Some(None)` explicitly clears the assignment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurse_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.date_time.is_none()
            && self.nurse_id.is_none()
            && self.notes.is_none()
    }
}

// ==============================================================================
// ACTOR
// ==============================================================================

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

impl TryFrom<&User> for Actor {
    type Error = AppointmentError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppointmentError::Auth("Malformed user id in token".to_string()))?;
        Ok(Actor::new(user_id, user.role))
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAppointmentPayload {
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub reason: String,
    pub date_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusPayload {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReschedulePayload {
    pub new_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignNursePayload {
    pub nurse_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentQueryParams {
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment was modified concurrently")]
    VersionConflict,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl From<AppointmentError> for shared_models::error::AppError {
    fn from(err: AppointmentError) -> Self {
        use shared_models::error::AppError;
        match err {
            AppointmentError::Auth(msg) => AppError::Auth(msg),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidTransition(msg) => {
                AppError::BadRequest(format!("Invalid transition: {}", msg))
            }
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::VersionConflict => AppError::Conflict(
                "Appointment was modified concurrently, please retry".to_string(),
            ),
            AppointmentError::Store(msg) => AppError::Database(msg),
            AppointmentError::Notification(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_strings() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::from(status.to_string()), status);
        }
    }

    #[test]
    fn unknown_status_decodes_to_pending() {
        assert_eq!(
            AppointmentStatus::from("declined_doctor".to_string()),
            AppointmentStatus::Pending
        );
        assert_eq!(AppointmentStatus::from(String::new()), AppointmentStatus::Pending);

        let record: AppointmentRecord = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "patient_name": "P",
            "doctor_name": "D",
            "date_time": "2027-06-15T10:00:00Z",
            "reason": "Checkup",
            "status": "no_such_status",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }))
        .expect("record with unknown status must still decode");
        assert_eq!(record.status, AppointmentStatus::Pending);
    }

    #[test]
    fn terminality_matches_status_set() {
        use AppointmentStatus::*;
        for status in AppointmentStatus::ALL {
            assert_eq!(
                status.is_terminal(),
                matches!(status, Completed | Cancelled | Declined)
            );
        }
    }

    #[test]
    fn counterpart_is_the_other_principal() {
        let record = AppointmentRecord {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            nurse_id: None,
            patient_name: "P".to_string(),
            doctor_name: "D".to_string(),
            date_time: Utc::now(),
            reason: "Checkup".to_string(),
            notes: None,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(record.counterpart_of(Role::Patient), record.doctor_id);
        assert_eq!(record.counterpart_of(Role::Doctor), record.patient_id);
        assert_eq!(record.counterpart_of(Role::Nurse), record.patient_id);
    }
}
