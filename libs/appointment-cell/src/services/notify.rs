// libs/appointment-cell/src/services/notify.rs
//
// Push message composition. One message per lifecycle event, addressed to
// the counterpart participant; the data payload lets the client app route
// straight to the appointment detail screen.

use notification_cell::PushMessage;
use shared_models::auth::Role;
use uuid::Uuid;

use crate::models::{AppointmentRecord, AppointmentStatus};

fn detail_route(appointment_id: Uuid) -> String {
    format!("/appointments/detail/{}", appointment_id)
}

/// A new pending request, addressed to the doctor.
pub fn appointment_requested(record: &AppointmentRecord) -> PushMessage {
    PushMessage::new(
        record.doctor_id,
        "New Appointment Request",
        format!(
            "{} requested an appointment: {}",
            record.patient_name, record.reason
        ),
    )
    .with_data("type", "appointment_request")
    .with_data("appointment_id", record.id.to_string())
    .with_data("route", detail_route(record.id))
}

/// A status change, addressed to the counterpart of the acting role.
pub fn status_changed(
    record: &AppointmentRecord,
    acting_role: Role,
    reason: Option<&str>,
) -> PushMessage {
    let target = record.counterpart_of(acting_role);

    let mut body = if target == record.patient_id {
        format!(
            "Your appointment with Dr. {} has been {}.",
            record.doctor_name, record.status
        )
    } else {
        format!(
            "Your appointment with {} has been {}.",
            record.patient_name, record.status
        )
    };
    if let Some(reason) = reason {
        body.push_str(&format!(" Reason: {}", reason));
    }

    PushMessage::new(
        target,
        format!("Appointment {}", record.status.title_case()),
        body,
    )
    .with_data("type", "appointment_update")
    .with_data("appointment_id", record.id.to_string())
    .with_data("new_status", record.status.to_string())
    .with_data("route", detail_route(record.id))
}

/// A date change, addressed to the counterpart of the acting role.
pub fn rescheduled(record: &AppointmentRecord, acting_role: Role) -> PushMessage {
    let target = record.counterpart_of(acting_role);

    let mut body = format!(
        "The appointment has been moved to {}.",
        record.date_time.format("%Y-%m-%d %H:%M UTC")
    );
    if record.status == AppointmentStatus::Pending {
        body.push_str(" It is awaiting confirmation again.");
    }

    PushMessage::new(target, "Appointment Rescheduled", body)
        .with_data("type", "appointment_update")
        .with_data("appointment_id", record.id.to_string())
        .with_data("new_status", record.status.to_string())
        .with_data("route", detail_route(record.id))
}

/// An assignment notice, addressed to the newly assigned nurse.
pub fn nurse_assigned(record: &AppointmentRecord, nurse_id: Uuid) -> PushMessage {
    PushMessage::new(
        nurse_id,
        "Appointment Assignment",
        format!(
            "You have been assigned to {}'s appointment with Dr. {}.",
            record.patient_name, record.doctor_name
        ),
    )
    .with_data("type", "appointment_assignment")
    .with_data("appointment_id", record.id.to_string())
    .with_data("route", detail_route(record.id))
}
