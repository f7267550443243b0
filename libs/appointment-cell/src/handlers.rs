// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Actor, AppointmentQueryParams, AssignNursePayload, RequestAppointmentPayload,
    ReschedulePayload, SetStatusPayload,
};
use crate::services::AppointmentService;

fn actor_from(user: &User) -> Result<Actor, AppError> {
    Actor::try_from(user).map_err(AppError::from)
}

#[axum::debug_handler]
pub async fn request_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(payload): Json<RequestAppointmentPayload>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    let appointment = service.request_appointment(actor, payload).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment requested successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    let appointments = service.list_for_role(actor, params.status).await?;

    let count = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "count": count
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    let appointment = service.get_appointment(actor, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn set_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    let appointment = service
        .set_status(actor, appointment_id, payload.status, payload.reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment status updated to {}", appointment.status)
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    let appointment = service
        .reschedule(actor, appointment_id, payload.new_date_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn assign_nurse(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<AssignNursePayload>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    let appointment = service
        .assign_nurse(actor, appointment_id, payload.nurse_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Nurse assignment updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from(&user)?;
    let service = AppointmentService::from_config(&state);

    service.delete_appointment(actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}
