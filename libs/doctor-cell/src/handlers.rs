use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::DoctorError;
use crate::services::directory::{DoctorDirectory, RestDoctorDirectory};

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub specialty: Option<String>,
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = RestDoctorDirectory::new(&state);

    let doctors = directory
        .list_available(query.specialty.as_deref())
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    let count = doctors.len();
    Ok(Json(json!({
        "doctors": doctors,
        "count": count
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = RestDoctorDirectory::new(&state);

    let doctor = directory.get_summary(doctor_id).await.map_err(|e| match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::Directory(msg) => AppError::ExternalService(msg),
    })?;

    Ok(Json(json!(doctor)))
}
