use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;

async fn health_check(State(state): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "MamaCare API is running",
        "configured": state.is_configured(),
        "notifications_configured": state.is_notifications_configured(),
    }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .with_state(state.clone())
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/doctors", doctor_routes(state))
}
