use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentDraft, AppointmentError, AppointmentPatch, AppointmentStatus,
};
use appointment_cell::store::{AppointmentStore, RestAppointmentStore};
use shared_models::auth::Role;
use shared_utils::test_utils::{MockStoreResponses, TestConfig};

fn store_against(mock_server: &MockServer) -> RestAppointmentStore {
    let mut config = TestConfig::default();
    config.store_url = mock_server.uri();
    RestAppointmentStore::new(&config.to_app_config())
}

fn draft(patient_id: Uuid, doctor_id: Uuid) -> AppointmentDraft {
    AppointmentDraft {
        patient_id,
        doctor_id,
        patient_name: "Test Patient".to_string(),
        doctor_name: "Dr. Test".to_string(),
        date_time: Utc::now() + Duration::days(3),
        reason: "Checkup".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn create_then_get_round_trips_the_record() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    let body = MockStoreResponses::appointment_response(
        appointment_id,
        patient_id,
        doctor_id,
        "pending",
    );

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([body])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([body])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);

    let created = store.create(draft(patient_id, doctor_id)).await.unwrap();
    assert_eq!(created.id, appointment_id);
    assert_eq!(created.status, AppointmentStatus::Pending);

    let fetched = store.get(appointment_id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_of_missing_record_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    assert_matches!(
        store.get(Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn unknown_status_from_the_store_decodes_to_pending() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    let body = MockStoreResponses::appointment_response(
        appointment_id,
        Uuid::new_v4(),
        Uuid::new_v4(),
        "cancelled_patient",
    );
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([body])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    let record = store.get(appointment_id).await.unwrap();
    assert_eq!(record.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn conditional_update_that_matches_nothing_is_a_version_conflict() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    // The conditional PATCH matches no row, but the record still exists:
    // someone else won the race.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                appointment_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                "confirmed",
            )
        ])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    let patch = AppointmentPatch {
        status: Some(AppointmentStatus::Cancelled),
        ..AppointmentPatch::default()
    };

    assert_matches!(
        store.update_fields(appointment_id, patch, Utc::now()).await,
        Err(AppointmentError::VersionConflict)
    );
}

#[tokio::test]
async fn conditional_update_of_a_deleted_record_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    let patch = AppointmentPatch {
        status: Some(AppointmentStatus::Cancelled),
        ..AppointmentPatch::default()
    };

    assert_matches!(
        store.update_fields(Uuid::new_v4(), patch, Utc::now()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn delete_of_missing_record_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    assert_matches!(
        store.delete(Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn listing_queries_the_participant_column_for_the_role() {
    let mock_server = MockServer::start().await;
    let nurse_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("nurse_id", format!("eq.{}", nurse_id)))
        .and(query_param("status", "eq.confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                "confirmed",
            )
        ])))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    let records = store
        .list_by_participant(nurse_id, Role::Nurse, Some(AppointmentStatus::Confirmed))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn listing_has_no_column_for_admin() {
    let mock_server = MockServer::start().await;
    let store = store_against(&mock_server);

    assert_matches!(
        store
            .list_by_participant(Uuid::new_v4(), Role::Admin, None)
            .await,
        Err(AppointmentError::Auth(_))
    );
}

#[tokio::test]
async fn transport_failures_surface_as_store_errors() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let store = store_against(&mock_server);
    assert_matches!(
        store.get(Uuid::new_v4()).await,
        Err(AppointmentError::Store(_))
    );
}
