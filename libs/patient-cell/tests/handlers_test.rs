use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};
use assert_matches::assert_matches;
use uuid::Uuid;

use patient_cell::handlers::*;
use patient_cell::models::*;
use shared_models::error::AppError;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TestUser};

fn create_auth_header() -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

fn new_patient_body() -> CreatePatientRequest {
    CreatePatientRequest {
        dni: "12345678Z".to_string(),
        first_name: "Ana".to_string(),
        last_name: "Torres".to_string(),
        email: "ana.torres@example.com".to_string(),
        phone: "+34600000001".to_string(),
        birth_date: "1988-04-12".to_string(),
        address: Some("Calle Mayor 1".to_string()),
        has_insurance: true,
    }
}

async fn mount_empty_lookups(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_staff_creates_patient() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4().to_string();
    mount_empty_lookups(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id, "12345678Z", true)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let receptionist = TestUser::receptionist("desk@example.com");

    let (status, Json(body)) = create_patient(
        State(config.to_arc()),
        create_auth_header(),
        Extension(receptionist.to_user()),
        Json(new_patient_body()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], patient_id);
    assert_eq!(body["has_insurance"], true);
}

#[tokio::test]
async fn test_duplicate_dni_is_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("dni", "eq.12345678Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&Uuid::new_v4().to_string(), "12345678Z", false)
        ])))
        .mount(&mock_server)
        .await;
    mount_empty_lookups(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let receptionist = TestUser::receptionist("desk@example.com");

    let result = create_patient(
        State(config.to_arc()),
        create_auth_header(),
        Extension(receptionist.to_user()),
        Json(new_patient_body()),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn test_future_birth_date_is_rejected() {
    let config = TestConfig::default();
    let receptionist = TestUser::receptionist("desk@example.com");
    let mut body = new_patient_body();
    body.birth_date = "2999-01-01".to_string();

    let result = create_patient(
        State(config.to_arc()),
        create_auth_header(),
        Extension(receptionist.to_user()),
        Json(body),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_patient_cannot_read_another_patient() {
    let config = TestConfig::default();
    let patient = TestUser::patient("ana@example.com");

    let result = get_patient(
        State(config.to_arc()),
        create_auth_header(),
        Extension(patient.to_user()),
        Path(Uuid::new_v4()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_patient_cannot_grant_own_insurance() {
    let config = TestConfig::default();
    let patient = TestUser::patient("ana@example.com");
    let patient_id: Uuid = patient.id.parse().unwrap();

    let result = update_patient(
        State(config.to_arc()),
        create_auth_header(),
        Extension(patient.to_user()),
        Path(patient_id),
        Json(UpdatePatientRequest {
            has_insurance: Some(true),
            ..UpdatePatientRequest::default()
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_delete_missing_patient_is_not_found() {
    let mock_server = MockServer::start().await;
    mount_empty_lookups(&mock_server).await;

    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    let result = delete_patient(
        State(config.to_arc()),
        create_auth_header(),
        Extension(admin.to_user()),
        Path(Uuid::new_v4()),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}
