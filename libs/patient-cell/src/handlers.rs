use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{ensure_staff, ensure_staff_or_owner};

use crate::models::{CreatePatientRequest, UpdatePatientRequest, PatientSearchQuery, PatientError};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::DniAlreadyExists { .. }
            | PatientError::EmailAlreadyExists { .. }
            | PatientError::PhoneAlreadyExists { .. } => AppError::Conflict(e.to_string()),
            PatientError::InvalidBirthDate(_) | PatientError::ValidationError(_) => {
                AppError::ValidationError(e.to_string())
            }
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_staff(&user)?;

    let patient = PatientService::new(&config)
        .create_patient(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_staff_or_owner(&user, &patient_id.to_string())?;

    let patient = PatientService::new(&config)
        .get_patient(patient_id, auth.token())
        .await?
        .ok_or(PatientError::NotFound)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff_or_owner(&user, &patient_id.to_string())?;

    // Insurance coverage affects pricing, only staff may change it
    if request.has_insurance.is_some() && !user.is_staff() {
        return Err(AppError::Forbidden("Only clinic staff can change insurance coverage".to_string()));
    }

    let patient = PatientService::new(&config)
        .update_patient(patient_id, request, auth.token())
        .await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_staff(&user)?;

    PatientService::new(&config)
        .delete_patient(patient_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let patients = PatientService::new(&config)
        .search_patients(query, auth.token())
        .await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}
