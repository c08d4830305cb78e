use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
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

use crate::models::{CreateDoctorRequest, DoctorError, DoctorSearchFilters, UpdateDoctorRequest};
use crate::services::DoctorService;

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::EmailAlreadyExists { .. } => AppError::Conflict(e.to_string()),
            DoctorError::InvalidSchedule(_) | DoctorError::ValidationError(_) => {
                AppError::ValidationError(e.to_string())
            }
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Only admins can create doctor profiles
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only administrators can create doctor profiles".to_string()));
    }

    let doctor = DoctorService::new(&state)
        .create_doctor(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state)
        .get_doctor(doctor_id, auth.token())
        .await?
        .ok_or(DoctorError::NotFound)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(filters): Query<DoctorSearchFilters>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(&state)
        .list_doctors(filters, auth.token())
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    // Doctors may edit their own profile, admins any profile
    if !user.is_admin() && user.id != doctor_id.to_string() {
        return Err(AppError::Forbidden("Not authorized to update this doctor".to_string()));
    }

    let doctor = DoctorService::new(&state)
        .update_doctor(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only administrators can delete doctor profiles".to_string()));
    }

    DoctorService::new(&state)
        .delete_doctor(doctor_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
