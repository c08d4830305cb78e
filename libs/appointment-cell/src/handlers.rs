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

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{ensure_staff, ensure_staff_or_owner};

use crate::models::{
    AppointmentDraft, AppointmentError, CreateAppointmentRequest, CreateAppointmentWithPatientRequest,
    DoctorDayQuery, QuoteRequest, ScheduleRejection, UpdateAppointmentRequest,
};
use crate::services::AppointmentBookingService;

fn rejection_status(rejection: &ScheduleRejection) -> StatusCode {
    match rejection {
        ScheduleRejection::TimeConflict => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound(kind) => AppError::NotFound(format!("{} not found", kind)),
            AppointmentError::InvalidInput(_)
            | AppointmentError::InvalidTimeFormat(_)
            | AppointmentError::InvalidDateFormat(_) => AppError::BadRequest(e.to_string()),
            AppointmentError::InvalidPatient(patient_error) => AppError::from(patient_error),
            AppointmentError::Scheduling(rejection) => AppError::Rejected {
                status: rejection_status(&rejection),
                code: rejection.code().to_string(),
                message: rejection.to_string(),
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_staff(&user)?;

    let draft = AppointmentDraft::try_from(request)?;
    let booked = booking.create_appointment(draft, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": booked.appointment,
        "price_detail": booked.price_detail,
        "message": "Appointment created successfully"
    }))))
}

#[axum::debug_handler]
pub async fn create_appointment_with_patient(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentWithPatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    ensure_staff(&user)?;

    let draft = AppointmentDraft::try_from(request)?;
    let booked = booking.create_appointment_with_patient(draft, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": booked.appointment,
        "price_detail": booked.price_detail,
        "message": "Patient registered and appointment created successfully"
    }))))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let draft = AppointmentDraft::try_from(request)?;
    let booked = booking.update_appointment(appointment_id, draft, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": booked.appointment,
        "price_detail": booked.price_detail,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn quote_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let (patient, target) = request.decode()?;
    let price_detail = booking.quote(&patient, target, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "price_detail": price_detail
    })))
}

// ==============================================================================
// RECORD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking.get_appointment(appointment_id, auth.token()).await?;

    ensure_staff_or_owner(&user, &appointment.patient_id.to_string())?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ensure_staff(&user)?;

    booking.delete_appointment(appointment_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn pay_appointment(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let appointment = booking.mark_paid(appointment_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Payment registered"
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(booking): State<Arc<AppointmentBookingService>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorDayQuery>,
) -> Result<Json<Value>, AppError> {
    ensure_staff(&user)?;

    let appointments = booking
        .list_doctor_appointments(doctor_id, &query.date, auth.token())
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
