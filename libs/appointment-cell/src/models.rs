use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_cell::CatalogError;
use doctor_cell::{DoctorError, WeekDay};
use patient_cell::models::{CreatePatientRequest, PatientError};
use shared_utils::time::canonical_date;

// ==============================================================================
// CORE APPOINTMENT MODEL
// ==============================================================================

/// A booked appointment as stored in the `appointments` table.
///
/// Exactly one of `service_id` / `package_id` is set. `date` is `YYYY-MM-DD`,
/// times are `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub service_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub paid: bool,
    pub total_amount: Decimal,
}

/// The (date, start, end) occupancy of a proposed appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// What an appointment is billed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingTarget {
    Service(Uuid),
    Package(Uuid),
}

impl PricingTarget {
    /// Decodes the pair of nullable wire ids. A nil UUID counts as absent.
    pub fn from_ids(service_id: Option<Uuid>, package_id: Option<Uuid>) -> Result<Self, AppointmentError> {
        let service_id = service_id.filter(|id| !id.is_nil());
        let package_id = package_id.filter(|id| !id.is_nil());

        match (service_id, package_id) {
            (Some(id), None) => Ok(PricingTarget::Service(id)),
            (None, Some(id)) => Ok(PricingTarget::Package(id)),
            (Some(_), Some(_)) => Err(AppointmentError::InvalidInput(
                "Provide either a service or a package, not both".to_string(),
            )),
            (None, None) => Err(AppointmentError::InvalidInput(
                "A service or a package is required".to_string(),
            )),
        }
    }

    pub fn service_id(&self) -> Option<Uuid> {
        match self {
            PricingTarget::Service(id) => Some(*id),
            PricingTarget::Package(_) => None,
        }
    }

    pub fn package_id(&self) -> Option<Uuid> {
        match self {
            PricingTarget::Package(id) => Some(*id),
            PricingTarget::Service(_) => None,
        }
    }
}

/// How the patient of an appointment is identified.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientRef {
    ById(Uuid),
    ByDni(String),
    Inline(CreatePatientRequest),
}

/// A decoded appointment request, ready for the booking flows.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub doctor_id: Uuid,
    pub patient: PatientRef,
    pub target: PricingTarget,
    pub slot: Slot,
}

// ==============================================================================
// PRICING MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDiscount {
    pub amount: Decimal,
    pub price_after_discount: Decimal,
    pub insurance_discount: Decimal,
}

/// Price breakdown of a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceDetail {
    Service {
        gross_amount: Decimal,
        insurance_discount: Decimal,
        net_amount: Decimal,
    },
    Package {
        gross_amount: Decimal,
        package_discount: PackageDiscount,
        net_amount: Decimal,
    },
}

impl PriceDetail {
    pub fn gross_amount(&self) -> Decimal {
        match self {
            PriceDetail::Service { gross_amount, .. } | PriceDetail::Package { gross_amount, .. } => *gross_amount,
        }
    }

    /// The amount charged to the patient.
    pub fn net_amount(&self) -> Decimal {
        match self {
            PriceDetail::Service { net_amount, .. } | PriceDetail::Package { net_amount, .. } => *net_amount,
        }
    }
}

/// A persisted appointment together with the price it was booked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedAppointment {
    pub appointment: Appointment,
    pub price_detail: PriceDetail,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_dni: String,
    pub service_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentWithPatientRequest {
    pub doctor_id: Uuid,
    pub patient: CreatePatientRequest,
    pub service_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// Full replacement of an appointment. Exactly one of `patient_id` and
/// `patient` identifies the patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub patient: Option<CreatePatientRequest>,
    pub service_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub patient_dni: String,
    pub service_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorDayQuery {
    pub date: String,
}

fn slot_of(date: String, start_time: String, end_time: String) -> Slot {
    Slot {
        date: canonical_date(&date),
        start_time,
        end_time,
    }
}

fn dni_ref(dni: &str) -> Result<PatientRef, AppointmentError> {
    let dni = dni.trim();
    if dni.is_empty() {
        return Err(AppointmentError::InvalidInput("Patient DNI is required".to_string()));
    }
    Ok(PatientRef::ByDni(dni.to_uppercase()))
}

impl TryFrom<CreateAppointmentRequest> for AppointmentDraft {
    type Error = AppointmentError;

    fn try_from(request: CreateAppointmentRequest) -> Result<Self, Self::Error> {
        Ok(AppointmentDraft {
            doctor_id: request.doctor_id,
            patient: dni_ref(&request.patient_dni)?,
            target: PricingTarget::from_ids(request.service_id, request.package_id)?,
            slot: slot_of(request.date, request.start_time, request.end_time),
        })
    }
}

impl TryFrom<CreateAppointmentWithPatientRequest> for AppointmentDraft {
    type Error = AppointmentError;

    fn try_from(request: CreateAppointmentWithPatientRequest) -> Result<Self, Self::Error> {
        Ok(AppointmentDraft {
            doctor_id: request.doctor_id,
            target: PricingTarget::from_ids(request.service_id, request.package_id)?,
            patient: PatientRef::Inline(request.patient),
            slot: slot_of(request.date, request.start_time, request.end_time),
        })
    }
}

impl TryFrom<UpdateAppointmentRequest> for AppointmentDraft {
    type Error = AppointmentError;

    fn try_from(request: UpdateAppointmentRequest) -> Result<Self, Self::Error> {
        let patient = match (request.patient_id.filter(|id| !id.is_nil()), request.patient) {
            (Some(id), None) => PatientRef::ById(id),
            (None, Some(body)) => PatientRef::Inline(body),
            (Some(_), Some(_)) => {
                return Err(AppointmentError::InvalidInput(
                    "Provide either a patient id or a patient body, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(AppointmentError::InvalidInput(
                    "A patient id or a patient body is required".to_string(),
                ))
            }
        };

        Ok(AppointmentDraft {
            doctor_id: request.doctor_id,
            patient,
            target: PricingTarget::from_ids(request.service_id, request.package_id)?,
            slot: slot_of(request.date, request.start_time, request.end_time),
        })
    }
}

impl QuoteRequest {
    pub fn decode(self) -> Result<(PatientRef, PricingTarget), AppointmentError> {
        Ok((
            dni_ref(&self.patient_dni)?,
            PricingTarget::from_ids(self.service_id, self.package_id)?,
        ))
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Doctor,
    Patient,
    Service,
    Package,
    Appointment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Doctor => "Doctor",
            EntityKind::Patient => "Patient",
            EntityKind::Service => "Service",
            EntityKind::Package => "Package",
            EntityKind::Appointment => "Appointment",
        })
    }
}

/// Why a proposed slot was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleRejection {
    #[error("Appointment date and time must be in the future")]
    DateInPast,

    #[error("Appointment start time must be before its end time")]
    InvalidTimeRange,

    #[error("Doctor working hours are invalid: {0}")]
    InvalidDoctorSchedule(String),

    #[error("Doctor does not work on {0}")]
    DayNotAvailable(WeekDay),

    #[error("Appointment must fall within the doctor's working hours ({start} - {end})")]
    OutsideWorkingHours { start: String, end: String },

    #[error("Slot overlaps an existing appointment of this doctor")]
    TimeConflict,
}

impl ScheduleRejection {
    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleRejection::DateInPast => "date_in_past",
            ScheduleRejection::InvalidTimeRange => "invalid_time_range",
            ScheduleRejection::InvalidDoctorSchedule(_) => "invalid_doctor_schedule",
            ScheduleRejection::DayNotAvailable(_) => "day_not_available",
            ScheduleRejection::OutsideWorkingHours { .. } => "outside_working_hours",
            ScheduleRejection::TimeConflict => "time_conflict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error(transparent)]
    InvalidPatient(PatientError),

    #[error(transparent)]
    Scheduling(#[from] ScheduleRejection),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(e: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(e.to_string())
    }
}

impl From<PatientError> for AppointmentError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppointmentError::NotFound(EntityKind::Patient),
            PatientError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            other => AppointmentError::InvalidPatient(other),
        }
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound => AppointmentError::NotFound(EntityKind::Doctor),
            DoctorError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            other => AppointmentError::InvalidInput(other.to_string()),
        }
    }
}

impl From<CatalogError> for AppointmentError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ServiceNotFound => AppointmentError::NotFound(EntityKind::Service),
            CatalogError::PackageNotFound => AppointmentError::NotFound(EntityKind::Package),
            CatalogError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            CatalogError::ValidationError(msg) => AppointmentError::InvalidInput(msg),
        }
    }
}
