use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// National identity document number, the patient's natural key.
    pub dni: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    #[serde(default)]
    pub has_insurance: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.birth_date).unwrap_or(0)
    }
}

/// Patient data supplied inline, either to the patient endpoint or embedded
/// in an appointment request. `birth_date` stays a string until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub dni: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: String,
    pub address: Option<String>,
    #[serde(default)]
    pub has_insurance: bool,
}

/// A `CreatePatientRequest` that passed format and birth date validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPatient {
    pub dni: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub address: Option<String>,
    pub has_insurance: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub has_insurance: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub dni: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient with DNI {dni} already exists")]
    DniAlreadyExists { dni: String },

    #[error("Patient with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Patient with phone {phone} already exists")]
    PhoneAlreadyExists { phone: String },

    #[error("Invalid birth date: {0}")]
    InvalidBirthDate(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PatientError {
    fn from(e: anyhow::Error) -> Self {
        PatientError::DatabaseError(e.to_string())
    }
}
