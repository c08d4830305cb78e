use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use shared_utils::time::parse_date;

use crate::models::{CreatePatientRequest, Patient, PatientError, ValidatedPatient};

static DNI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{6,12}$").expect("static pattern"));
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static pattern")
});
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ]{5,18}[0-9]$").expect("static pattern"));

/// Checks field formats and that the birth date parses and lies before `today`.
pub fn validate_patient_body(
    request: &CreatePatientRequest,
    today: NaiveDate,
) -> Result<ValidatedPatient, PatientError> {
    debug!("Validating patient body for DNI {}", request.dni);

    let dni = request.dni.trim();
    if !DNI_PATTERN.is_match(dni) {
        return Err(PatientError::ValidationError(format!("Invalid DNI: {}", request.dni)));
    }

    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(PatientError::ValidationError("First and last name are required".to_string()));
    }

    let email = request.email.trim();
    if email.len() > 254 || !EMAIL_PATTERN.is_match(email) {
        return Err(PatientError::ValidationError(format!("Invalid email: {}", request.email)));
    }

    let phone = request.phone.trim();
    if !PHONE_PATTERN.is_match(phone) {
        return Err(PatientError::ValidationError(format!("Invalid phone: {}", request.phone)));
    }

    let birth_date = parse_date(&request.birth_date)
        .ok_or_else(|| PatientError::InvalidBirthDate(format!("'{}' is not YYYY-MM-DD", request.birth_date)))?;
    if birth_date >= today {
        return Err(PatientError::InvalidBirthDate("Birth date must be in the past".to_string()));
    }

    Ok(ValidatedPatient {
        dni: dni.to_uppercase(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        email: email.to_lowercase(),
        phone: phone.to_string(),
        birth_date,
        address: request.address.clone(),
        has_insurance: request.has_insurance,
    })
}

/// Existing records that would collide with a new patient, one slot per unique field.
#[derive(Debug, Default)]
pub struct UniquenessProbe {
    pub by_dni: Option<Patient>,
    pub by_email: Option<Patient>,
    pub by_phone: Option<Patient>,
}

impl UniquenessProbe {
    pub fn check(&self, patient: &ValidatedPatient) -> Result<(), PatientError> {
        if self.by_dni.is_some() {
            return Err(PatientError::DniAlreadyExists { dni: patient.dni.clone() });
        }
        if self.by_email.is_some() {
            return Err(PatientError::EmailAlreadyExists { email: patient.email.clone() });
        }
        if self.by_phone.is_some() {
            return Err(PatientError::PhoneAlreadyExists { phone: patient.phone.clone() });
        }
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone.trim())
}
