use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use catalog_cell::{MedicalService, ServicePackage};
use doctor_cell::Doctor;
use patient_cell::models::{Patient, UpdatePatientRequest, ValidatedPatient};

use crate::models::{Appointment, AppointmentError};

// Every call carries the caller's bearer token so storage applies the
// caller's row-level security.

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn doctor_exists(&self, doctor_id: Uuid, auth_token: &str) -> Result<bool, AppointmentError>;

    async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>, AppointmentError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn get_patient_by_id(&self, patient_id: Uuid, auth_token: &str) -> Result<Option<Patient>, AppointmentError>;

    async fn get_patient_by_dni(&self, dni: &str, auth_token: &str) -> Result<Option<Patient>, AppointmentError>;

    async fn get_patient_by_email(&self, email: &str, auth_token: &str) -> Result<Option<Patient>, AppointmentError>;

    async fn get_patient_by_phone(&self, phone: &str, auth_token: &str) -> Result<Option<Patient>, AppointmentError>;

    async fn create_patient(&self, patient: &ValidatedPatient, auth_token: &str) -> Result<Patient, AppointmentError>;

    async fn update_patient(
        &self,
        patient_id: Uuid,
        changes: &UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, AppointmentError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogDirectory: Send + Sync {
    async fn get_service(&self, service_id: Uuid, auth_token: &str) -> Result<Option<MedicalService>, AppointmentError>;

    /// Package with its member services populated.
    async fn get_package(&self, package_id: Uuid, auth_token: &str) -> Result<Option<ServicePackage>, AppointmentError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Option<Appointment>, AppointmentError>;

    /// Bookings of one doctor on one date.
    async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn create_appointment(&self, appointment: &Appointment, auth_token: &str) -> Result<Appointment, AppointmentError>;

    /// Rewrites the booking fields of a stored appointment. `paid` is left
    /// as stored; the returned row carries its current value.
    async fn update_appointment(&self, appointment: &Appointment, auth_token: &str) -> Result<Appointment, AppointmentError>;

    /// Sets `paid` and touches nothing else.
    async fn mark_paid(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError>;

    async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError>;
}
