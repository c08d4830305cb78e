use async_trait::async_trait;
use uuid::Uuid;

use catalog_cell::{CatalogService, MedicalService, ServicePackage};
use doctor_cell::{Doctor, DoctorService};
use patient_cell::models::{Patient, UpdatePatientRequest, ValidatedPatient};
use patient_cell::services::PatientService;

use crate::models::AppointmentError;
use crate::services::store::{CatalogDirectory, DoctorDirectory, PatientDirectory};

// Supabase-backed collaborators: the cells' own services behind the narrow
// traits the booking flows depend on.

#[async_trait]
impl DoctorDirectory for DoctorService {
    async fn doctor_exists(&self, doctor_id: Uuid, auth_token: &str) -> Result<bool, AppointmentError> {
        Ok(DoctorService::doctor_exists(self, doctor_id, auth_token).await?)
    }

    async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>, AppointmentError> {
        Ok(DoctorService::get_doctor(self, doctor_id, auth_token).await?)
    }
}

#[async_trait]
impl PatientDirectory for PatientService {
    async fn get_patient_by_id(&self, patient_id: Uuid, auth_token: &str) -> Result<Option<Patient>, AppointmentError> {
        Ok(self.get_patient(patient_id, auth_token).await?)
    }

    async fn get_patient_by_dni(&self, dni: &str, auth_token: &str) -> Result<Option<Patient>, AppointmentError> {
        Ok(PatientService::get_patient_by_dni(self, dni, auth_token).await?)
    }

    async fn get_patient_by_email(&self, email: &str, auth_token: &str) -> Result<Option<Patient>, AppointmentError> {
        Ok(PatientService::get_patient_by_email(self, email, auth_token).await?)
    }

    async fn get_patient_by_phone(&self, phone: &str, auth_token: &str) -> Result<Option<Patient>, AppointmentError> {
        Ok(PatientService::get_patient_by_phone(self, phone, auth_token).await?)
    }

    async fn create_patient(&self, patient: &ValidatedPatient, auth_token: &str) -> Result<Patient, AppointmentError> {
        Ok(self.insert_patient(patient, auth_token).await?)
    }

    async fn update_patient(
        &self,
        patient_id: Uuid,
        changes: &UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, AppointmentError> {
        Ok(PatientService::update_patient(self, patient_id, changes.clone(), auth_token).await?)
    }
}

#[async_trait]
impl CatalogDirectory for CatalogService {
    async fn get_service(&self, service_id: Uuid, auth_token: &str) -> Result<Option<MedicalService>, AppointmentError> {
        Ok(CatalogService::get_service(self, service_id, auth_token).await?)
    }

    async fn get_package(&self, package_id: Uuid, auth_token: &str) -> Result<Option<ServicePackage>, AppointmentError> {
        Ok(CatalogService::get_package(self, package_id, auth_token).await?)
    }
}
