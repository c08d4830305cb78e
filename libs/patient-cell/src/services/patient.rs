use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::{first_row, SupabaseClient};

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientSearchQuery, UpdatePatientRequest,
    ValidatedPatient,
};
use crate::services::validation::{is_valid_email, is_valid_phone, validate_patient_body, UniquenessProbe};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Validates the body, checks DNI/email/phone uniqueness and stores it.
    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating new patient profile for DNI: {}", request.dni);

        let validated = validate_patient_body(&request, Utc::now().date_naive())?;
        self.uniqueness_probe(&validated, auth_token).await?.check(&validated)?;

        self.insert_patient(&validated, auth_token).await
    }

    /// Stores an already validated patient without re-checking uniqueness.
    pub async fn insert_patient(
        &self,
        patient: &ValidatedPatient,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let patient_data = json!({
            "dni": patient.dni,
            "first_name": patient.first_name,
            "last_name": patient.last_name,
            "email": patient.email,
            "phone": patient.phone,
            "birth_date": patient.birth_date.format("%Y-%m-%d").to_string(),
            "address": patient.address,
            "has_insurance": patient.has_insurance,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let created: Patient = first_row(result)?
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient profile".to_string()))?;

        info!("Patient profile created successfully with ID: {}", created.id);
        Ok(created)
    }

    pub async fn uniqueness_probe(
        &self,
        patient: &ValidatedPatient,
        auth_token: &str,
    ) -> Result<UniquenessProbe, PatientError> {
        Ok(UniquenessProbe {
            by_dni: self.get_patient_by_dni(&patient.dni, auth_token).await?,
            by_email: self.get_patient_by_email(&patient.email, auth_token).await?,
            by_phone: self.get_patient_by_phone(&patient.phone, auth_token).await?,
        })
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Option<Patient>, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);
        self.find_one("id", &patient_id.to_string(), auth_token).await
    }

    pub async fn get_patient_by_dni(&self, dni: &str, auth_token: &str) -> Result<Option<Patient>, PatientError> {
        debug!("Fetching patient by DNI: {}", dni);
        self.find_one("dni", &dni.trim().to_uppercase(), auth_token).await
    }

    pub async fn get_patient_by_email(&self, email: &str, auth_token: &str) -> Result<Option<Patient>, PatientError> {
        self.find_one("email", &email.trim().to_lowercase(), auth_token).await
    }

    pub async fn get_patient_by_phone(&self, phone: &str, auth_token: &str) -> Result<Option<Patient>, PatientError> {
        self.find_one("phone", phone.trim(), auth_token).await
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(email) = request.email {
            if !is_valid_email(&email) {
                return Err(PatientError::ValidationError(format!("Invalid email: {}", email)));
            }
            let email = email.trim().to_lowercase();
            if let Some(existing) = self.get_patient_by_email(&email, auth_token).await? {
                if existing.id != patient_id {
                    return Err(PatientError::EmailAlreadyExists { email });
                }
            }
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            if !is_valid_phone(&phone) {
                return Err(PatientError::ValidationError(format!("Invalid phone: {}", phone)));
            }
            let phone = phone.trim().to_string();
            if let Some(existing) = self.get_patient_by_phone(&phone, auth_token).await? {
                if existing.id != patient_id {
                    return Err(PatientError::PhoneAlreadyExists { phone });
                }
            }
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(has_insurance) = request.has_insurance {
            update_data.insert("has_insurance".to_string(), json!(has_insurance));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_row(result)?.ok_or(PatientError::NotFound)
    }

    pub async fn delete_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<(), PatientError> {
        debug!("Deleting patient profile: {}", patient_id);

        if self.get_patient(patient_id, auth_token).await?.is_none() {
            return Err(PatientError::NotFound);
        }

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Patient {} deleted", patient_id);
        Ok(())
    }

    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = vec![];

        if let Some(dni) = &query.dni {
            query_parts.push(format!("dni=eq.{}", urlencoding::encode(&dni.trim().to_uppercase())));
        }
        if let Some(name) = &query.name {
            let name = urlencoding::encode(name);
            query_parts.push(format!("or=(first_name.ilike.*{}*,last_name.ilike.*{}*)", name, name));
        }
        if let Some(email) = &query.email {
            query_parts.push(format!("email=ilike.*{}*", urlencoding::encode(email)));
        }

        query_parts.push(format!("limit={}", query.limit.unwrap_or(50)));
        query_parts.push(format!("offset={}", query.offset.unwrap_or(0)));

        let path = format!("/rest/v1/patients?{}", query_parts.join("&"));

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let patients = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patients: {}", e)))?;

        Ok(patients)
    }

    async fn find_one(&self, column: &str, value: &str, auth_token: &str) -> Result<Option<Patient>, PatientError> {
        let path = format!("/rest/v1/patients?{}=eq.{}", column, urlencoding::encode(value));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(first_row(result)?)
    }
}
