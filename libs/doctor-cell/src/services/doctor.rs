use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{first_row, SupabaseClient};

use crate::models::{
    parse_window, CreateDoctorRequest, Doctor, DoctorError, DoctorSearchFilters,
    UpdateDoctorRequest, WeekDay,
};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create a new doctor profile
    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating new doctor profile for: {}", request.email);

        validate_schedule(&request.working_days, &request.start_time, &request.end_time)?;

        if self.find_by_email(&request.email, auth_token).await?.is_some() {
            return Err(DoctorError::EmailAlreadyExists { email: request.email });
        }

        let doctor_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "specialty": request.specialty,
            "working_days": request.working_days,
            "start_time": request.start_time,
            "end_time": request.end_time,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(auth_token),
            Some(doctor_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let doctor: Doctor = first_row(result)?
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor profile".to_string()))?;

        info!("Doctor profile created with ID: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(first_row(result)?)
    }

    pub async fn doctor_exists(&self, doctor_id: Uuid, auth_token: &str) -> Result<bool, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=id", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(!result.is_empty())
    }

    pub async fn list_doctors(
        &self,
        filters: DoctorSearchFilters,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors with filters: {:?}", filters);

        let mut query_parts = vec!["order=last_name.asc".to_string()];

        if let Some(specialty) = &filters.specialty {
            query_parts.push(format!("specialty=ilike.*{}*", urlencoding::encode(specialty)));
        }
        if let Some(day) = filters.working_day {
            query_parts.push(format!("working_days=cs.{{{}}}", day));
        }
        query_parts.push(format!("limit={}", filters.limit.unwrap_or(50)));
        query_parts.push(format!("offset={}", filters.offset.unwrap_or(0)));

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor profile: {}", doctor_id);

        let current = self.get_doctor(doctor_id, auth_token).await?
            .ok_or(DoctorError::NotFound)?;

        // The schedule is validated as a whole so a partial update cannot
        // leave an inverted window behind.
        let working_days = request.working_days.clone().unwrap_or(current.working_days.clone());
        let start_time = request.start_time.clone().unwrap_or(current.start_time.clone());
        let end_time = request.end_time.clone().unwrap_or(current.end_time.clone());
        validate_schedule(&working_days, &start_time, &end_time)?;

        if let Some(email) = &request.email {
            if email != &current.email {
                if let Some(existing) = self.find_by_email(email, auth_token).await? {
                    if existing.id != doctor_id {
                        return Err(DoctorError::EmailAlreadyExists { email: email.clone() });
                    }
                }
            }
        }

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        update_data.insert("working_days".to_string(), json!(working_days));
        update_data.insert("start_time".to_string(), json!(start_time));
        update_data.insert("end_time".to_string(), json!(end_time));
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_row(result)?.ok_or(DoctorError::NotFound)
    }

    pub async fn delete_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<(), DoctorError> {
        debug!("Deleting doctor profile: {}", doctor_id);

        if !self.doctor_exists(doctor_id, auth_token).await? {
            return Err(DoctorError::NotFound);
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }

    async fn find_by_email(&self, email: &str, auth_token: &str) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("/rest/v1/doctors?email=eq.{}", urlencoding::encode(email));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(first_row(result)?)
    }
}

/// A schedule needs at least one distinct working day and a non-empty window.
pub fn validate_schedule(working_days: &[WeekDay], start_time: &str, end_time: &str) -> Result<(), DoctorError> {
    if working_days.is_empty() {
        return Err(DoctorError::InvalidSchedule("At least one working day is required".to_string()));
    }

    let mut seen = Vec::with_capacity(working_days.len());
    for day in working_days {
        if seen.contains(day) {
            return Err(DoctorError::InvalidSchedule(format!("Duplicate working day: {}", day)));
        }
        seen.push(*day);
    }

    parse_window(start_time, end_time)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_requires_days() {
        assert!(matches!(
            validate_schedule(&[], "09:00", "17:00"),
            Err(DoctorError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_schedule_rejects_duplicate_days() {
        assert!(matches!(
            validate_schedule(&[WeekDay::Monday, WeekDay::Monday], "09:00", "17:00"),
            Err(DoctorError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_valid_schedule() {
        assert!(validate_schedule(&[WeekDay::Monday, WeekDay::Friday], "09:00", "17:00").is_ok());
    }
}
