use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{first_row, ApiError, SupabaseClient};
use shared_utils::time::{canonical_date, format_date};

use crate::models::{Appointment, AppointmentError, EntityKind, ScheduleRejection};
use crate::services::store::AppointmentStore;

/// `appointments` table over PostgREST.
pub struct AppointmentRepository {
    supabase: SupabaseClient,
}

impl AppointmentRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

/// A 409 on write means the storage-level exclusion constraint caught an
/// overlapping booking made by another process.
fn write_error(e: anyhow::Error) -> AppointmentError {
    match e.downcast_ref::<ApiError>() {
        Some(api_error) if api_error.is_conflict() => {
            warn!("Storage rejected overlapping appointment: {}", api_error.body);
            ScheduleRejection::TimeConflict.into()
        }
        _ => AppointmentError::DatabaseError(e.to_string()),
    }
}

/// Columns a reschedule may rewrite. `paid` is only ever written by
/// `mark_paid`.
fn booking_fields(appointment: &Appointment) -> Value {
    json!({
        "doctor_id": appointment.doctor_id,
        "patient_id": appointment.patient_id,
        "service_id": appointment.service_id,
        "package_id": appointment.package_id,
        "date": canonical_date(&appointment.date),
        "start_time": appointment.start_time.trim(),
        "end_time": appointment.end_time.trim(),
        "total_amount": appointment.total_amount,
    })
}

fn insert_body(appointment: &Appointment) -> Value {
    let mut body = booking_fields(appointment);
    body["id"] = json!(appointment.id);
    body["paid"] = json!(appointment.paid);
    body
}

#[async_trait]
impl AppointmentStore for AppointmentRepository {
    async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        Ok(first_row(result)?)
    }

    async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&order=start_time.asc",
            doctor_id,
            urlencoding::encode(&format_date(date))
        );
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        let appointments = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        debug!("Doctor {} has {} appointments on {}", doctor_id, appointments.len(), date);
        Ok(appointments)
    }

    async fn create_appointment(&self, appointment: &Appointment, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(insert_body(appointment)),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(write_error)?;

        let created: Appointment = first_row(result)?
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;

        info!("Appointment {} stored", created.id);
        Ok(created)
    }

    async fn update_appointment(&self, appointment: &Appointment, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(booking_fields(appointment)),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(write_error)?;

        first_row(result)?.ok_or(AppointmentError::NotFound(EntityKind::Appointment))
    }

    async fn mark_paid(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "paid": true })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_row(result)?.ok_or(AppointmentError::NotFound(EntityKind::Appointment))
    }

    async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

    fn appointment(paid: bool) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            service_id: Some(Uuid::new_v4()),
            package_id: None,
            date: "2030-01-07".to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            paid,
            total_amount: rust_decimal::Decimal::new(100, 0),
        }
    }

    fn stored_row(appointment: &Appointment, paid: bool) -> Value {
        let mut row = serde_json::to_value(appointment).unwrap();
        row["paid"] = json!(paid);
        row
    }

    fn repository(server: &MockServer) -> AppointmentRepository {
        AppointmentRepository::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config())
    }

    #[tokio::test]
    async fn test_lists_one_doctor_day() {
        let mock_server = MockServer::start().await;
        let doctor_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
            .and(query_param("date", "eq.2030-01-07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::appointment_response(
                    &Uuid::new_v4().to_string(),
                    &doctor_id.to_string(),
                    &Uuid::new_v4().to_string(),
                    "2030-01-07",
                    "09:00:00",
                    "10:00:00",
                )
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let appointments = repository(&mock_server)
            .list_doctor_appointments(doctor_id, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(), "token")
            .await
            .unwrap();

        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].start_time, "09:00:00");
    }

    #[tokio::test]
    async fn test_storage_overlap_is_a_time_conflict() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(409).set_body_json(
                MockSupabaseResponses::error_response("conflicting key value violates exclusion constraint", "23P01"),
            ))
            .mount(&mock_server)
            .await;

        let result = repository(&mock_server).create_appointment(&appointment(false), "token").await;
        assert_matches!(result, Err(AppointmentError::Scheduling(ScheduleRejection::TimeConflict)));
    }

    #[tokio::test]
    async fn test_payment_patches_only_the_paid_flag() {
        let mock_server = MockServer::start().await;
        let unpaid = appointment(false);

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("id", format!("eq.{}", unpaid.id)))
            .and(body_json(json!({ "paid": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored_row(&unpaid, true)])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let paid = repository(&mock_server).mark_paid(unpaid.id, "token").await.unwrap();
        assert!(paid.paid);
        assert_eq!(paid.start_time, unpaid.start_time);
    }

    #[tokio::test]
    async fn test_reschedule_leaves_paid_flag_alone() {
        let mock_server = MockServer::start().await;
        let mut moved = appointment(false);
        moved.date = "2030-1-8".to_string();

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/appointments"))
            .and(|request: &wiremock::Request| {
                serde_json::from_slice::<Value>(&request.body)
                    .map(|body| body.get("paid").is_none() && body["date"] == "2030-01-08")
                    .unwrap_or(false)
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored_row(&moved, true)])))
            .expect(1)
            .mount(&mock_server)
            .await;

        // A payment made after the caller read the row is still reported
        let updated = repository(&mock_server).update_appointment(&moved, "token").await.unwrap();
        assert!(updated.paid);
    }
}
