use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use catalog_cell::CatalogService;
use doctor_cell::DoctorService;
use patient_cell::models::{CreatePatientRequest, Patient, ValidatedPatient};
use patient_cell::services::validation::{validate_patient_body, UniquenessProbe};
use patient_cell::services::PatientService;
use shared_config::AppConfig;
use shared_utils::time::{format_date, parse_date};

use crate::models::{
    Appointment, AppointmentDraft, AppointmentError, BookedAppointment, EntityKind, PatientRef,
    PriceDetail, PricingTarget, Slot,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::locks::SlotLocks;
use crate::services::pricing::{price_package, price_service};
use crate::services::repository::AppointmentRepository;
use crate::services::store::{AppointmentStore, CatalogDirectory, DoctorDirectory, PatientDirectory};
use crate::services::validator::validate_slot;

/// A patient resolved for a booking. New patients are only written once the
/// booking itself has passed validation.
enum ResolvedPatient {
    Existing(Patient),
    New(ValidatedPatient),
}

/// The calendar day of a slot; locks and queries key on this rather than on
/// the raw string.
fn slot_day(slot: &Slot) -> Result<NaiveDate, AppointmentError> {
    parse_date(&slot.date).ok_or_else(|| AppointmentError::InvalidDateFormat(slot.date.clone()))
}

impl ResolvedPatient {
    fn has_insurance(&self) -> bool {
        match self {
            ResolvedPatient::Existing(patient) => patient.has_insurance,
            ResolvedPatient::New(patient) => patient.has_insurance,
        }
    }
}

/// Books, reschedules and prices appointments.
///
/// Built once at startup and shared by every request. Writes for the same
/// doctor and date are serialized through `SlotLocks`.
pub struct AppointmentBookingService {
    doctors: Arc<dyn DoctorDirectory>,
    patients: Arc<dyn PatientDirectory>,
    catalog: Arc<dyn CatalogDirectory>,
    appointments: Arc<dyn AppointmentStore>,
    locks: SlotLocks,
    clock: Arc<dyn Clock>,
}

impl AppointmentBookingService {
    pub fn new(
        doctors: Arc<dyn DoctorDirectory>,
        patients: Arc<dyn PatientDirectory>,
        catalog: Arc<dyn CatalogDirectory>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            doctors,
            patients,
            catalog,
            appointments,
            locks: SlotLocks::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Wires the Supabase-backed collaborators.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(DoctorService::new(config)),
            Arc::new(PatientService::new(config)),
            Arc::new(CatalogService::new(config)),
            Arc::new(AppointmentRepository::new(config)),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ==============================================================================
    // BOOKING FLOWS
    // ==============================================================================

    pub async fn create_appointment(
        &self,
        draft: AppointmentDraft,
        auth_token: &str,
    ) -> Result<BookedAppointment, AppointmentError> {
        debug!("Booking appointment with doctor {} on {}", draft.doctor_id, draft.slot.date);

        let doctor = self.doctors.get_doctor(draft.doctor_id, auth_token).await?
            .ok_or(AppointmentError::NotFound(EntityKind::Doctor))?;

        let patient = self.resolve_patient(&draft.patient, auth_token).await?;

        let day = slot_day(&draft.slot)?;
        let _slot_guard = self.locks.acquire(doctor.id, day).await;

        let bookings = self.appointments
            .list_doctor_appointments(doctor.id, day, auth_token)
            .await?;
        validate_slot(&draft.slot, &doctor, &bookings, self.clock.now())?;

        let price_detail = self.price(draft.target, patient.has_insurance(), auth_token).await?;
        let patient_id = self.persist_patient(patient, auth_token).await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: doctor.id,
            patient_id,
            service_id: draft.target.service_id(),
            package_id: draft.target.package_id(),
            date: format_date(day),
            start_time: draft.slot.start_time,
            end_time: draft.slot.end_time,
            paid: false,
            total_amount: price_detail.net_amount(),
        };

        let appointment = self.appointments.create_appointment(&appointment, auth_token).await?;

        info!("Appointment {} booked with doctor {} for {}", appointment.id, doctor.id, price_detail.net_amount());
        Ok(BookedAppointment { appointment, price_detail })
    }

    /// Registers the inline patient and books in one step. The patient is
    /// only stored when the booking is accepted.
    pub async fn create_appointment_with_patient(
        &self,
        draft: AppointmentDraft,
        auth_token: &str,
    ) -> Result<BookedAppointment, AppointmentError> {
        if !matches!(draft.patient, PatientRef::Inline(_)) {
            return Err(AppointmentError::InvalidInput("An inline patient body is required".to_string()));
        }
        self.create_appointment(draft, auth_token).await
    }

    /// Replaces every field of an appointment except its id and `paid` flag.
    /// The new slot is validated against the doctor's other bookings.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        draft: AppointmentDraft,
        auth_token: &str,
    ) -> Result<BookedAppointment, AppointmentError> {
        debug!("Updating appointment {}", appointment_id);

        let existing = self.appointments.get_appointment(appointment_id, auth_token).await?
            .ok_or(AppointmentError::NotFound(EntityKind::Appointment))?;

        let doctor = self.doctors.get_doctor(draft.doctor_id, auth_token).await?
            .ok_or(AppointmentError::NotFound(EntityKind::Doctor))?;

        let patient = self.resolve_patient(&draft.patient, auth_token).await?;

        let day = slot_day(&draft.slot)?;
        let _slot_guard = self.locks.acquire(doctor.id, day).await;

        let bookings: Vec<Appointment> = self.appointments
            .list_doctor_appointments(doctor.id, day, auth_token)
            .await?
            .into_iter()
            .filter(|booking| booking.id != existing.id)
            .collect();
        validate_slot(&draft.slot, &doctor, &bookings, self.clock.now())?;

        let price_detail = self.price(draft.target, patient.has_insurance(), auth_token).await?;
        let patient_id = self.persist_patient(patient, auth_token).await?;

        let appointment = Appointment {
            id: existing.id,
            doctor_id: doctor.id,
            patient_id,
            service_id: draft.target.service_id(),
            package_id: draft.target.package_id(),
            date: format_date(day),
            start_time: draft.slot.start_time,
            end_time: draft.slot.end_time,
            paid: existing.paid,
            total_amount: price_detail.net_amount(),
        };

        let appointment = self.appointments.update_appointment(&appointment, auth_token).await?;

        info!("Appointment {} updated", appointment.id);
        Ok(BookedAppointment { appointment, price_detail })
    }

    /// Prices a service or package for a patient without booking anything.
    pub async fn quote(
        &self,
        patient: &PatientRef,
        target: PricingTarget,
        auth_token: &str,
    ) -> Result<PriceDetail, AppointmentError> {
        let patient = self.resolve_patient(patient, auth_token).await?;
        self.price(target, patient.has_insurance(), auth_token).await
    }

    // ==============================================================================
    // APPOINTMENT RECORDS
    // ==============================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.appointments.get_appointment(appointment_id, auth_token).await?
            .ok_or(AppointmentError::NotFound(EntityKind::Appointment))
    }

    /// Marks an appointment as paid. Paying twice is a no-op.
    pub async fn mark_paid(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if appointment.paid {
            debug!("Appointment {} is already paid", appointment_id);
            return Ok(appointment);
        }

        let appointment = self.appointments.mark_paid(appointment_id, auth_token).await?;

        info!("Appointment {} paid ({})", appointment.id, appointment.total_amount);
        Ok(appointment)
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        self.get_appointment(appointment_id, auth_token).await?;
        self.appointments.delete_appointment(appointment_id, auth_token).await
    }

    pub async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        date: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let day = parse_date(date)
            .ok_or_else(|| AppointmentError::InvalidDateFormat(date.to_string()))?;

        if !self.doctors.doctor_exists(doctor_id, auth_token).await? {
            return Err(AppointmentError::NotFound(EntityKind::Doctor));
        }

        self.appointments.list_doctor_appointments(doctor_id, day, auth_token).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn resolve_patient(&self, patient: &PatientRef, auth_token: &str) -> Result<ResolvedPatient, AppointmentError> {
        match patient {
            PatientRef::ById(patient_id) => self.patients.get_patient_by_id(*patient_id, auth_token).await?
                .map(ResolvedPatient::Existing)
                .ok_or(AppointmentError::NotFound(EntityKind::Patient)),
            PatientRef::ByDni(dni) => self.patients.get_patient_by_dni(dni, auth_token).await?
                .map(ResolvedPatient::Existing)
                .ok_or(AppointmentError::NotFound(EntityKind::Patient)),
            PatientRef::Inline(body) => self.check_new_patient(body, auth_token).await.map(ResolvedPatient::New),
        }
    }

    /// Validates an inline patient body against formats and existing records.
    async fn check_new_patient(
        &self,
        body: &CreatePatientRequest,
        auth_token: &str,
    ) -> Result<ValidatedPatient, AppointmentError> {
        let patient = validate_patient_body(body, self.clock.now().date())?;

        let probe = UniquenessProbe {
            by_dni: self.patients.get_patient_by_dni(&patient.dni, auth_token).await?,
            by_email: self.patients.get_patient_by_email(&patient.email, auth_token).await?,
            by_phone: self.patients.get_patient_by_phone(&patient.phone, auth_token).await?,
        };
        probe.check(&patient)?;

        Ok(patient)
    }

    async fn persist_patient(&self, patient: ResolvedPatient, auth_token: &str) -> Result<Uuid, AppointmentError> {
        match patient {
            ResolvedPatient::Existing(patient) => Ok(patient.id),
            ResolvedPatient::New(patient) => {
                let created = self.patients.create_patient(&patient, auth_token).await?;
                info!("Registered patient {} while booking", created.id);
                Ok(created.id)
            }
        }
    }

    async fn price(&self, target: PricingTarget, has_insurance: bool, auth_token: &str) -> Result<PriceDetail, AppointmentError> {
        match target {
            PricingTarget::Service(service_id) => {
                let service = self.catalog.get_service(service_id, auth_token).await?
                    .ok_or(AppointmentError::NotFound(EntityKind::Service))?;
                Ok(price_service(service.price, has_insurance))
            }
            PricingTarget::Package(package_id) => {
                let package = self.catalog.get_package(package_id, auth_token).await?
                    .ok_or(AppointmentError::NotFound(EntityKind::Package))?;
                if package.services.is_empty() {
                    warn!("Package {} has no services", package.id);
                }
                Ok(price_package(&package.services, has_insurance))
            }
        }
    }
}
