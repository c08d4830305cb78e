use chrono::{Datelike, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use doctor_cell::{Doctor, WeekDay};
use shared_utils::time::{parse_date, parse_time_of_day};

use crate::models::{Appointment, AppointmentError, ScheduleRejection, Slot};

fn parse_time(value: &str) -> Result<NaiveTime, AppointmentError> {
    parse_time_of_day(value).ok_or_else(|| AppointmentError::InvalidTimeFormat(value.to_string()))
}

/// Overlap of half-open intervals; ranges that only touch do not overlap.
pub fn overlaps(start: NaiveTime, end: NaiveTime, other_start: NaiveTime, other_end: NaiveTime) -> bool {
    start < other_end && end > other_start
}

/// Decides whether `slot` can be booked with `doctor`, given the doctor's
/// other bookings. Checks run in a fixed order and the first failure wins.
///
/// The working window is inclusive at both ends while booking overlap is
/// strict, so a slot may start at opening time and end at closing time, and
/// back-to-back bookings are allowed.
pub fn validate_slot(
    slot: &Slot,
    doctor: &Doctor,
    bookings: &[Appointment],
    now: NaiveDateTime,
) -> Result<(), AppointmentError> {
    debug!("Validating slot {} {}-{} for doctor {}", slot.date, slot.start_time, slot.end_time, doctor.id);

    let start = parse_time(&slot.start_time)?;
    let end = parse_time(&slot.end_time)?;
    let date = parse_date(&slot.date)
        .ok_or_else(|| AppointmentError::InvalidDateFormat(slot.date.clone()))?;

    if date.and_time(start) <= now {
        return Err(ScheduleRejection::DateInPast.into());
    }

    if start >= end {
        return Err(ScheduleRejection::InvalidTimeRange.into());
    }

    let day = WeekDay::from(date.weekday());
    if !doctor.works_on(day) {
        return Err(ScheduleRejection::DayNotAvailable(day).into());
    }

    let (opens, closes) = doctor
        .working_window()
        .map_err(|e| ScheduleRejection::InvalidDoctorSchedule(e.to_string()))?;

    if start < opens || end > closes {
        return Err(ScheduleRejection::OutsideWorkingHours {
            start: doctor.start_time.clone(),
            end: doctor.end_time.clone(),
        }
        .into());
    }

    for booking in bookings {
        let (Some(booked_date), Some(booked_start), Some(booked_end)) = (
            parse_date(&booking.date),
            parse_time_of_day(&booking.start_time),
            parse_time_of_day(&booking.end_time),
        ) else {
            warn!("Appointment {} has an unreadable date or time range", booking.id);
            return Err(AppointmentError::DatabaseError(format!(
                "Stored appointment {} has an unreadable date or time range",
                booking.id
            )));
        };

        if booked_date != date {
            continue;
        }

        if overlaps(start, end, booked_start, booked_end) {
            debug!("Slot conflicts with appointment {}", booking.id);
            return Err(ScheduleRejection::TimeConflict.into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    // 2030-01-07 is a Monday
    const MONDAY: &str = "2030-01-07";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn doctor() -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Luis".to_string(),
            last_name: "Medina".to_string(),
            email: "luis.medina@example.com".to_string(),
            specialty: "General Practice".to_string(),
            working_days: vec![WeekDay::Monday, WeekDay::Wednesday],
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    fn slot(date: &str, start: &str, end: &str) -> Slot {
        Slot {
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn booking(date: &str, start: &str, end: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            service_id: Some(Uuid::new_v4()),
            package_id: None,
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            paid: false,
            total_amount: Decimal::new(100, 0),
        }
    }

    fn rejection(result: Result<(), AppointmentError>) -> ScheduleRejection {
        match result {
            Err(AppointmentError::Scheduling(rejection)) => rejection,
            other => panic!("expected a scheduling rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_slot_inside_window() {
        assert!(validate_slot(&slot(MONDAY, "09:30", "10:00"), &doctor(), &[], now()).is_ok());
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        assert!(validate_slot(&slot(MONDAY, "09:00", "17:00"), &doctor(), &[], now()).is_ok());

        assert_matches!(
            rejection(validate_slot(&slot(MONDAY, "08:59", "10:00"), &doctor(), &[], now())),
            ScheduleRejection::OutsideWorkingHours { .. }
        );
        assert_matches!(
            rejection(validate_slot(&slot(MONDAY, "16:00", "17:01"), &doctor(), &[], now())),
            ScheduleRejection::OutsideWorkingHours { .. }
        );
    }

    #[test]
    fn test_touching_bookings_do_not_conflict() {
        let existing = [booking(MONDAY, "09:00", "10:00")];
        assert!(validate_slot(&slot(MONDAY, "10:00", "11:00"), &doctor(), &existing, now()).is_ok());
    }

    #[test]
    fn test_overlapping_bookings_conflict() {
        let existing = [booking(MONDAY, "09:00", "10:30")];

        assert_eq!(
            rejection(validate_slot(&slot(MONDAY, "10:00", "11:00"), &doctor(), &existing, now())),
            ScheduleRejection::TimeConflict
        );
    }

    #[test]
    fn test_bookings_on_other_dates_are_ignored() {
        let existing = [booking("2030-01-09", "09:00", "17:00")];
        assert!(validate_slot(&slot(MONDAY, "09:00", "10:00"), &doctor(), &existing, now()).is_ok());
    }

    #[test]
    fn test_unpadded_date_still_sees_padded_bookings() {
        let existing = [booking(MONDAY, "09:00:00", "10:00:00")];

        assert_eq!(
            rejection(validate_slot(&slot("2030-1-7", "09:00", "10:00"), &doctor(), &existing, now())),
            ScheduleRejection::TimeConflict
        );
    }

    #[test]
    fn test_seconds_in_stored_times_are_understood() {
        let existing = [booking(MONDAY, "09:00:00", "10:00:00")];
        assert!(validate_slot(&slot(MONDAY, "10:00", "10:30"), &doctor(), &existing, now()).is_ok());
        assert_matches!(
            rejection(validate_slot(&slot(MONDAY, "09:30", "10:30"), &doctor(), &existing, now())),
            ScheduleRejection::TimeConflict
        );
    }

    #[test]
    fn test_earlier_today_is_in_the_past() {
        let now = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap().and_hms_opt(11, 0, 0).unwrap();

        assert_eq!(
            rejection(validate_slot(&slot(MONDAY, "10:00", "10:30"), &doctor(), &[], now)),
            ScheduleRejection::DateInPast
        );
        assert!(validate_slot(&slot(MONDAY, "11:30", "12:00"), &doctor(), &[], now).is_ok());
    }

    #[test]
    fn test_start_must_precede_end() {
        assert_eq!(
            rejection(validate_slot(&slot(MONDAY, "10:00", "10:00"), &doctor(), &[], now())),
            ScheduleRejection::InvalidTimeRange
        );
        assert_eq!(
            rejection(validate_slot(&slot(MONDAY, "11:00", "10:00"), &doctor(), &[], now())),
            ScheduleRejection::InvalidTimeRange
        );
    }

    #[test]
    fn test_day_must_be_a_working_day() {
        assert_eq!(
            rejection(validate_slot(&slot("2030-01-13", "10:00", "11:00"), &doctor(), &[], now())),
            ScheduleRejection::DayNotAvailable(WeekDay::Sunday)
        );
    }

    #[test]
    fn test_broken_doctor_window_is_reported() {
        let mut doctor = doctor();
        doctor.end_time = "08:00".to_string();

        assert_matches!(
            rejection(validate_slot(&slot(MONDAY, "09:00", "10:00"), &doctor, &[], now())),
            ScheduleRejection::InvalidDoctorSchedule(_)
        );
    }

    #[test]
    fn test_malformed_input_is_not_a_rejection() {
        assert_matches!(
            validate_slot(&slot(MONDAY, "9h30", "10:00"), &doctor(), &[], now()),
            Err(AppointmentError::InvalidTimeFormat(_))
        );
        assert_matches!(
            validate_slot(&slot("07/01/2030", "09:30", "10:00"), &doctor(), &[], now()),
            Err(AppointmentError::InvalidDateFormat(_))
        );
    }

    #[test]
    fn test_unreadable_stored_booking_fails_closed() {
        let existing = [booking(MONDAY, "morning", "10:00")];
        assert_matches!(
            validate_slot(&slot(MONDAY, "11:00", "12:00"), &doctor(), &existing, now()),
            Err(AppointmentError::DatabaseError(_))
        );
    }
}
