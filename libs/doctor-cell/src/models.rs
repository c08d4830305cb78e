use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::time::parse_time_of_day;

// ==============================================================================
// WORKING DAYS
// ==============================================================================

/// The fixed seven-name vocabulary used for a doctor's working days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeekDay {
    #[serde(alias = "monday", alias = "MONDAY")]
    Monday,
    #[serde(alias = "tuesday", alias = "TUESDAY")]
    Tuesday,
    #[serde(alias = "wednesday", alias = "WEDNESDAY")]
    Wednesday,
    #[serde(alias = "thursday", alias = "THURSDAY")]
    Thursday,
    #[serde(alias = "friday", alias = "FRIDAY")]
    Friday,
    #[serde(alias = "saturday", alias = "SATURDAY")]
    Saturday,
    #[serde(alias = "sunday", alias = "SUNDAY")]
    Sunday,
}

impl WeekDay {
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeekDay::Monday => "Monday",
            WeekDay::Tuesday => "Tuesday",
            WeekDay::Wednesday => "Wednesday",
            WeekDay::Thursday => "Thursday",
            WeekDay::Friday => "Friday",
            WeekDay::Saturday => "Saturday",
            WeekDay::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for WeekDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => WeekDay::Monday,
            Weekday::Tue => WeekDay::Tuesday,
            Weekday::Wed => WeekDay::Wednesday,
            Weekday::Thu => WeekDay::Thursday,
            Weekday::Fri => WeekDay::Friday,
            Weekday::Sat => WeekDay::Saturday,
            Weekday::Sun => WeekDay::Sunday,
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekDay {
    type Err = DoctorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeekDay::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DoctorError::InvalidSchedule(format!("Unknown weekday: {}", s)))
    }
}

// ==============================================================================
// DOCTOR
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
    pub working_days: Vec<WeekDay>,
    /// Daily opening time, `HH:MM` or `HH:MM:SS`.
    pub start_time: String,
    /// Daily closing time, `HH:MM` or `HH:MM:SS`.
    pub end_time: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn works_on(&self, day: WeekDay) -> bool {
        self.working_days.contains(&day)
    }

    /// Parsed daily window; fails when either bound is unparsable or the
    /// window is empty.
    pub fn working_window(&self) -> Result<(NaiveTime, NaiveTime), DoctorError> {
        parse_window(&self.start_time, &self.end_time)
    }
}

pub fn parse_window(start: &str, end: &str) -> Result<(NaiveTime, NaiveTime), DoctorError> {
    let start_time = parse_time_of_day(start)
        .ok_or_else(|| DoctorError::InvalidSchedule(format!("Invalid start time: {}", start)))?;
    let end_time = parse_time_of_day(end)
        .ok_or_else(|| DoctorError::InvalidSchedule(format!("Invalid end time: {}", end)))?;

    if start_time >= end_time {
        return Err(DoctorError::InvalidSchedule(
            "Working hours must start before they end".to_string(),
        ));
    }

    Ok((start_time, end_time))
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
    pub working_days: Vec<WeekDay>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub working_days: Option<Vec<WeekDay>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialty: Option<String>,
    pub working_day: Option<WeekDay>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for DoctorError {
    fn from(e: anyhow::Error) -> Self {
        DoctorError::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(days: Vec<WeekDay>, start: &str, end: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Luis".to_string(),
            last_name: "Medina".to_string(),
            email: "luis@example.com".to_string(),
            specialty: "General Practice".to_string(),
            working_days: days,
            start_time: start.to_string(),
            end_time: end.to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_weekday_vocabulary_is_case_insensitive() {
        assert_eq!("monday".parse::<WeekDay>().unwrap(), WeekDay::Monday);
        assert_eq!("SUNDAY".parse::<WeekDay>().unwrap(), WeekDay::Sunday);
        assert!("Lunes".parse::<WeekDay>().is_err());
    }

    #[test]
    fn test_weekday_serde_accepts_lowercase() {
        let days: Vec<WeekDay> = serde_json::from_str(r#"["monday", "Friday"]"#).unwrap();
        assert_eq!(days, vec![WeekDay::Monday, WeekDay::Friday]);
        assert_eq!(serde_json::to_string(&WeekDay::Friday).unwrap(), "\"Friday\"");
    }

    #[test]
    fn test_working_window_accepts_postgres_times() {
        let d = doctor(vec![WeekDay::Monday], "09:00:00", "17:00");
        let (start, end) = d.working_window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert!(d.works_on(WeekDay::Monday));
        assert!(!d.works_on(WeekDay::Sunday));
    }

    #[test]
    fn test_inverted_window_is_invalid() {
        let d = doctor(vec![WeekDay::Monday], "17:00", "09:00");
        assert!(matches!(d.working_window(), Err(DoctorError::InvalidSchedule(_))));

        let d = doctor(vec![WeekDay::Monday], "nine", "17:00");
        assert!(matches!(d.working_window(), Err(DoctorError::InvalidSchedule(_))));
    }
}
