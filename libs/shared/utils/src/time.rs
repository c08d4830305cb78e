use chrono::{NaiveDate, NaiveTime};

/// Parses a time of day written as `HH:MM` or `HH:MM:SS` (PostgreSQL `time`).
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a calendar date written as `YYYY-MM-DD`. Unpadded months and days
/// (`2030-1-7`) are accepted, so compare parsed dates rather than raw strings.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Zero-padded `YYYY-MM-DD`, the form dates are stored and queried in.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Rewrites a parseable date into its zero-padded form; anything else is
/// returned trimmed so callers can still report it.
pub fn canonical_date(value: &str) -> String {
    parse_date(value).map(format_date).unwrap_or_else(|| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_both_time_layouts() {
        let expected = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_time_of_day("09:30"), Some(expected));
        assert_eq!(parse_time_of_day("09:30:00"), Some(expected));
        assert_eq!(parse_time_of_day(" 09:30 "), Some(expected));
    }

    #[test]
    fn test_rejects_garbage_times() {
        assert_eq!(parse_time_of_day("9.30"), None);
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day(""), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2030-01-07"), NaiveDate::from_ymd_opt(2030, 1, 7));
        assert_eq!(parse_date("07/01/2030"), None);
        assert_eq!(parse_date("2030-02-30"), None);
    }

    #[test]
    fn test_unpadded_dates_become_canonical() {
        assert_eq!(parse_date("2030-1-7"), NaiveDate::from_ymd_opt(2030, 1, 7));
        assert_eq!(canonical_date(" 2030-1-7 "), "2030-01-07");
        assert_eq!(canonical_date("2030-01-07"), "2030-01-07");
        assert_eq!(canonical_date("next monday"), "next monday");
    }
}
