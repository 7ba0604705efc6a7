use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateError {
    /// Neither a decimal year nor a calendar date
    #[error("unrecognised date {0:?}, expected a decimal year (2024.5) or YYYY-MM-DD")]
    Unrecognised(String),

    /// Calendar date chrono cannot represent
    #[error("date {0:?} is out of range")]
    OutOfRange(String),
}

/// Number of days in the calendar year `year`.
fn days_in_year(year: i32) -> Option<i64> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let next = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
    Some((next - start).num_days())
}

/// Converts a calendar date (taken at midnight) into a decimal year, e.g. 2024-07-02 -> 2024.5.
pub fn decimal_year(date: NaiveDate) -> f64 {
    year_fraction(date, 0.0)
}

/// Converts a date and time into a decimal year, counting the elapsed fraction of the day.
pub fn decimal_year_from_datetime(datetime: NaiveDateTime) -> f64 {
    let day_fraction = f64::from(datetime.time().num_seconds_from_midnight()) / 86_400.0;
    year_fraction(datetime.date(), day_fraction)
}

fn year_fraction(date: NaiveDate, day_fraction: f64) -> f64 {
    let year = date.year();
    let days = days_in_year(year).unwrap_or(365) as f64;
    f64::from(year) + (f64::from(date.ordinal0()) + day_fraction) / days
}

/// Parses either a decimal year (`2024.5`) or an ISO calendar date (`2024-07-02`).
pub fn parse_date(input: &str) -> Result<f64, DateError> {
    let trimmed = input.trim();
    if let Ok(year) = trimmed.parse::<f64>() {
        return if year.is_finite() {
            Ok(year)
        } else {
            Err(DateError::OutOfRange(input.to_string()))
        };
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| DateError::Unrecognised(input.to_string()))?;
    if days_in_year(date.year()).is_none() {
        Err(DateError::OutOfRange(input.to_string()))?
    }
    Ok(decimal_year(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_year_is_whole() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(decimal_year(date), 2020.0);
    }

    #[test]
    fn leap_year_midpoint() {
        // 2024 has 366 days, so July 2nd at midnight is exactly half way
        let date = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        assert_eq!(decimal_year(date), 2024.5);
    }

    #[test]
    fn time_of_day_counts() {
        let noon = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(decimal_year_from_datetime(noon), 2023.0 + 0.5 / 365.0);
    }

    #[test]
    fn parses_both_forms() {
        assert_eq!(parse_date("2021.25"), Ok(2021.25));
        assert_eq!(parse_date(" 2024-07-02 "), Ok(2024.5));
        assert!(matches!(
            parse_date("July 2024"),
            Err(DateError::Unrecognised(_))
        ));
        assert!(matches!(parse_date("inf"), Err(DateError::OutOfRange(_))));
    }
}
