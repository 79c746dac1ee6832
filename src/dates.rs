//! Date parsing and season windows

use chrono::{Datelike, NaiveDate, Utc};

use crate::{Error, Result};

/// Earliest season the `--all` backfill covers. Pitch tracking data is
/// reliable from here on.
pub const FIRST_TRACKED_SEASON: i32 = 2015;

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::Config(format!("invalid date '{}', expected YYYY-MM-DD", s)))
}

/// Schedule window for one season: spring training through the end of the
/// postseason, Feb 15 to Nov 15.
pub fn season_range(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 2, 15)
        .ok_or_else(|| Error::Config(format!("invalid season year {}", year)))?;
    let end = NaiveDate::from_ymd_opt(year, 11, 15)
        .ok_or_else(|| Error::Config(format!("invalid season year {}", year)))?;
    Ok((start, end))
}

/// Windows for an inclusive span of seasons
pub fn season_ranges(first: i32, last: i32) -> Result<Vec<(NaiveDate, NaiveDate)>> {
    if first > last {
        return Err(Error::Config(format!(
            "season span {}-{} runs backwards",
            first, last
        )));
    }
    (first..=last).map(season_range).collect()
}

/// Check that an explicit date range is usable
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::Config(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

pub fn current_season() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        let date = parse_date("2024-06-27").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 27).unwrap());
    }

    #[test]
    fn rejects_other_formats() {
        assert!(parse_date("06/27/2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn season_window_spans_spring_to_postseason() {
        let (start, end) = season_range(2024).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 11, 15).unwrap());
    }

    #[test]
    fn season_span_is_inclusive() {
        let ranges = season_ranges(2022, 2024).unwrap();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].0.year(), 2022);
        assert_eq!(ranges[2].0.year(), 2024);
        assert!(season_ranges(2024, 2022).is_err());
    }

    #[test]
    fn backwards_range_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(validate_range(start, end).is_err());
        assert!(validate_range(end, start).is_ok());
    }
}
