//! Calendar helpers shared by the expanding forecasters

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// The `n_days` calendar days following `latest`
pub fn default_target_dates(latest: NaiveDate, n_days: u32) -> Vec<NaiveDate> {
    (1..=n_days as i64)
        .map(|i| latest + Duration::days(i))
        .collect()
}

/// Check `step` can tile a week exactly
pub fn validate_step(step: Duration) -> Result<()> {
    let week = Duration::weeks(1).num_seconds();
    let secs = step.num_seconds();
    if secs <= 0 || week % secs != 0 || step != Duration::seconds(secs) {
        return Err(ForecastError::InvalidParameter(format!(
            "Step of {} seconds does not divide one week",
            secs
        )));
    }
    Ok(())
}

/// Timestamps of one week after `anchor`: `anchor` excluded, `anchor + 1 week`
/// included.
pub fn placeholder_week(anchor: NaiveDateTime, step: Duration) -> Result<Vec<NaiveDateTime>> {
    validate_step(step)?;
    let periods = (Duration::weeks(1).num_seconds() / step.num_seconds()) as i32;
    Ok((1..=periods).map(|i| anchor + step * i).collect())
}

/// True once `last_timestamp` falls on or after `last_date`, even part way
/// through that day
pub fn reaches_date(last_timestamp: NaiveDateTime, last_date: NaiveDate) -> bool {
    last_timestamp.date() >= last_date
}

/// Number of one-week expansions needed before `last_date` is reached
pub fn weeks_to_reach(last_timestamp: NaiveDateTime, last_date: NaiveDate) -> usize {
    match last_date.and_hms_opt(0, 0, 0) {
        Some(midnight) => weeks_spanning(midnight - last_timestamp),
        None => 0,
    }
}

/// True once the last slot of `last_date` is present, i.e. no slot of that
/// day lies after `last_timestamp`.
pub fn covers(last_timestamp: NaiveDateTime, last_date: NaiveDate, step: Duration) -> bool {
    match last_date.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(next_midnight) => last_timestamp + step >= next_midnight,
        None => true,
    }
}

/// Number of one-week expansions needed before `last_date` is covered
pub fn weeks_to_cover(last_timestamp: NaiveDateTime, last_date: NaiveDate, step: Duration) -> usize {
    match last_date.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(next_midnight) => weeks_spanning(next_midnight - step - last_timestamp),
        None => 0,
    }
}

/// Whole weeks needed to advance by `gap`, zero when it is not positive
fn weeks_spanning(gap: Duration) -> usize {
    let missing = gap.num_seconds();
    if missing <= 0 {
        return 0;
    }
    let week = Duration::weeks(1).num_seconds();
    ((missing + week - 1) / week) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_default_dates_follow_latest() {
        let dates = default_target_dates(date(7), 7);
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], date(8));
        assert_eq!(dates[6], date(14));
    }

    #[test]
    fn test_placeholder_week_bounds() {
        let anchor = date(7).and_hms_opt(23, 30, 0).unwrap();
        let week = placeholder_week(anchor, Duration::minutes(30)).unwrap();

        assert_eq!(week.len(), 336);
        assert_eq!(week[0], date(8).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(*week.last().unwrap(), anchor + Duration::weeks(1));
    }

    #[test]
    fn test_step_must_divide_week() {
        assert!(validate_step(Duration::minutes(30)).is_ok());
        assert!(validate_step(Duration::minutes(11)).is_err());
        assert!(validate_step(Duration::zero()).is_err());
    }

    #[test]
    fn test_coverage() {
        let step = Duration::minutes(30);
        let last_slot = date(7).and_hms_opt(23, 30, 0).unwrap();
        assert!(covers(last_slot, date(7), step));
        assert!(!covers(last_slot - step, date(7), step));
        assert!(!covers(last_slot, date(8), step));

        assert_eq!(weeks_to_cover(last_slot, date(7), step), 0);
        assert_eq!(weeks_to_cover(last_slot, date(14), step), 1);
        assert_eq!(weeks_to_cover(last_slot, date(15), step), 2);
    }

    #[test]
    fn test_reaching_a_partly_observed_date() {
        let noon = date(7).and_hms_opt(11, 30, 0).unwrap();
        assert!(reaches_date(noon, date(7)));
        assert!(!reaches_date(noon, date(8)));
        assert!(!covers(noon, date(7), Duration::minutes(30)));

        assert_eq!(weeks_to_reach(noon, date(7)), 0);
        assert_eq!(weeks_to_reach(noon, date(14)), 1);
        assert_eq!(weeks_to_reach(noon, date(15)), 2);
    }
}
