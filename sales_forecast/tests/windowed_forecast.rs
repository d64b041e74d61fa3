use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_forecast::{
    forecast_last_week, forecast_sma, ForecastConfig, ForecastError, TimeSeries,
    WindowedForecaster,
};

fn monday() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn week_dates(start: NaiveDate) -> Vec<NaiveDate> {
    (0..7).map(|d| start + Duration::days(d)).collect()
}

/// Half-hourly series over `weeks` weeks valued by `f(week, timestamp)`
fn half_hourly<F>(weeks: usize, f: F) -> TimeSeries
where
    F: Fn(usize, NaiveDateTime) -> f64,
{
    let n = weeks * 336;
    let values = (0..n)
        .map(|i| {
            let ts = monday() + Duration::minutes(30 * i as i64);
            f(i / 336, ts)
        })
        .collect();
    TimeSeries::regular(monday(), Duration::minutes(30), values).unwrap()
}

fn slot_pattern(ts: NaiveDateTime) -> f64 {
    ts.weekday().num_days_from_monday() as f64 * 100.0 + ts.hour() as f64 + ts.minute() as f64 / 60.0
}

#[test]
fn test_constant_history_forecasts_constant() {
    let series = half_hourly(4, |_, _| 1.0);
    let forecast = forecast_sma(&series, 4, Some(&week_dates(date(1, 29)))).unwrap();

    assert_eq!(forecast.len(), 336);
    assert!(forecast.values().iter().all(|v| *v == Some(1.0)));
}

#[test]
fn test_window_one_uses_latest_week() {
    let series = half_hourly(2, |week, _| if week == 0 { 10.0 } else { 20.0 });
    let forecast = forecast_sma(&series, 1, Some(&week_dates(date(1, 15)))).unwrap();

    assert_eq!(forecast.len(), 336);
    assert!(forecast.values().iter().all(|v| *v == Some(20.0)));
}

#[rstest]
#[case(2, 15.0)]
#[case(4, 15.0)]
fn test_window_averages_available_weeks(#[case] window: usize, #[case] expected: f64) {
    let series = half_hourly(2, |week, _| if week == 0 { 10.0 } else { 20.0 });
    let forecast = forecast_sma(&series, window, Some(&[date(1, 17)])).unwrap();

    assert_eq!(forecast.len(), 48);
    assert!(forecast.values().iter().all(|v| *v == Some(expected)));
}

#[test]
fn test_last_week_across_forecast_weeks() {
    let series = half_hourly(2, |week, ts| slot_pattern(ts) + 1000.0 * week as f64);
    let dates = week_dates(date(1, 29));
    let forecast = forecast_last_week(&series, Some(&dates)).unwrap();

    // Weeks 3 and 4 repeat week 2, so week 5 does too
    assert_eq!(forecast.len(), 336);
    for (ts, value) in forecast.iter() {
        assert_eq!(value, Some(slot_pattern(ts) + 1000.0), "at {}", ts);
        assert_eq!(value, series.get(&(ts - Duration::weeks(3))).flatten());
    }
}

#[test]
fn test_last_week_skips_history_gaps() {
    // Week 2 is absent from the history
    let full = half_hourly(3, |week, ts| slot_pattern(ts) + 1000.0 * week as f64);
    let points: Vec<(NaiveDateTime, Option<f64>)> = full
        .iter()
        .filter(|(ts, _)| *ts < monday() + Duration::weeks(1) || *ts >= monday() + Duration::weeks(2))
        .collect();
    let (timestamps, values) = points.into_iter().unzip();
    let series = TimeSeries::new(timestamps, values).unwrap();

    let forecast = forecast_last_week(&series, Some(&week_dates(date(1, 22)))).unwrap();
    assert_eq!(forecast.len(), 336);
    for (ts, value) in forecast.iter() {
        assert_eq!(value, series.get(&(ts - Duration::weeks(1))).flatten());
    }
}

#[test]
fn test_window_one_matches_last_week() {
    let series = half_hourly(3, |week, ts| (slot_pattern(ts) * (week + 1) as f64).sqrt());
    let dates = week_dates(date(1, 29));

    let sma = forecast_sma(&series, 1, Some(&dates)).unwrap();
    let last_week = forecast_last_week(&series, Some(&dates)).unwrap();
    assert_eq!(sma, last_week);
}

#[rstest]
#[case(1)]
#[case(4)]
fn test_observed_dates_return_history(#[case] window: usize) {
    let series = half_hourly(3, |week, ts| slot_pattern(ts) - week as f64);
    let dates = [date(1, 3), date(1, 10)];

    let forecast = forecast_sma(&series, window, Some(&dates)).unwrap();
    assert_eq!(forecast, series.restrict_to_dates(&dates));

    let again = forecast_sma(&series, window, Some(&dates)).unwrap();
    assert_eq!(forecast, again);
}

#[test]
fn test_default_dates_are_following_week() {
    let series = half_hourly(2, |_, ts| slot_pattern(ts));
    let forecast = forecast_sma(&series, 4, None).unwrap();

    assert_eq!(forecast.len(), 336);
    assert_eq!(forecast.first_timestamp(), Some(monday() + Duration::weeks(2)));
    assert_eq!(forecast.missing_count(), 0);
}

/// Two full weeks plus the first half of the third Monday
fn partial_day_history() -> TimeSeries {
    let values = (0..2 * 336 + 24)
        .map(|i| slot_pattern(monday() + Duration::minutes(30 * i as i64)))
        .collect();
    TimeSeries::regular(monday(), Duration::minutes(30), values).unwrap()
}

#[test]
fn test_partly_observed_target_date_is_not_extended() {
    let series = partial_day_history();
    let dates = [date(1, 15)];

    let forecast = forecast_sma(&series, 4, Some(&dates)).unwrap();
    assert_eq!(forecast.len(), 24);
    assert_eq!(forecast, series.restrict_to_dates(&dates));
}

#[test]
fn test_default_dates_after_partial_day() {
    let series = partial_day_history();
    let forecast = forecast_last_week(&series, None).unwrap();

    // Expansion stops once the last target date is reached, at 11:30
    assert_eq!(forecast.len(), 6 * 48 + 24);
    assert_eq!(forecast.first_timestamp(), Some(monday() + Duration::days(15)));
    assert_eq!(forecast.last_timestamp(), date(1, 22).and_hms_opt(11, 30, 0));
}

#[test]
fn test_slots_without_history_stay_missing() {
    // Only Monday is observed
    let series = TimeSeries::regular(monday(), Duration::minutes(30), vec![5.0; 48]).unwrap();
    let forecast = forecast_sma(&series, 4, None).unwrap();

    assert_eq!(forecast.len(), 336);
    assert_eq!(forecast.missing_count(), 288);
    for (ts, value) in forecast.iter() {
        if ts.weekday().num_days_from_monday() == 0 {
            assert_eq!(value, Some(5.0));
        } else {
            assert_eq!(value, None);
        }
    }
}

#[test]
fn test_empty_inputs() {
    assert!(forecast_sma(&TimeSeries::empty(), 4, None).unwrap().is_empty());

    let series = half_hourly(1, |_, _| 1.0);
    assert!(forecast_sma(&series, 4, Some(&[])).unwrap().is_empty());
}

#[test]
fn test_invalid_window() {
    let series = half_hourly(1, |_, _| 1.0);
    assert!(matches!(
        forecast_sma(&series, 0, None),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_horizon_limit_from_config() {
    let config = ForecastConfig {
        max_horizon_weeks: 2,
        ..Default::default()
    };
    let forecaster = WindowedForecaster::seasonal_mean(4, &config).unwrap();
    let series = half_hourly(1, |_, _| 1.0);

    assert!(forecaster.forecast(&series, Some(&[date(1, 20)])).is_ok());
    assert!(matches!(
        forecaster.forecast(&series, Some(&[date(3, 1)])),
        Err(ForecastError::HorizonTooLong { limit: 2, .. })
    ));
}
