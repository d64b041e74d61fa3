//! Expanding-window forecasting
//!
//! A forecaster only has to predict the week right after its history. The
//! [`ExpandingDriver`] turns that into arbitrary horizons: it appends a week
//! of placeholder slots, asks for their values, folds the answers back into
//! the working series and repeats until the requested dates are covered.
//! Forecasts of week N are therefore history for week N + 1.

use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::series::TimeSeries;
use crate::utils::{
    covers, default_target_dates, placeholder_week, reaches_date, validate_step, weeks_to_cover,
    weeks_to_reach,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use slot_math::SlotWindower;
use tracing::{debug, warn};

/// When the expansion loop may stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coverage {
    /// The latest observation falls on the latest target date. A date that
    /// is already partly observed is not extended.
    #[default]
    ReachesDate,
    /// The last slot of the latest target date exists
    FullDay,
}

impl Coverage {
    fn is_covered(self, last: NaiveDateTime, target_end: NaiveDate, step: Duration) -> bool {
        match self {
            Coverage::ReachesDate => reaches_date(last, target_end),
            Coverage::FullDay => covers(last, target_end, step),
        }
    }

    fn weeks_needed(self, last: NaiveDateTime, target_end: NaiveDate, step: Duration) -> usize {
        match self {
            Coverage::ReachesDate => weeks_to_reach(last, target_end),
            Coverage::FullDay => weeks_to_cover(last, target_end, step),
        }
    }
}

/// Repeat-until-covered loop shared by every forecaster
#[derive(Debug, Clone)]
pub struct ExpandingDriver {
    fallback_step: Duration,
    default_horizon_days: u32,
    max_horizon_weeks: usize,
    coverage: Coverage,
}

impl ExpandingDriver {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            fallback_step: config.time_step(),
            default_horizon_days: config.default_horizon_days,
            max_horizon_weeks: config.max_horizon_weeks,
            coverage: Coverage::default(),
        }
    }

    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    /// Step of `series`, or the configured one when it has a single point
    pub fn step_of(&self, series: &TimeSeries) -> Duration {
        series.min_step().unwrap_or(self.fallback_step)
    }

    /// Extend `series` week by week and return the points on `dates`.
    ///
    /// `forecast_week` receives the working series and the placeholder
    /// timestamps and must return one value per placeholder. Without `dates`
    /// the days following the latest observation are used. An empty series
    /// is returned unchanged.
    pub fn run<F>(
        &self,
        series: &TimeSeries,
        dates: Option<&[NaiveDate]>,
        mut forecast_week: F,
    ) -> Result<TimeSeries>
    where
        F: FnMut(&TimeSeries, &[NaiveDateTime]) -> Result<Vec<Option<f64>>>,
    {
        let last = match series.last_timestamp() {
            Some(last) => last,
            None => return Ok(series.clone()),
        };

        let dates = match dates {
            Some(dates) => dates.to_vec(),
            None => default_target_dates(last.date(), self.default_horizon_days),
        };
        let target_end = match dates.iter().max() {
            Some(end) => *end,
            None => return Ok(TimeSeries::empty()),
        };

        let step = self.step_of(series);
        validate_step(step)?;

        let weeks = self.coverage.weeks_needed(last, target_end, step);
        if weeks > self.max_horizon_weeks {
            return Err(ForecastError::HorizonTooLong {
                requested: weeks,
                limit: self.max_horizon_weeks,
            });
        }

        let mut working = series.clone();
        let mut iteration = 0;
        while let Some(anchor) = working.last_timestamp() {
            if self.coverage.is_covered(anchor, target_end, step) {
                break;
            }
            iteration += 1;

            let placeholder = placeholder_week(anchor, step)?;
            let values = forecast_week(&working, &placeholder)?;
            if values.len() != placeholder.len() {
                return Err(ForecastError::ModelError(format!(
                    "Forecaster returned {} values for {} placeholder slots",
                    values.len(),
                    placeholder.len()
                )));
            }

            let missing = values.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                warn!(
                    anchor = %anchor,
                    missing,
                    "slots without history left unforecast"
                );
            }
            debug!(iteration, anchor = %anchor, slots = placeholder.len(), "expanded one week");

            working.extend(placeholder.into_iter().zip(values))?;
        }

        Ok(working.restrict_to_dates(&dates))
    }
}

/// Seasonal forecaster built on a slot windower: moving average over the
/// same slot of previous weeks, or plain "same time last week".
#[derive(Debug, Clone)]
pub struct WindowedForecaster {
    windower: SlotWindower,
    driver: ExpandingDriver,
}

impl WindowedForecaster {
    /// Mean of the last `window` weeks at the same slot
    pub fn seasonal_mean(window: usize, config: &ForecastConfig) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            windower: SlotWindower::mean(window)?,
            driver: ExpandingDriver::new(config),
        })
    }

    /// Value of the same slot one week earlier
    pub fn last_week(config: &ForecastConfig) -> Self {
        Self {
            windower: SlotWindower::last_observed(),
            driver: ExpandingDriver::new(config),
        }
    }

    pub fn window(&self) -> usize {
        self.windower.window()
    }

    /// Forecast `series` on `dates` (default: the following week)
    pub fn forecast(&self, series: &TimeSeries, dates: Option<&[NaiveDate]>) -> Result<TimeSeries> {
        self.driver.run(series, dates, |history, placeholder| {
            let points = history
                .iter()
                .chain(placeholder.iter().map(|ts| (*ts, None)));
            let windowed = self.windower.apply(points)?;
            Ok(windowed[history.len()..].to_vec())
        })
    }
}

/// Seasonal moving-average forecast with the default configuration
pub fn forecast_sma(
    series: &TimeSeries,
    window: usize,
    dates: Option<&[NaiveDate]>,
) -> Result<TimeSeries> {
    WindowedForecaster::seasonal_mean(window, &ForecastConfig::default())?.forecast(series, dates)
}

/// "Same time last week" forecast with the default configuration
pub fn forecast_last_week(series: &TimeSeries, dates: Option<&[NaiveDate]>) -> Result<TimeSeries> {
    WindowedForecaster::last_week(&ForecastConfig::default()).forecast(series, dates)
}
