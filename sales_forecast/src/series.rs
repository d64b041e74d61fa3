//! Time-indexed series and sales tables

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

fn check_increasing(timestamps: &[NaiveDateTime]) -> Result<()> {
    if let Some(pair) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
        return Err(ForecastError::DataError(format!(
            "Timestamps must be strictly increasing: {} follows {}",
            pair[1], pair[0]
        )));
    }
    Ok(())
}

/// Ordered mapping from timestamp to an optional value.
///
/// `None` marks a point whose value is unknown, e.g. a forecast for a slot
/// that never had history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Create a series, checking the index is strictly increasing
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<Option<f64>>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Timestamps length ({}) doesn't match values length ({})",
                timestamps.len(),
                values.len()
            )));
        }
        check_increasing(&timestamps)?;

        Ok(Self { timestamps, values })
    }

    /// Create a fully observed series
    pub fn from_values(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        Self::new(timestamps, values.into_iter().map(Some).collect())
    }

    /// Create a series sampled every `step` from `start`
    pub fn regular(start: NaiveDateTime, step: Duration, values: Vec<f64>) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(ForecastError::InvalidParameter(
                "Step must be positive".to_string(),
            ));
        }
        let timestamps = (0..values.len())
            .map(|i| start + step * i as i32)
            .collect();
        Self::from_values(timestamps, values)
    }

    /// A series with no points
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Value at `timestamp`; the outer `None` means the timestamp is absent
    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<Option<f64>> {
        self.timestamps
            .binary_search(timestamp)
            .ok()
            .map(|idx| self.values[idx])
    }

    /// Iterate over (timestamp, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, Option<f64>)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Append points after the current end of the series
    pub fn extend<I>(&mut self, points: I) -> Result<()>
    where
        I: IntoIterator<Item = (NaiveDateTime, Option<f64>)>,
    {
        for (timestamp, value) in points {
            if let Some(last) = self.last_timestamp() {
                if timestamp <= last {
                    return Err(ForecastError::DataError(format!(
                        "Cannot append {} after {}",
                        timestamp, last
                    )));
                }
            }
            self.timestamps.push(timestamp);
            self.values.push(value);
        }
        Ok(())
    }

    /// Keep only the points whose calendar date is in `dates`
    pub fn restrict_to_dates(&self, dates: &[NaiveDate]) -> Self {
        let wanted: HashSet<NaiveDate> = dates.iter().copied().collect();
        let (timestamps, values) = self
            .iter()
            .filter(|(ts, _)| wanted.contains(&ts.date()))
            .unzip();
        Self { timestamps, values }
    }

    /// Smallest gap between consecutive timestamps
    pub fn min_step(&self) -> Option<Duration> {
        self.timestamps.windows(2).map(|w| w[1] - w[0]).min()
    }

    /// Values that are present, in order
    pub fn present_values(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    /// Number of points without a value
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Sales rows for one (store, section, indicator) combination: timestamp,
/// value and named business-feature columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SalesTable {
    start_time: Vec<NaiveDateTime>,
    value: Vec<Option<f64>>,
    features: BTreeMap<String, Vec<Option<f64>>>,
}

impl SalesTable {
    /// Create a table without business features
    pub fn new(start_time: Vec<NaiveDateTime>, value: Vec<Option<f64>>) -> Result<Self> {
        let series = TimeSeries::new(start_time, value)?;
        Ok(Self::from_series(&series))
    }

    /// Create a table from a value series
    pub fn from_series(series: &TimeSeries) -> Self {
        Self {
            start_time: series.timestamps().to_vec(),
            value: series.values().to_vec(),
            features: BTreeMap::new(),
        }
    }

    /// Add or replace a business-feature column
    pub fn with_feature(mut self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        if values.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Feature '{}' has {} rows, table has {}",
                name,
                values.len(),
                self.len()
            )));
        }
        self.features.insert(name.to_string(), values);
        Ok(self)
    }

    /// Rows with no value, every listed feature set from `features`
    /// (unlisted ones stay missing)
    pub fn placeholder(
        start_time: Vec<NaiveDateTime>,
        features: &BTreeMap<String, Option<f64>>,
    ) -> Result<Self> {
        check_increasing(&start_time)?;
        let n = start_time.len();
        Ok(Self {
            value: vec![None; n],
            features: features
                .iter()
                .map(|(name, value)| (name.clone(), vec![*value; n]))
                .collect(),
            start_time,
        })
    }

    pub fn len(&self) -> usize {
        self.start_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_time.is_empty()
    }

    pub fn start_time(&self) -> &[NaiveDateTime] {
        &self.start_time
    }

    pub fn value(&self) -> &[Option<f64>] {
        &self.value
    }

    /// A business-feature column by name
    pub fn feature(&self, name: &str) -> Option<&[Option<f64>]> {
        self.features.get(name).map(Vec::as_slice)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.keys().map(String::as_str).collect()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.start_time.last().copied()
    }

    /// Fail unless every named feature column is present
    pub fn require_features(&self, names: &[String]) -> Result<()> {
        match names.iter().find(|name| !self.features.contains_key(*name)) {
            Some(name) => Err(ForecastError::MissingColumn(name.clone())),
            None => Ok(()),
        }
    }

    /// The value column as a series
    pub fn value_series(&self) -> TimeSeries {
        TimeSeries {
            timestamps: self.start_time.clone(),
            values: self.value.clone(),
        }
    }

    /// Replace the value column
    pub fn with_values(mut self, value: Vec<Option<f64>>) -> Result<Self> {
        if value.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Values length ({}) doesn't match table length ({})",
                value.len(),
                self.len()
            )));
        }
        self.value = value;
        Ok(self)
    }

    /// Append `other` below this table.
    ///
    /// `other` must start after this table ends. Columns present on only one
    /// side are filled with missing values on the other.
    pub fn append(&mut self, other: &SalesTable) -> Result<()> {
        if let (Some(last), Some(first)) = (self.last_timestamp(), other.start_time.first()) {
            if *first <= last {
                return Err(ForecastError::DataError(format!(
                    "Cannot append rows starting at {} after {}",
                    first, last
                )));
            }
        }

        let own_len = self.len();
        for (name, column) in &other.features {
            self.features
                .entry(name.clone())
                .or_insert_with(|| vec![None; own_len])
                .extend_from_slice(column);
        }
        for (name, column) in self.features.iter_mut() {
            if !other.features.contains_key(name) {
                column.extend(std::iter::repeat(None).take(other.len()));
            }
        }

        self.start_time.extend_from_slice(&other.start_time);
        self.value.extend_from_slice(&other.value);
        Ok(())
    }

    /// A new table holding `self` followed by `other`
    pub fn concat(&self, other: &SalesTable) -> Result<SalesTable> {
        let mut combined = self.clone();
        combined.append(other)?;
        Ok(combined)
    }
}
