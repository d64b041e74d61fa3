//! Store dataset access
//!
//! The dataset is a long table with one row per (store, section, indicator,
//! timestamp). It can be read from CSV or Parquet.

use crate::error::{ForecastError, Result};
use crate::series::SalesTable;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const STORE_ID: &str = "store_id";
pub const SECTION: &str = "section";
pub const INDICATOR: &str = "indicator";
pub const START_TIME: &str = "start_time";
pub const VALUE: &str = "value";

/// Columns every dataset must carry
pub const REQUIRED_COLUMNS: [&str; 5] = [STORE_ID, SECTION, INDICATOR, START_TIME, VALUE];

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// One row of the store dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub store_id: String,
    pub section: String,
    pub indicator: String,
    pub start_time: NaiveDateTime,
    pub value: Option<f64>,
    pub features: BTreeMap<String, Option<f64>>,
}

/// Rows of one (section, indicator) pair as a sales table
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTable {
    pub section: String,
    pub indicator: String,
    pub table: SalesTable,
}

/// Sales dataset backed by a polars DataFrame
#[derive(Debug, Clone)]
pub struct StoreDataset {
    df: DataFrame,
}

impl StoreDataset {
    /// Load a CSV file. Identifier and time columns are read as text so
    /// store ids like "001" keep their leading zeros.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;

        let mut schema = Schema::new();
        for name in [STORE_ID, SECTION, INDICATOR, START_TIME] {
            schema.with_column(name.into(), DataType::Utf8);
        }

        let df = CsvReader::new(file)
            .infer_schema(Some(100))
            .has_header(true)
            .with_dtypes(Some(Arc::new(schema)))
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Load a Parquet file
    pub fn from_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let df = ParquetReader::new(file).finish()?;
        Self::from_dataframe(df)
    }

    /// Load by file extension: `.parquet`/`.pq` or CSV otherwise
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") | Some("pq") => Self::from_parquet(path),
            _ => Self::from_csv(path),
        }
    }

    /// Wrap an existing DataFrame, checking the required columns
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let names = df.get_column_names();
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !names.contains(*c)) {
            return Err(ForecastError::MissingColumn(missing.to_string()));
        }
        debug!(rows = df.height(), columns = ?names, "loaded store dataset");
        Ok(Self { df })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Distinct store ids, sorted
    pub fn stores(&self) -> Result<Vec<String>> {
        let mut stores = column_as_strings(&self.df, STORE_ID)?;
        stores.sort();
        stores.dedup();
        Ok(stores)
    }

    /// Rows of one store
    pub fn for_store(&self, store_id: &str) -> Result<Self> {
        let flags: Vec<bool> = column_as_strings(&self.df, STORE_ID)?
            .iter()
            .map(|id| id == store_id)
            .collect();
        let mask = BooleanChunked::from_slice("mask", &flags);
        Ok(Self {
            df: self.df.filter(&mask)?,
        })
    }

    /// Parse every row, reading the listed business-feature columns.
    /// A business column absent from the dataset yields missing values.
    pub fn records(&self, business_features: &[String]) -> Result<Vec<SalesRecord>> {
        let stores = column_as_strings(&self.df, STORE_ID)?;
        let sections = column_as_strings(&self.df, SECTION)?;
        let indicators = column_as_strings(&self.df, INDICATOR)?;
        let times = column_as_datetimes(&self.df, START_TIME)?;
        let values = column_as_f64(&self.df, VALUE)?;

        let mut feature_columns = Vec::with_capacity(business_features.len());
        for name in business_features {
            let column = if self.df.get_column_names().contains(&name.as_str()) {
                column_as_f64(&self.df, name)?
            } else {
                vec![None; self.df.height()]
            };
            feature_columns.push((name.clone(), column));
        }

        let records = (0..self.df.height())
            .map(|i| SalesRecord {
                store_id: stores[i].clone(),
                section: sections[i].clone(),
                indicator: indicators[i].clone(),
                start_time: times[i],
                value: values[i],
                features: feature_columns
                    .iter()
                    .map(|(name, column)| (name.clone(), column[i]))
                    .collect(),
            })
            .collect();

        Ok(records)
    }
}

/// Split records into one time-ordered table per (section, indicator),
/// groups sorted by section then indicator
pub fn group_tables(records: &[SalesRecord], business_features: &[String]) -> Result<Vec<GroupTable>> {
    let mut groups: BTreeMap<(String, String), Vec<&SalesRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.section.clone(), record.indicator.clone()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((section, indicator), mut rows)| {
            rows.sort_by_key(|r| r.start_time);

            let mut table = SalesTable::new(
                rows.iter().map(|r| r.start_time).collect(),
                rows.iter().map(|r| r.value).collect(),
            )
            .map_err(|e| {
                ForecastError::DataError(format!("group {}/{}: {}", section, indicator, e))
            })?;

            for name in business_features {
                let column = rows
                    .iter()
                    .map(|r| r.features.get(name).copied().flatten())
                    .collect();
                table = table.with_feature(name, column)?;
            }

            Ok(GroupTable {
                section,
                indicator,
                table,
            })
        })
        .collect()
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| ForecastError::MissingColumn(name.to_string()))
}

fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let casted = column(df, name)?.cast(&DataType::Utf8)?;
    casted
        .utf8()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string)
                .ok_or_else(|| ForecastError::DataError(format!("Null in column '{}'", name)))
        })
        .collect()
}

fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let casted = column(df, name)?.cast(&DataType::Float64)?;
    let values = casted.f64()?.into_iter().collect();
    Ok(values)
}

fn from_epoch_millis(ms: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| ForecastError::ParseError(format!("Timestamp out of range: {}", ms)))
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }
    Err(ForecastError::ParseError(format!(
        "Unrecognised timestamp '{}'",
        text
    )))
}

/// Timestamps from a datetime, date, epoch-millisecond or text column
fn column_as_datetimes(df: &DataFrame, name: &str) -> Result<Vec<NaiveDateTime>> {
    let col = column(df, name)?;
    let null = || ForecastError::DataError(format!("Null in column '{}'", name));

    match col.dtype() {
        DataType::Datetime(unit, _) => {
            let divisor = match unit {
                TimeUnit::Nanoseconds => 1_000_000,
                TimeUnit::Microseconds => 1_000,
                TimeUnit::Milliseconds => 1,
            };
            let raw = col.cast(&DataType::Int64)?;
            let ticks = raw.i64()?;
            ticks
                .into_iter()
                .map(|v| v.ok_or_else(null).and_then(|v| from_epoch_millis(v.div_euclid(divisor))))
                .collect()
        }
        DataType::Date => {
            let raw = col.cast(&DataType::Int32)?;
            let days = raw.i32()?;
            days.into_iter()
                .map(|v| {
                    v.ok_or_else(null)
                        .and_then(|d| from_epoch_millis(d as i64 * 86_400_000))
                })
                .collect()
        }
        DataType::Int64 => col
            .i64()?
            .into_iter()
            .map(|v| v.ok_or_else(null).and_then(from_epoch_millis))
            .collect(),
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .map(|v| v.ok_or_else(null).and_then(parse_timestamp))
            .collect(),
        other => Err(ForecastError::DataError(format!(
            "Column '{}' of type {:?} cannot be read as timestamps",
            name, other
        ))),
    }
}
