use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use sales_forecast::data::{group_tables, StoreDataset};
use sales_forecast::scenario::{run_scenario, ForecastStoreRequest, ScenarioInputs};
use sales_forecast::{ForecastConfig, ForecastError};
use std::fs::File;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const SECTIONS: [(&str, f64); 2] = [("bar", 0.0), ("kitchen", 100.0)];

fn monday() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn week_three() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

/// Week 3 sells 500 more than the identical weeks 1 and 2
fn sales(ts: NaiveDateTime, offset: f64) -> f64 {
    let base = 10.0 + ts.hour() as f64 + offset;
    if ts >= monday() + Duration::weeks(2) {
        base + 500.0
    } else {
        base
    }
}

/// Three weeks of hourly sales for two stores
fn create_dataset() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "store_id,section,indicator,start_time,value,promo,pollution").unwrap();

    for store in ["001", "002"] {
        for (section, offset) in SECTIONS {
            for i in 0..3 * 168 {
                let ts = monday() + Duration::hours(i);
                writeln!(
                    file,
                    "{},{},sales,{},{:.1},{},{}",
                    store,
                    section,
                    ts.format("%Y-%m-%d %H:%M:%S"),
                    sales(ts, offset),
                    (i / 24) % 2,
                    1
                )
                .unwrap();
            }
        }
    }

    file
}

fn config() -> ForecastConfig {
    let mut config = ForecastConfig::default();
    config.boosting.n_estimators = 20;
    config
}

fn inputs() -> ScenarioInputs {
    let request = ForecastStoreRequest::for_week("001", week_three()).unwrap();
    ScenarioInputs::new(request, true, 2).unwrap()
}

#[test]
fn test_load_csv_dataset() {
    let file = create_dataset();
    let dataset = StoreDataset::from_csv(file.path()).unwrap();

    assert_eq!(dataset.len(), 2 * 2 * 504);
    assert_eq!(dataset.stores().unwrap(), vec!["001", "002"]);

    let store = dataset.for_store("001").unwrap();
    assert_eq!(store.len(), 2 * 504);

    let features = vec!["promo".to_string(), "pollution".to_string()];
    let records = store.records(&features).unwrap();
    assert_eq!(records[0].store_id, "001");
    assert_eq!(records[0].start_time, monday());
    assert_eq!(records[0].features.get("pollution"), Some(&Some(1.0)));

    let groups = group_tables(&records, &features).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].section, "bar");
    assert_eq!(groups[1].section, "kitchen");
    assert_eq!(groups[1].table.len(), 504);
    assert_eq!(groups[1].table.value()[0], Some(110.0));
}

#[test]
fn test_load_parquet_dataset() {
    let millis: Vec<i64> = (0..3)
        .map(|h| (monday() + Duration::hours(h)).and_utc().timestamp_millis())
        .collect();
    let mut df = DataFrame::new(vec![
        Series::new("store_id", vec!["001"; 3]),
        Series::new("section", vec!["bar"; 3]),
        Series::new("indicator", vec!["sales"; 3]),
        Series::new("start_time", millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap(),
        Series::new("value", vec![Some(1.0), None, Some(3.0)]),
    ])
    .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.parquet");
    ParquetWriter::new(File::create(&path).unwrap())
        .finish(&mut df)
        .unwrap();

    let dataset = StoreDataset::from_path(&path).unwrap();
    let records = dataset.records(&["promo".to_string()]).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[1].start_time, monday() + Duration::hours(1));
    assert_eq!(records[1].value, None);
    assert_eq!(records[2].features.get("promo"), Some(&None));
}

#[test]
fn test_dataset_requires_columns() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "store_id,section,indicator,start_time").unwrap();
    writeln!(file, "001,bar,sales,2024-01-01 00:00:00").unwrap();

    assert!(matches!(
        StoreDataset::from_csv(file.path()),
        Err(ForecastError::MissingColumn(column)) if column == "value"
    ));
}

#[test]
fn test_scenario_forecasts_requested_week() {
    let file = create_dataset();
    let dataset = StoreDataset::from_csv(file.path()).unwrap();

    let result = run_scenario(&dataset, &inputs(), &config()).unwrap();

    assert_eq!(result.len(), 2 * 168);
    for row in result.rows() {
        assert!(row.start_time.date() >= week_three());
        assert!(row.forecast_gbm.is_some());

        // The seasonal mean only saw the two weeks before the cutoff
        let offset = if row.section == "kitchen" { 100.0 } else { 0.0 };
        let expected = 10.0 + row.start_time.hour() as f64 + offset;
        assert_eq!(row.forecast_sma, Some(expected));
        assert_eq!(row.value, Some(expected + 500.0));
        assert_eq!(row.features.get("pollution"), Some(&Some(1.0)));
    }
}

#[test]
fn test_scenario_metrics() {
    let file = create_dataset();
    let dataset = StoreDataset::from_csv(file.path()).unwrap();
    let result = run_scenario(&dataset, &inputs(), &config()).unwrap();

    let metrics = result.metrics();
    assert_eq!(metrics.len(), 2);
    for group in metrics {
        assert_eq!(group.indicator, "sales");
        assert_eq!(group.mse_sma, Some(250_000.0));
        assert!(group.mse_gbm.is_some());
    }
}

#[test]
fn test_scenario_dataframe_and_csv() {
    let file = create_dataset();
    let dataset = StoreDataset::from_csv(file.path()).unwrap();
    let result = run_scenario(&dataset, &inputs(), &config()).unwrap();

    let df = result.to_dataframe().unwrap();
    assert_eq!(
        df.get_column_names(),
        vec![
            "start_time",
            "section",
            "indicator",
            "value",
            "forecast_sma",
            "forecast_gbm",
            "promo",
            "pollution"
        ]
    );
    assert_eq!(df.height(), 336);

    let dir = tempdir().unwrap();
    let path = dir.path().join("scenario.csv");
    result.write_csv(&path).unwrap();

    let written = CsvReader::from_path(&path)
        .unwrap()
        .has_header(true)
        .finish()
        .unwrap();
    assert_eq!(written.height(), 336);
    assert_eq!(written.width(), 8);
}

#[test]
fn test_unknown_store() {
    let file = create_dataset();
    let dataset = StoreDataset::from_csv(file.path()).unwrap();
    let request = ForecastStoreRequest::for_week("999", week_three()).unwrap();
    let inputs = ScenarioInputs::new(request, false, 0).unwrap();

    assert!(matches!(
        run_scenario(&dataset, &inputs, &config()),
        Err(ForecastError::DataError(_))
    ));
}

#[test]
fn test_earlier_cutoff_hides_more_history() {
    let file = create_dataset();
    let dataset = StoreDataset::from_csv(file.path()).unwrap();
    let inputs = inputs().with_cutoff(monday() + Duration::weeks(1));

    let result = run_scenario(&dataset, &inputs, &config()).unwrap();
    assert_eq!(result.len(), 2 * 168);
    assert!(result.rows().iter().all(|row| row.forecast_sma.is_some()));
}
