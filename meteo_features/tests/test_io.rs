use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use meteo_features::{
    CsvStore, DateWindow, FeatureArtifact, FeatureBuilder, FeatureConfig, FeatureTable, Field,
    ObservationStore, ParquetStore,
};
use polars::prelude::{CsvReader, ParquetWriter, SerReader};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::fmt::Write as _;
use tempfile::TempDir;

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
}

fn config() -> FeatureConfig {
    FeatureConfig {
        target_locations: vec!["Chattanooga".to_string()],
        auxiliary_locations: vec!["Knoxville".to_string()],
        base_features: vec![Field::T2mMax],
        derived_features: vec![],
        lag_fields: vec![Field::T2mMax],
        lag_depths: vec![1, 2],
        rolling_fields: vec![Field::T2mMax],
        rolling_windows: vec![3],
        climatology_fields: vec![],
        cross_location_fields: vec![Field::T2mMax],
        cross_location_lags: vec![1],
        sentinel_fields: vec![Field::T2mMax],
        horizons: vec![1, 2],
        ..FeatureConfig::default()
    }
    .with_windows(
        DateWindow::new(jan(1), jan(15)).unwrap(),
        DateWindow::new(jan(16), jan(25)).unwrap(),
    )
}

/// Observation table in the ingestion layout, with coordinates and one sentinel cell
fn observations_csv() -> String {
    let mut csv = String::from("date,location,lat,lon,t2m_max\n");
    for d in 1..=25 {
        for (location, base) in [("Chattanooga", 10.0), ("Knoxville", 5.0), ("Memphis", 0.0)] {
            let value = if location == "Chattanooga" && d == 12 {
                -999.0
            } else {
                base + d as f64 * 0.5
            };
            writeln!(csv, "2023-01-{:02},{},35.0,-85.3,{}", d, location, value).unwrap();
        }
    }
    csv
}

#[fixture]
fn workdir() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[fixture]
fn table(workdir: TempDir) -> (TempDir, FeatureTable) {
    let path = workdir.path().join("observations.csv");
    std::fs::write(&path, observations_csv()).unwrap();
    let store = CsvStore::open(&path).unwrap();
    let dataset = FeatureBuilder::new(config()).unwrap().build(&store).unwrap();
    (workdir, dataset.table)
}

#[rstest]
fn test_csv_store_query(workdir: TempDir) {
    let path = workdir.path().join("observations.csv");
    std::fs::write(&path, observations_csv()).unwrap();
    let store = CsvStore::open(&path).unwrap();

    let window = DateWindow::new(jan(3), jan(4)).unwrap();
    let rows = store
        .query(&["Knoxville".to_string(), "Chattanooga".to_string()], &window)
        .unwrap();
    let keys: Vec<(NaiveDate, &str)> = rows.iter().map(|o| (o.date, o.location.as_str())).collect();
    assert_eq!(
        keys,
        vec![
            (jan(3), "Chattanooga"),
            (jan(3), "Knoxville"),
            (jan(4), "Chattanooga"),
            (jan(4), "Knoxville"),
        ]
    );
    assert_eq!(rows[1].get(Field::T2mMax), 6.5);
    assert!(rows[0].get(Field::T2m).is_nan());
}

#[rstest]
fn test_built_table_from_store(table: (TempDir, FeatureTable)) {
    let (_dir, table) = table;
    // day 12 is a sentinel row: 10 and 11 lose a target, 13 and 14 a lag
    for missing in [1, 2, 10, 11, 12, 13, 14, 24, 25] {
        assert!(!table.dates().contains(&jan(missing)), "day {}", missing);
    }
    assert_eq!(table.len(), 16);
    assert!(table.locations().iter().all(|l| l == "Chattanooga"));
    assert!(table.column("knoxville_t2m_max_lag_1").is_some());
}

#[rstest]
fn test_parquet_artifact_round_trip(table: (TempDir, FeatureTable)) {
    let (dir, table) = table;
    let path = dir.path().join("features.parquet");
    FeatureArtifact::write_parquet(&table, &path).unwrap();
    let reloaded = FeatureArtifact::read_parquet(&path).unwrap();

    assert_eq!(reloaded.len(), table.len());
    assert_eq!(reloaded.feature_names(), table.feature_names());
    assert_eq!(reloaded.target_names(), table.target_names());
    assert_eq!(reloaded, table);
}

#[rstest]
fn test_csv_artifact_round_trip(table: (TempDir, FeatureTable)) {
    let (dir, table) = table;
    let path = dir.path().join("features.csv");
    FeatureArtifact::write_csv(&table, &path).unwrap();
    let reloaded = FeatureArtifact::read_csv(&path).unwrap();

    assert_eq!(reloaded.len(), table.len());
    assert_eq!(reloaded.dates(), table.dates());
    assert_eq!(reloaded.splits(), table.splits());
    assert_eq!(reloaded.feature_names(), table.feature_names());
    for (a, b) in reloaded.columns().iter().zip(table.columns()) {
        for (x, y) in a.iter().zip(b) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-9);
        }
    }
}

#[rstest]
fn test_parquet_store_matches_csv_store(table: (TempDir, FeatureTable)) {
    let (dir, table) = table;
    let csv_path = dir.path().join("observations.csv");
    let parquet_path = dir.path().join("observations.parquet");

    let mut df = CsvReader::new(std::fs::File::open(&csv_path).unwrap())
        .has_header(true)
        .finish()
        .unwrap();
    let mut file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .unwrap();

    let store = ParquetStore::open(&parquet_path).unwrap();
    let rebuilt = FeatureBuilder::new(config()).unwrap().build(&store).unwrap();
    assert_eq!(rebuilt.table, table);
}
