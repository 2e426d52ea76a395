use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use meteo_features::{
    DateWindow, FeatureConfig, FeatureError, Field, InMemoryStore, Observation, SplitAssignment,
};
use meteo_forecast::{
    CvConfig, EnsembleStrategy, ForecastError, ForecastPipeline, ModelKind, PipelineConfig,
    PipelineReport,
};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::fs::File;

fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(offset)
}

/// Jan 1 to Mar 31 with `t2m_max` rising 0.1 per day
#[fixture]
fn store() -> InMemoryStore {
    let observations = (0..90)
        .flat_map(|d| {
            let value = 10.0 + 0.1 * d as f64;
            vec![
                Observation::filled("Chattanooga", date(d), 0.0).with(Field::T2mMax, value),
                Observation::filled("Knoxville", date(d), 0.0).with(Field::T2mMax, value - 2.0),
            ]
        })
        .collect();
    InMemoryStore::new(observations).unwrap()
}

#[fixture]
fn config() -> PipelineConfig {
    let features = FeatureConfig {
        target_locations: vec!["Chattanooga".to_string()],
        auxiliary_locations: vec!["Knoxville".to_string()],
        base_features: vec![Field::T2mMax],
        derived_features: vec![],
        lag_fields: vec![Field::T2mMax],
        lag_depths: vec![1],
        rolling_fields: vec![],
        climatology_fields: vec![],
        cross_location_fields: vec![Field::T2mMax],
        cross_location_lags: vec![1],
        target_field: Field::T2mMax,
        horizons: vec![1, 2],
        ..FeatureConfig::default()
    }
    .with_windows(
        DateWindow::new(date(0), date(58)).unwrap(),
        DateWindow::new(date(59), date(89)).unwrap(),
    );
    PipelineConfig::new(features)
}

#[rstest]
fn test_persistence_errors_are_exact(config: PipelineConfig, store: InMemoryStore) {
    let config = config.with_model(ModelKind::Persistence {
        column: "t2m_max".to_string(),
    });
    let pipeline = ForecastPipeline::new(config).unwrap();
    let (dataset, report) = pipeline.run(&store).unwrap();

    // Jan 2 .. Feb 28 train, Mar 1 .. Mar 29 test
    assert_eq!(dataset.split_report.train, 58);
    assert_eq!(dataset.split_report.test, 29);
    assert_eq!(report.model, "persistence(t2m_max)");

    for (h, step) in [(1u32, 0.1), (2, 0.2)] {
        let m = report.evaluation.horizon(h).unwrap();
        assert_eq!(m.n, 29);
        assert_eq!(m.aligned.len(), 29);
        assert_eq!(m.aligned[0].date, date(59));
        assert_eq!(m.aligned[0].location, "Chattanooga");
        assert_abs_diff_eq!(m.rmse, step, epsilon = 1e-9);
        assert_abs_diff_eq!(m.mae, step, epsilon = 1e-9);
        assert_abs_diff_eq!(m.bias, -step, epsilon = 1e-9);
    }
}

#[rstest]
#[case(EnsembleStrategy::Independent)]
#[case(EnsembleStrategy::Joint)]
#[case(EnsembleStrategy::Cascaded)]
fn test_ridge_tracks_the_trend(
    config: PipelineConfig,
    store: InMemoryStore,
    #[case] strategy: EnsembleStrategy,
) {
    let config = config
        .with_strategy(strategy)
        .with_model(ModelKind::Ridge { alpha: 1.0 });
    let pipeline = ForecastPipeline::new(config).unwrap();
    let (_, report) = pipeline.run(&store).unwrap();

    assert_eq!(report.strategy, strategy);
    assert_eq!(
        report.feature_names,
        vec!["t2m_max", "t2m_max_lag_1", "knoxville_t2m_max_lag_1"]
    );
    for m in &report.evaluation.horizons {
        assert!(m.rmse < 0.05, "{}", m);
    }
}

#[rstest]
fn test_evaluation_covers_test_rows_only(config: PipelineConfig, store: InMemoryStore) {
    let pipeline = ForecastPipeline::new(config).unwrap();
    let (dataset, report) = pipeline.run(&store).unwrap();

    let test_dates: Vec<NaiveDate> = dataset
        .table
        .rows(SplitAssignment::Test)
        .iter()
        .map(|&r| dataset.table.dates()[r])
        .collect();
    for m in &report.evaluation.horizons {
        let dates: Vec<NaiveDate> = m.aligned.iter().map(|p| p.date).collect();
        assert_eq!(dates, test_dates);
        assert!(m.aligned.iter().all(|p| p.date >= date(59)));
    }
}

#[rstest]
fn test_cross_validation_selects_ridge(config: PipelineConfig, store: InMemoryStore) {
    let config = config
        .with_candidates(vec![ModelKind::Mean, ModelKind::Ridge { alpha: 1.0 }])
        .with_cv(CvConfig {
            n_splits: 3,
            min_train_dates: 10,
            gap: None,
        });
    let pipeline = ForecastPipeline::new(config).unwrap();
    let (_, report) = pipeline.run(&store).unwrap();

    assert_eq!(report.model, "ridge(alpha=1)");
    assert_eq!(report.cv_scores.len(), 2);
    assert!(report.cv_scores[1].mean_rmse < report.cv_scores[0].mean_rmse);
    assert!(report.cv_scores.iter().all(|s| s.fold_rmse.len() == 3));
}

#[rstest]
fn test_climatology_needs_reference_window_for_candidates(config: PipelineConfig) {
    let mut config = config.with_candidates(vec![ModelKind::Mean]);
    config.features.climatology_fields = vec![Field::T2mMax];
    let err = ForecastPipeline::new(config).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::Feature(FeatureError::ConfigInvalid(_))
    ));
}

#[rstest]
fn test_climatology_reference_overlapping_folds_is_rejected(
    config: PipelineConfig,
    store: InMemoryStore,
) {
    let mut config = config
        .with_candidates(vec![ModelKind::Mean, ModelKind::Ridge { alpha: 1.0 }])
        .with_cv(CvConfig {
            n_splits: 3,
            min_train_dates: 10,
            gap: None,
        });
    config.features.climatology_fields = vec![Field::T2mMax];
    config.features.reference_window = Some(DateWindow::new(date(0), date(58)).unwrap());

    let pipeline = ForecastPipeline::new(config).unwrap();
    let err = pipeline.run(&store).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::Feature(FeatureError::ConfigInvalid(_))
    ));
}

#[rstest]
fn test_custom_factory(config: PipelineConfig, store: InMemoryStore) {
    let pipeline = ForecastPipeline::new(config).unwrap();
    let dataset = pipeline.build(&store).unwrap();
    let report = pipeline
        .train_and_evaluate_with(&dataset, ModelKind::Mean.factory())
        .unwrap();
    assert_eq!(report.model, "mean");
    assert!(report.cv_scores.is_empty());
}

#[rstest]
fn test_report_json_round_trip(config: PipelineConfig, store: InMemoryStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let pipeline = ForecastPipeline::new(config).unwrap();
    let (_, report) = pipeline.run(&store).unwrap();
    report.to_json_file(&path).unwrap();

    let back: PipelineReport = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
    assert_eq!(back.model, report.model);
    assert_eq!(back.drop_report, report.drop_report);
    assert_eq!(back.split_report, report.split_report);
    assert_eq!(back.evaluation.horizons.len(), 2);
    assert_abs_diff_eq!(
        back.evaluation.horizons[0].rmse,
        report.evaluation.horizons[0].rmse,
        epsilon = 1e-12
    );
}

#[rstest]
fn test_unknown_persistence_column_is_config_error(config: PipelineConfig) {
    let config = config.with_model(ModelKind::Persistence {
        column: "rh2m".to_string(),
    });
    let err = ForecastPipeline::new(config).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::Feature(FeatureError::ConfigInvalid(_))
    ));
}

#[rstest]
fn test_invalid_window_fails_before_reading(config: PipelineConfig) {
    let mut config = config;
    config.features.test_window = DateWindow {
        start: date(30),
        end: date(89),
    };
    let err = ForecastPipeline::new(config).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::Feature(FeatureError::ConfigInvalid(_))
    ));
}
