//! Store to evaluation in one run
//!
//! [`ForecastPipeline`] validates a [`PipelineConfig`], builds the feature
//! table from an observation store, optionally picks a model by
//! forward-chaining cross-validation on the training partition, fits the
//! ensemble on the training rows and scores it on the test rows.

use crate::config::PipelineConfig;
use crate::cv::{select_candidate, CvScore};
use crate::ensemble::{EnsembleStrategy, ForecastEnsemble};
use crate::error::{ForecastError, Result};
use crate::evaluate::{EvaluationReport, Evaluator};
use crate::matrix::{ModelInput, TargetMatrix};
use crate::models::{ModelKind, RegressorFactory};
use chrono::NaiveDate;
use meteo_features::{
    DropReport, ExpandingWindowCv, FeatureBuilder, FeatureDataset, FeatureError,
    ObservationStore, SplitAssignment, SplitReport,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Everything a run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub strategy: EnsembleStrategy,
    /// Model that produced the test predictions
    pub model: String,
    /// Feature columns the ensemble was fitted on
    pub feature_names: Vec<String>,
    /// Rows excluded during feature construction
    pub drop_report: DropReport,
    pub split_report: SplitReport,
    /// Cross-validation scores, empty when no candidates were configured
    pub cv_scores: Vec<CvScore>,
    pub evaluation: EvaluationReport,
}

impl PipelineReport {
    /// Write the report as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Configured end-to-end run
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
    builder: FeatureBuilder,
}

impl ForecastPipeline {
    /// Validate the configuration; nothing is read yet
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let builder = FeatureBuilder::new(config.features.clone())?;

        let features = builder.schema().feature_names();
        for kind in std::iter::once(&config.model).chain(config.candidates.iter()) {
            if let ModelKind::Persistence { column } = kind {
                if !features.contains(column) {
                    return Err(FeatureError::ConfigInvalid(format!(
                        "persistence column '{}' is not a feature column",
                        column
                    ))
                    .into());
                }
            }
        }
        Ok(Self { config, builder })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the feature table from `store`
    pub fn build(&self, store: &dyn ObservationStore) -> Result<FeatureDataset> {
        Ok(self.builder.build(store)?)
    }

    /// Fit the configured model, or the best cross-validated candidate, and score it
    pub fn train_and_evaluate(&self, dataset: &FeatureDataset) -> Result<PipelineReport> {
        let (input, targets) = self.training_matrices(dataset)?;

        let (kind, cv_scores) = if self.config.candidates.is_empty() {
            (self.config.model.clone(), Vec::new())
        } else {
            let train_rows = dataset.table.rows(SplitAssignment::Train);
            let dates: Vec<_> = train_rows.iter().map(|&r| dataset.table.dates()[r]).collect();
            let max_horizon = targets.horizons().iter().copied().max().unwrap_or(0);
            let cv = self.config.cv.splitter(max_horizon)?;
            self.check_reference_precedes_folds(&cv, &dates)?;
            let (best, scores) = select_candidate(
                self.config.strategy,
                &self.config.candidates,
                &input,
                &targets,
                &dates,
                &cv,
            )?;
            info!("Selected {} by cross-validation", best);
            (best, scores)
        };

        let ensemble = ForecastEnsemble::from_kind(self.config.strategy, &kind)?;
        let mut report = self.fit_and_score(dataset, ensemble, &input, &targets, kind.to_string())?;
        report.cv_scores = cv_scores;
        Ok(report)
    }

    /// Fit and score an ensemble of caller-supplied regressors, without cross-validation
    pub fn train_and_evaluate_with(
        &self,
        dataset: &FeatureDataset,
        factory: RegressorFactory,
    ) -> Result<PipelineReport> {
        let (input, targets) = self.training_matrices(dataset)?;
        let model = factory().name().to_string();
        let ensemble = ForecastEnsemble::new(self.config.strategy, factory);
        self.fit_and_score(dataset, ensemble, &input, &targets, model)
    }

    /// Build from `store`, then train and evaluate
    pub fn run(&self, store: &dyn ObservationStore) -> Result<(FeatureDataset, PipelineReport)> {
        let dataset = self.build(store)?;
        let report = self.train_and_evaluate(&dataset)?;
        Ok((dataset, report))
    }

    /// Climatology fitted over a validation block would leak it into that fold's training rows
    fn check_reference_precedes_folds(
        &self,
        cv: &ExpandingWindowCv,
        dates: &[NaiveDate],
    ) -> Result<()> {
        if self.config.features.climatology_fields.is_empty() {
            return Ok(());
        }
        let reference = self.config.features.reference_window();
        let first_validation = cv
            .folds(dates)?
            .iter()
            .flat_map(|fold| fold.validation.iter())
            .map(|&i| dates[i])
            .min();
        match first_validation {
            Some(first) if reference.end >= first => Err(FeatureError::ConfigInvalid(format!(
                "reference window {} overlaps cross-validation starting {}",
                reference, first
            ))
            .into()),
            _ => Ok(()),
        }
    }

    fn training_matrices(&self, dataset: &FeatureDataset) -> Result<(ModelInput, TargetMatrix)> {
        let train_rows = dataset.table.rows(SplitAssignment::Train);
        if train_rows.is_empty() {
            return Err(ForecastError::DataError(
                "Training partition has no trainable rows".to_string(),
            ));
        }
        let input = ModelInput::from_table(&dataset.table, &train_rows)?;
        input.check_schema(&dataset.schema.feature_names())?;
        let targets = TargetMatrix::from_table(&dataset.table, &train_rows)?;
        Ok((input, targets))
    }

    fn fit_and_score(
        &self,
        dataset: &FeatureDataset,
        ensemble: ForecastEnsemble,
        input: &ModelInput,
        targets: &TargetMatrix,
        model: String,
    ) -> Result<PipelineReport> {
        let test_rows = dataset.table.rows(SplitAssignment::Test);
        if test_rows.is_empty() {
            return Err(ForecastError::DataError(
                "Test partition has no trainable rows".to_string(),
            ));
        }

        let mut ensemble = ensemble.with_expected_features(dataset.schema.feature_names());
        ensemble.fit(input, targets)?;
        let test_input = ModelInput::from_table(&dataset.table, &test_rows)?;
        let predictions = ensemble.predict(&test_input)?;
        let evaluation = Evaluator::evaluate(&dataset.table, &test_rows, &predictions)?;

        info!(
            "Evaluated {} ensemble on {} test rows",
            self.config.strategy,
            test_rows.len()
        );
        Ok(PipelineReport {
            strategy: self.config.strategy,
            model,
            feature_names: ensemble.feature_names().to_vec(),
            drop_report: dataset.drop_report.clone(),
            split_report: dataset.split_report,
            cv_scores: Vec::new(),
            evaluation,
        })
    }
}
