//! End-to-end feature construction
//!
//! Stages run strictly in data-flow order: clean, derive, temporal,
//! cross-location, targets, location encoding, then split. Each stage only
//! reads what earlier stages produced.

use crate::clean::SentinelCleaner;
use crate::config::{DateWindow, FeatureConfig};
use crate::cross_location::CrossLocationGenerator;
use crate::derived::DerivedFeatureCalculator;
use crate::encoding::encode_locations;
use crate::error::Result;
use crate::frame::{DropReason, DropReport, FeatureFrame};
use crate::observation::Observation;
use crate::schema::{FeatureSchema, FeatureSpec, SchemaBuilder};
use crate::shift::shift_date;
use crate::split::{SplitReport, Splitter};
use crate::store::ObservationStore;
use crate::table::FeatureTable;
use crate::targets::HorizonTargetBuilder;
use crate::temporal::TemporalFeatureGenerator;
use tracing::{debug, info, warn};

/// Fraction of dropped rows above which a warning is logged
const DROP_WARN_FRACTION: f64 = 0.5;

/// Output of a feature build
#[derive(Debug, Clone)]
pub struct FeatureDataset {
    /// Trainable rows with their split
    pub table: FeatureTable,
    /// Declared columns
    pub schema: FeatureSchema,
    /// Rows excluded during construction, by reason
    pub drop_report: DropReport,
    /// Row counts per partition
    pub split_report: SplitReport,
}

/// Runs every feature stage for one configuration
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    config: FeatureConfig,
    schema: FeatureSchema,
}

impl FeatureBuilder {
    /// Validate the configuration and declare its schema
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        let schema = SchemaBuilder::from_config(&config).build()?;
        debug!("Declared {} columns", schema.column_names().len());
        Ok(Self { config, schema })
    }

    /// The validated configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// The declared schema
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Date range to load: every window plus the furthest lookback and lookahead
    pub fn query_window(&self) -> DateWindow {
        let config = &self.config;
        let reference = config.reference_window();
        let lookback = self
            .schema
            .features()
            .iter()
            .filter_map(|spec| match spec {
                FeatureSpec::Lag { lag, .. } | FeatureSpec::CrossLocation { lag, .. } => Some(*lag),
                FeatureSpec::Rolling { window, .. } => Some(window.saturating_sub(1)),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let lookahead = self.schema.horizons().into_iter().max().unwrap_or(0);

        let start = config.train_window.start.min(reference.start);
        let end = config.test_window.end.max(reference.end);
        DateWindow {
            start: shift_date(start, -(lookback as i64)).unwrap_or(start),
            end: shift_date(end, lookahead as i64).unwrap_or(end),
        }
    }

    /// Load target and auxiliary rows from a store and build
    pub fn build(&self, store: &dyn ObservationStore) -> Result<FeatureDataset> {
        let locations: Vec<String> = self
            .config
            .target_locations
            .iter()
            .chain(self.config.auxiliary_locations.iter())
            .cloned()
            .collect();
        let window = self.query_window();
        let observations = store.query(&locations, &window)?;
        info!(
            "Queried {} observations for {} locations in {}",
            observations.len(),
            locations.len(),
            window
        );
        self.build_from_observations(observations)
    }

    /// Build from observations already loaded
    pub fn build_from_observations(&self, observations: Vec<Observation>) -> Result<FeatureDataset> {
        let (frame, drop_report) = self.build_frame(observations)?;

        let mut splitter = Splitter::new(self.config.train_window, self.config.test_window);
        if self.config.purge_overlap {
            if let Some(&furthest) = self.schema.horizons().iter().max() {
                splitter = splitter.with_purge(furthest);
            }
        }
        let (table, split_report) = splitter.apply(&frame, &self.schema)?;

        Ok(FeatureDataset {
            table,
            schema: self.schema.clone(),
            drop_report,
            split_report,
        })
    }

    /// Run every construction stage and drop incomplete rows
    pub fn build_frame(&self, observations: Vec<Observation>) -> Result<(FeatureFrame, DropReport)> {
        let config = &self.config;
        let cleaner = SentinelCleaner::new(config.sentinel, config.sentinel_fields());
        let cleaned = cleaner.clean(observations);
        debug!("{} sentinel rows blanked", cleaned.blanked);

        let (targets, auxiliary): (Vec<Observation>, Vec<Observation>) = cleaned
            .observations
            .into_iter()
            .filter(|o| {
                config.target_locations.contains(&o.location)
                    || config.auxiliary_locations.contains(&o.location)
            })
            .partition(|o| config.target_locations.contains(&o.location));
        for location in &config.target_locations {
            if !targets
                .iter()
                .any(|o| &o.location == location && !o.is_blank())
            {
                warn!("Target location '{}' has no usable observations", location);
            }
        }

        // blanked rows stay until the final drop so row shifts see the gap
        let mut frame = FeatureFrame::new(targets)?;
        frame.mark_blank_rows(DropReason::MissingData);
        let total = frame.len();
        let features = self.schema.features();

        for spec in features {
            if let FeatureSpec::Base { field } = spec {
                let values = frame.field_values(*field).into_iter().map(Some).collect();
                frame.push_column(spec.column_name(), values, DropReason::MissingData)?;
            }
        }
        DerivedFeatureCalculator::new(config.day_of_year_mode, config.seasonal_period)
            .apply(&mut frame, features)?;
        TemporalFeatureGenerator::new(
            config.shift_mode,
            config.rolling_min_periods as usize,
            config.reference_window(),
            config.day_of_year_mode,
        )
        .apply(&mut frame, features)?;
        CrossLocationGenerator::new(auxiliary).apply(&mut frame, features)?;
        HorizonTargetBuilder::new(config.shift_mode).apply(&mut frame, self.schema.targets())?;
        encode_locations(&mut frame, features)?;

        self.schema.validate_frame(&frame)?;
        let report = frame.drop_incomplete();

        info!("{}", report);
        if total > 0 && report.total() as f64 / total as f64 > DROP_WARN_FRACTION {
            warn!(
                "{} of {} target rows were dropped during feature construction",
                report.total(),
                total
            );
        }
        Ok((frame, report))
    }
}
