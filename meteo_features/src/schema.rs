//! Declared feature and target columns
//!
//! The complete column set is derived from the configuration before any
//! computation runs. Stages compute exactly the specs they are handed and
//! the finished frame is checked against the schema.

use crate::config::{DerivedFeature, FeatureConfig};
use crate::error::{FeatureError, Result};
use crate::frame::FeatureFrame;
use crate::observation::Field;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lowercase a location name and replace anything non-alphanumeric with `_`
pub fn slug(location: &str) -> String {
    location
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// One component of a derived quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedComponent {
    /// Single-valued quantity
    Value,
    /// Zonal wind or seasonal sine
    First,
    /// Meridional wind or seasonal cosine
    Second,
}

/// A declared feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSpec {
    /// Raw same-day field
    Base { field: Field },
    /// Same-day derived quantity
    Derived {
        feature: DerivedFeature,
        component: DerivedComponent,
    },
    /// Field value `lag` days (or rows) earlier at the same location
    Lag { field: Field, lag: u32 },
    /// Trailing mean over `window` days (or rows) at the same location
    Rolling { field: Field, window: u32 },
    /// Reference-period mean at the same `(location, day_of_year)`
    Climatology { field: Field },
    /// Field value `lag` days earlier at an auxiliary location
    CrossLocation {
        location: String,
        field: Field,
        lag: u32,
    },
    /// 0/1 indicator for a target location
    LocationIndicator { location: String },
}

impl FeatureSpec {
    /// Column name of this feature
    pub fn column_name(&self) -> String {
        match self {
            FeatureSpec::Base { field } => field.name().to_string(),
            FeatureSpec::Derived { feature, component } => match (feature, component) {
                (DerivedFeature::Ratio { numerator, denominator }, _) => {
                    format!("{}_over_{}", numerator, denominator)
                }
                (DerivedFeature::Difference { minuend, subtrahend }, _) => {
                    format!("{}_minus_{}", minuend, subtrahend)
                }
                (DerivedFeature::Average { a, b }, _) => format!("{}_{}_mean", a, b),
                (DerivedFeature::WindComponents { speed, .. }, DerivedComponent::Second) => {
                    format!("{}_v", speed)
                }
                (DerivedFeature::WindComponents { speed, .. }, _) => format!("{}_u", speed),
                (DerivedFeature::SeasonalEncoding, DerivedComponent::Second) => {
                    "doy_cos".to_string()
                }
                (DerivedFeature::SeasonalEncoding, _) => "doy_sin".to_string(),
            },
            FeatureSpec::Lag { field, lag } => format!("{}_lag_{}", field, lag),
            FeatureSpec::Rolling { field, window } => format!("{}_roll_mean_{}", field, window),
            FeatureSpec::Climatology { field } => format!("{}_clim", field),
            FeatureSpec::CrossLocation {
                location,
                field,
                lag,
            } => format!("{}_{}_lag_{}", slug(location), field, lag),
            FeatureSpec::LocationIndicator { location } => format!("loc_{}", slug(location)),
        }
    }
}

/// A declared horizon target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Forecast field
    pub field: Field,
    /// Days ahead of the row's date
    pub horizon: u32,
}

impl TargetSpec {
    /// Column name of this target
    pub fn column_name(&self) -> String {
        target_column_name(self.horizon)
    }
}

/// Column name of the target for a horizon
pub fn target_column_name(horizon: u32) -> String {
    format!("target_h{}", horizon)
}

/// Parse a horizon back out of a target column name
pub fn parse_target_column(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("target_h")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Ordered feature and target declarations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
    targets: Vec<TargetSpec>,
}

impl FeatureSchema {
    /// Declared features in column order
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    /// Declared targets in increasing horizon order
    pub fn targets(&self) -> &[TargetSpec] {
        &self.targets
    }

    /// Feature column names in order
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(FeatureSpec::column_name).collect()
    }

    /// Target column names in order
    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(TargetSpec::column_name).collect()
    }

    /// Horizons in order
    pub fn horizons(&self) -> Vec<u32> {
        self.targets.iter().map(|t| t.horizon).collect()
    }

    /// Feature then target column names
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.feature_names();
        names.extend(self.target_names());
        names
    }

    /// Check that a frame carries exactly the declared columns.
    ///
    /// Stages run in data-flow order, not declaration order, so only the
    /// column sets are compared here.
    pub fn validate_frame(&self, frame: &FeatureFrame) -> Result<()> {
        let mut expected = self.column_names();
        expected.sort();
        let mut actual: Vec<String> = frame.column_names().iter().map(|s| s.to_string()).collect();
        actual.sort();
        check_columns(&expected, &actual)
    }
}

/// Compare two ordered column lists and describe any difference
pub fn check_columns(expected: &[String], actual: &[String]) -> Result<()> {
    if expected == actual {
        return Ok(());
    }

    let expected_set: HashSet<&String> = expected.iter().collect();
    let actual_set: HashSet<&String> = actual.iter().collect();
    let missing: Vec<&str> = expected
        .iter()
        .filter(|c| !actual_set.contains(c))
        .map(String::as_str)
        .collect();
    let unexpected: Vec<&str> = actual
        .iter()
        .filter(|c| !expected_set.contains(c))
        .map(String::as_str)
        .collect();

    let detail = if missing.is_empty() && unexpected.is_empty() {
        "same columns in a different order".to_string()
    } else {
        format!(
            "missing [{}], unexpected [{}]",
            missing.join(", "),
            unexpected.join(", ")
        )
    };
    Err(FeatureError::SchemaMismatch(format!(
        "expected {} columns, got {}: {}",
        expected.len(),
        actual.len(),
        detail
    )))
}

/// Accumulates declarations from a configuration
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    features: Vec<FeatureSpec>,
    targets: Vec<TargetSpec>,
}

impl SchemaBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a feature
    pub fn feature(mut self, spec: FeatureSpec) -> Self {
        self.features.push(spec);
        self
    }

    /// Declare a target
    pub fn target(mut self, spec: TargetSpec) -> Self {
        self.targets.push(spec);
        self
    }

    /// Declare every column a configuration produces
    pub fn from_config(config: &FeatureConfig) -> Self {
        let mut builder = Self::new();

        for &field in &config.base_features {
            builder = builder.feature(FeatureSpec::Base { field });
        }
        for &feature in &config.derived_features {
            let components: &[DerivedComponent] = match feature {
                DerivedFeature::WindComponents { .. } | DerivedFeature::SeasonalEncoding => {
                    &[DerivedComponent::First, DerivedComponent::Second]
                }
                _ => &[DerivedComponent::Value],
            };
            for &component in components {
                builder = builder.feature(FeatureSpec::Derived { feature, component });
            }
        }
        for &field in &config.lag_fields {
            for &lag in &config.lag_depths {
                builder = builder.feature(FeatureSpec::Lag { field, lag });
            }
        }
        for &field in &config.rolling_fields {
            for &window in &config.rolling_windows {
                builder = builder.feature(FeatureSpec::Rolling { field, window });
            }
        }
        for &field in &config.climatology_fields {
            builder = builder.feature(FeatureSpec::Climatology { field });
        }
        for location in &config.auxiliary_locations {
            for &field in &config.cross_location_fields {
                for &lag in &config.cross_location_lags {
                    builder = builder.feature(FeatureSpec::CrossLocation {
                        location: location.clone(),
                        field,
                        lag,
                    });
                }
            }
        }
        if config.encode_locations && config.target_locations.len() > 1 {
            for location in &config.target_locations {
                builder = builder.feature(FeatureSpec::LocationIndicator {
                    location: location.clone(),
                });
            }
        }
        for horizon in config.sorted_horizons() {
            builder = builder.target(TargetSpec {
                field: config.target_field,
                horizon,
            });
        }
        builder
    }

    /// Finish, rejecting duplicate column names
    pub fn build(self) -> Result<FeatureSchema> {
        let schema = FeatureSchema {
            features: self.features,
            targets: self.targets,
        };
        let mut seen = HashSet::new();
        for name in schema.column_names() {
            if !seen.insert(name.clone()) {
                return Err(FeatureError::ConfigInvalid(format!(
                    "column '{}' would be produced twice",
                    name
                )));
            }
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_names() {
        let config = FeatureConfig {
            base_features: vec![Field::T2m],
            derived_features: vec![DerivedFeature::WindComponents {
                speed: Field::Ws10m,
                direction: Field::Wd10m,
            }],
            lag_fields: vec![Field::T2mMax],
            lag_depths: vec![1, 2],
            rolling_fields: vec![],
            climatology_fields: vec![Field::T2mMax],
            auxiliary_locations: vec!["Knoxville, TN".to_string()],
            cross_location_fields: vec![Field::T2mMax],
            cross_location_lags: vec![1],
            horizons: vec![3, 1],
            ..FeatureConfig::default()
        };
        let schema = SchemaBuilder::from_config(&config).build().unwrap();
        assert_eq!(
            schema.column_names(),
            vec![
                "t2m",
                "ws10m_u",
                "ws10m_v",
                "t2m_max_lag_1",
                "t2m_max_lag_2",
                "t2m_max_clim",
                "knoxville__tn_t2m_max_lag_1",
                "target_h1",
                "target_h3",
            ]
        );
        assert_eq!(schema.horizons(), vec![1, 3]);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = SchemaBuilder::new()
            .feature(FeatureSpec::Base { field: Field::T2m })
            .feature(FeatureSpec::Base { field: Field::T2m })
            .build();
        assert!(matches!(result, Err(FeatureError::ConfigInvalid(_))));
    }

    #[test]
    fn test_check_columns_reports_difference() {
        let expected = vec!["a".to_string(), "b".to_string()];
        let actual = vec!["a".to_string(), "c".to_string()];
        let err = check_columns(&expected, &actual).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("missing [b]"));
        assert!(msg.contains("unexpected [c]"));

        let reordered = vec!["b".to_string(), "a".to_string()];
        assert!(check_columns(&expected, &reordered).is_err());
    }

    #[test]
    fn test_parse_target_column() {
        assert_eq!(parse_target_column("target_h12"), Some(12));
        assert_eq!(parse_target_column("target_h"), None);
        assert_eq!(parse_target_column("target_h_t2m_lag_1"), None);
    }
}
