//! Feature pipeline configuration
//!
//! All knobs that shape the feature matrix live in one enumerated structure
//! that is validated once, before any data is loaded.

use crate::error::{FeatureError, Result};
use crate::observation::Field;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Closed date interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First included date
    pub start: NaiveDate,
    /// Last included date
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create a window; fails if `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let window = Self { start, end };
        window.validate("window")?;
        Ok(window)
    }

    /// Whether `date` falls inside the window (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.start > self.end {
            return Err(FeatureError::ConfigInvalid(format!(
                "{} is not chronological: start {} is after end {}",
                name, self.start, self.end
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// How lag, rolling and horizon shifts find their source row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMode {
    /// Source is the row exactly `k` calendar days away; gaps yield a missing value
    #[default]
    Calendar,
    /// Source is the row `k` positions away in the location's date-sorted
    /// series. When the series has gaps the effective lag in days is longer
    /// than `k`.
    Row,
}

/// Day-of-year key used by climatology and seasonal encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfYearMode {
    /// Calendar ordinal, 1..=366
    #[default]
    Ordinal,
    /// 1..=365; Feb 29 shares Feb 28's key and later leap-year days shift back by one
    NoLeap,
}

impl DayOfYearMode {
    /// Day-of-year key for a date
    pub fn key(self, date: NaiveDate) -> u32 {
        let ordinal = date.ordinal();
        match self {
            DayOfYearMode::Ordinal => ordinal,
            DayOfYearMode::NoLeap => {
                let leap = NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some();
                if leap && ordinal >= 60 {
                    ordinal - 1
                } else {
                    ordinal
                }
            }
        }
    }
}

/// Same-day derived quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedFeature {
    /// `numerator / denominator`
    Ratio { numerator: Field, denominator: Field },
    /// `minuend - subtrahend`
    Difference { minuend: Field, subtrahend: Field },
    /// Mean of two fields
    Average { a: Field, b: Field },
    /// Orthogonal u/v components of a speed/direction pair
    WindComponents { speed: Field, direction: Field },
    /// Sine/cosine of the day-of-year over `seasonal_period`
    SeasonalEncoding,
}

/// Configuration of the feature construction and split stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Locations whose rows form the feature matrix
    pub target_locations: Vec<String>,
    /// Locations joined onto the target timeline as lagged features
    pub auxiliary_locations: Vec<String>,
    /// Training interval (inclusive)
    pub train_window: DateWindow,
    /// Test interval (inclusive)
    pub test_window: DateWindow,
    /// Interval used for climatology; the training window when unset
    pub reference_window: Option<DateWindow>,
    /// Raw same-day fields kept as features
    pub base_features: Vec<Field>,
    /// Same-day derived quantities
    pub derived_features: Vec<DerivedFeature>,
    /// Fields that get lag features
    pub lag_fields: Vec<Field>,
    /// Lag depths in days (or rows)
    pub lag_depths: Vec<u32>,
    /// Fields that get trailing means
    pub rolling_fields: Vec<Field>,
    /// Trailing window lengths
    pub rolling_windows: Vec<u32>,
    /// Minimum number of values for a trailing mean
    pub rolling_min_periods: u32,
    /// Fields that get a day-of-year climatology
    pub climatology_fields: Vec<Field>,
    /// Fields joined from auxiliary locations
    pub cross_location_fields: Vec<Field>,
    /// Lags for auxiliary-location fields, in calendar days
    pub cross_location_lags: Vec<u32>,
    /// Field forecast by the horizon targets
    pub target_field: Field,
    /// Forecast horizons in days
    pub horizons: Vec<u32>,
    /// Shift semantics for lags, rolling windows and targets
    pub shift_mode: ShiftMode,
    /// Day-of-year convention
    pub day_of_year_mode: DayOfYearMode,
    /// Period of the seasonal encoding, in days
    pub seasonal_period: f64,
    /// Value meaning "missing" in the observation store
    pub sentinel: f64,
    /// Fields checked for the sentinel; every field when empty
    pub sentinel_fields: Vec<Field>,
    /// Emit 0/1 indicator columns per target location
    pub encode_locations: bool,
    /// Drop train rows whose furthest target falls inside the test window
    pub purge_overlap: bool,
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            target_locations: vec!["Chattanooga".to_string()],
            auxiliary_locations: Vec::new(),
            train_window: DateWindow {
                start: ymd(2015, 1, 1),
                end: ymd(2022, 12, 31),
            },
            test_window: DateWindow {
                start: ymd(2023, 1, 1),
                end: ymd(2024, 12, 31),
            },
            reference_window: None,
            base_features: vec![
                Field::T2m,
                Field::T2mMax,
                Field::T2mMin,
                Field::Dewpoint,
                Field::Rh2m,
                Field::Ps,
                Field::Prectotcorr,
            ],
            derived_features: vec![
                DerivedFeature::Difference {
                    minuend: Field::T2mMax,
                    subtrahend: Field::T2mMin,
                },
                DerivedFeature::WindComponents {
                    speed: Field::Ws10m,
                    direction: Field::Wd10m,
                },
                DerivedFeature::SeasonalEncoding,
            ],
            lag_fields: vec![Field::T2mMax, Field::T2m],
            lag_depths: vec![1, 2, 3, 7],
            rolling_fields: vec![Field::T2mMax],
            rolling_windows: vec![7],
            rolling_min_periods: 1,
            climatology_fields: vec![Field::T2mMax],
            cross_location_fields: vec![Field::T2mMax],
            cross_location_lags: vec![1],
            target_field: Field::T2mMax,
            horizons: vec![1, 2, 3],
            shift_mode: ShiftMode::Calendar,
            day_of_year_mode: DayOfYearMode::Ordinal,
            seasonal_period: 365.0,
            sentinel: -999.0,
            sentinel_fields: Vec::new(),
            encode_locations: false,
            purge_overlap: false,
        }
    }
}

fn first_duplicate<T: Eq + Hash + Clone>(items: &[T]) -> Option<T> {
    let mut seen = HashSet::new();
    items.iter().find(|item| !seen.insert(*item)).cloned()
}

fn invalid(msg: impl Into<String>) -> FeatureError {
    FeatureError::ConfigInvalid(msg.into())
}

impl FeatureConfig {
    /// Window used for climatology statistics
    pub fn reference_window(&self) -> DateWindow {
        self.reference_window.unwrap_or(self.train_window)
    }

    /// Fields checked by the sentinel cleaner
    pub fn sentinel_fields(&self) -> Vec<Field> {
        if self.sentinel_fields.is_empty() {
            Field::ALL.to_vec()
        } else {
            self.sentinel_fields.clone()
        }
    }

    /// Sorted horizons
    pub fn sorted_horizons(&self) -> Vec<u32> {
        let mut horizons = self.horizons.clone();
        horizons.sort_unstable();
        horizons
    }

    /// Set the target locations
    pub fn with_target_locations<S: Into<String>>(mut self, locations: Vec<S>) -> Self {
        self.target_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Set the auxiliary locations
    pub fn with_auxiliary_locations<S: Into<String>>(mut self, locations: Vec<S>) -> Self {
        self.auxiliary_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Set the train and test windows
    pub fn with_windows(mut self, train: DateWindow, test: DateWindow) -> Self {
        self.train_window = train;
        self.test_window = test;
        self
    }

    /// Set the lag depths
    pub fn with_lags(mut self, fields: Vec<Field>, depths: Vec<u32>) -> Self {
        self.lag_fields = fields;
        self.lag_depths = depths;
        self
    }

    /// Set the horizons
    pub fn with_horizons(mut self, horizons: Vec<u32>) -> Self {
        self.horizons = horizons;
        self
    }

    /// Set the shift mode
    pub fn with_shift_mode(mut self, mode: ShiftMode) -> Self {
        self.shift_mode = mode;
        self
    }

    /// Check every field once; the first violation is returned
    pub fn validate(&self) -> Result<()> {
        if self.target_locations.is_empty() {
            return Err(invalid("target_locations must not be empty"));
        }
        let all_locations: Vec<&String> = self
            .target_locations
            .iter()
            .chain(self.auxiliary_locations.iter())
            .collect();
        if all_locations.iter().any(|l| l.trim().is_empty()) {
            return Err(invalid("location names must not be blank"));
        }
        if let Some(dup) = first_duplicate(&all_locations) {
            return Err(invalid(format!(
                "location '{}' is listed more than once across target and auxiliary locations",
                dup
            )));
        }

        self.train_window.validate("train_window")?;
        self.test_window.validate("test_window")?;
        if let Some(reference) = &self.reference_window {
            reference.validate("reference_window")?;
        }
        if self.train_window.end >= self.test_window.start {
            return Err(invalid(format!(
                "train_window {} must end before test_window {} starts",
                self.train_window, self.test_window
            )));
        }

        if self.lag_fields.is_empty() || self.lag_depths.is_empty() {
            return Err(invalid("lag_fields and lag_depths must not be empty"));
        }
        if self.lag_depths.contains(&0) {
            return Err(invalid("lag depths must be at least 1"));
        }
        if let Some(dup) = first_duplicate(&self.lag_depths) {
            return Err(invalid(format!("lag depth {} is listed twice", dup)));
        }

        if self.horizons.is_empty() {
            return Err(invalid("horizons must not be empty"));
        }
        if let Some(dup) = first_duplicate(&self.horizons) {
            return Err(invalid(format!("horizon {} is listed twice", dup)));
        }

        if !self.rolling_fields.is_empty() {
            if self.rolling_windows.is_empty() {
                return Err(invalid("rolling_fields set but rolling_windows is empty"));
            }
            if self.rolling_windows.contains(&0) {
                return Err(invalid("rolling windows must be at least 1"));
            }
            let smallest = self.rolling_windows.iter().copied().min().unwrap_or(1);
            if self.rolling_min_periods == 0 || self.rolling_min_periods > smallest {
                return Err(invalid(format!(
                    "rolling_min_periods must be in 1..={}, got {}",
                    smallest, self.rolling_min_periods
                )));
            }
        }

        if !self.auxiliary_locations.is_empty() {
            if self.cross_location_fields.is_empty() || self.cross_location_lags.is_empty() {
                return Err(invalid(
                    "auxiliary locations require cross_location_fields and cross_location_lags",
                ));
            }
            if self.cross_location_lags.contains(&0) {
                return Err(invalid("cross-location lags must be at least 1"));
            }
            if let Some(dup) = first_duplicate(&self.cross_location_lags) {
                return Err(invalid(format!("cross-location lag {} is listed twice", dup)));
            }
        }

        if let Some(dup) = first_duplicate(&self.derived_features) {
            return Err(invalid(format!("derived feature {:?} is listed twice", dup)));
        }
        for list in [
            &self.base_features,
            &self.lag_fields,
            &self.rolling_fields,
            &self.climatology_fields,
            &self.cross_location_fields,
        ] {
            if let Some(dup) = first_duplicate(list) {
                return Err(invalid(format!("field '{}' is listed twice", dup)));
            }
        }

        if !(self.seasonal_period.is_finite() && self.seasonal_period > 0.0) {
            return Err(invalid(format!(
                "seasonal_period must be positive, got {}",
                self.seasonal_period
            )));
        }
        if !self.sentinel.is_finite() {
            return Err(invalid("sentinel must be a finite number"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        FeatureConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_empty_locations() {
        let config = FeatureConfig::default().with_target_locations(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(FeatureError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_rejects_non_chronological_window() {
        let mut config = FeatureConfig::default();
        config.test_window = DateWindow {
            start: ymd(2024, 1, 1),
            end: ymd(2023, 1, 1),
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("test_window"));
    }

    #[test]
    fn test_rejects_overlapping_windows() {
        let mut config = FeatureConfig::default();
        config.train_window.end = config.test_window.start;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_lag_and_horizon_lists() {
        let config = FeatureConfig::default().with_lags(vec![Field::T2m], vec![]);
        assert!(config.validate().is_err());
        let config = FeatureConfig::default().with_horizons(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_target_reused_as_auxiliary() {
        let config = FeatureConfig::default().with_auxiliary_locations(vec!["Chattanooga"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_leap_day_of_year() {
        let feb29 = ymd(2024, 2, 29);
        let feb28 = ymd(2024, 2, 28);
        let mar1 = ymd(2024, 3, 1);
        assert_eq!(DayOfYearMode::NoLeap.key(feb29), 59);
        assert_eq!(DayOfYearMode::NoLeap.key(feb28), 59);
        assert_eq!(DayOfYearMode::NoLeap.key(mar1), 60);
        assert_eq!(DayOfYearMode::NoLeap.key(ymd(2023, 3, 1)), 60);
        assert_eq!(DayOfYearMode::Ordinal.key(mar1), 61);
        assert_eq!(DayOfYearMode::NoLeap.key(ymd(2024, 12, 31)), 365);
    }

    #[test]
    fn test_json_round_trip() {
        let config = FeatureConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: FeatureConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
