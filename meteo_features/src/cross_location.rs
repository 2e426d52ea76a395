//! Cross-location feature generator
//!
//! An auxiliary location's value observed on `date0` is re-keyed to
//! `date0 + lag` and then left-joined onto the target rows by exact date.

use crate::error::{FeatureError, Result};
use crate::frame::{DropReason, FeatureFrame};
use crate::observation::{Field, Observation};
use crate::schema::FeatureSpec;
use crate::shift::shift_date;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Joins lagged auxiliary-location values onto the target timeline
#[derive(Debug, Clone, Default)]
pub struct CrossLocationGenerator {
    auxiliary: BTreeMap<String, Vec<Observation>>,
}

impl CrossLocationGenerator {
    /// Build from cleaned auxiliary observations
    pub fn new(observations: Vec<Observation>) -> Self {
        let mut auxiliary: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for obs in observations {
            auxiliary.entry(obs.location.clone()).or_default().push(obs);
        }
        for rows in auxiliary.values_mut() {
            rows.sort_by_key(|o| o.date);
        }
        Self { auxiliary }
    }

    /// `field` of `location`, re-keyed forward by `lag` days
    pub fn shifted_series(
        &self,
        location: &str,
        field: Field,
        lag: u32,
    ) -> HashMap<NaiveDate, f64> {
        self.auxiliary
            .get(location)
            .map(|rows| {
                rows.iter()
                    .filter(|o| o.get(field).is_finite())
                    .filter_map(|o| Some((shift_date(o.date, lag as i64)?, o.get(field))))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append every cross-location column declared in `specs`
    pub fn apply(&self, frame: &mut FeatureFrame, specs: &[FeatureSpec]) -> Result<()> {
        for spec in specs {
            if let FeatureSpec::CrossLocation {
                location,
                field,
                lag,
            } = spec
            {
                if frame
                    .observations()
                    .iter()
                    .any(|o| &o.location == location)
                {
                    return Err(FeatureError::ConfigInvalid(format!(
                        "auxiliary location '{}' is also a target location",
                        location
                    )));
                }
                let shifted = self.shifted_series(location, *field, *lag);
                let values: Vec<Option<f64>> = frame
                    .observations()
                    .iter()
                    .map(|o| shifted.get(&o.date).copied())
                    .collect();
                debug!(
                    "{}: {} of {} rows matched",
                    spec.column_name(),
                    values.iter().filter(|v| v.is_some()).count(),
                    values.len()
                );
                frame.push_column(spec.column_name(), values, DropReason::JoinMiss)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn test_value_lands_on_shifted_date() {
        let aux = vec![
            Observation::filled("Knoxville", day(3), 0.0).with(Field::T2mMax, 7.5),
            Observation::filled("Knoxville", day(4), 0.0).with(Field::T2mMax, 8.5),
        ];
        let generator = CrossLocationGenerator::new(aux);
        let mut frame = FeatureFrame::new(
            (3..=6)
                .map(|d| Observation::filled("Chattanooga", day(d), 0.0))
                .collect(),
        )
        .unwrap();

        let spec = FeatureSpec::CrossLocation {
            location: "Knoxville".to_string(),
            field: Field::T2mMax,
            lag: 2,
        };
        generator.apply(&mut frame, &[spec]).unwrap();

        let column = frame.column("knoxville_t2m_max_lag_2").unwrap();
        assert_eq!(column.values, vec![None, None, Some(7.5), Some(8.5)]);
        assert_eq!(frame.drop_reason(0), Some(DropReason::JoinMiss));
    }

    #[test]
    fn test_missing_location_yields_missing_values() {
        let generator = CrossLocationGenerator::new(vec![]);
        let shifted = generator.shifted_series("Nowhere", Field::T2m, 1);
        assert!(shifted.is_empty());
    }
}
