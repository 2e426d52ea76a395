//! Sentinel cleaning
//!
//! Every sentinel cell becomes NaN. A row carrying the sentinel (or NaN)
//! in any checked field is blanked: it stays in place so that row-based
//! shifts still see the gap, but none of its values can reach a feature.
//! Nothing is imputed.

use crate::observation::{Field, Observation};
use tracing::debug;

/// Masks the missing-value sentinel
#[derive(Debug, Clone)]
pub struct SentinelCleaner {
    sentinel: f64,
    fields: Vec<Field>,
}

/// Result of a cleaning pass
#[derive(Debug, Clone, Default)]
pub struct CleanOutcome {
    /// Every input row, with sentinel cells masked
    pub observations: Vec<Observation>,
    /// Number of rows blanked because a checked field was missing
    pub blanked: usize,
}

impl SentinelCleaner {
    /// Cleaner checking `fields` against `sentinel`
    pub fn new(sentinel: f64, fields: Vec<Field>) -> Self {
        Self { sentinel, fields }
    }

    /// Cleaner checking every field
    pub fn all_fields(sentinel: f64) -> Self {
        Self::new(sentinel, Field::ALL.to_vec())
    }

    /// Whether any checked field holds the sentinel or NaN
    pub fn is_missing(&self, observation: &Observation) -> bool {
        self.fields.iter().any(|&field| {
            let value = observation.get(field);
            value.is_nan() || value == self.sentinel
        })
    }

    /// Blank rows with a missing checked field and mask stray sentinels elsewhere
    pub fn clean(&self, observations: Vec<Observation>) -> CleanOutcome {
        let mut blanked = 0;
        let observations = observations
            .into_iter()
            .map(|obs| {
                if self.is_missing(&obs) {
                    debug!("Sentinel row blanked: ({}, {})", obs.location, obs.date);
                    blanked += 1;
                    return Observation::filled(obs.location, obs.date, f64::NAN);
                }
                let mut obs = obs;
                for field in Field::ALL {
                    if obs.get(field) == self.sentinel {
                        obs.set(field, f64::NAN);
                    }
                }
                obs
            })
            .collect();
        CleanOutcome {
            observations,
            blanked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(d: u32, t: f64) -> Observation {
        Observation::filled("A", NaiveDate::from_ymd_opt(2023, 1, d).unwrap(), 1.0)
            .with(Field::T2m, t)
    }

    #[test]
    fn test_sentinel_rows_blanked_in_place() {
        let cleaner = SentinelCleaner::all_fields(-999.0);
        let outcome = cleaner.clean(vec![row(1, 5.0), row(2, -999.0), row(3, f64::NAN)]);
        assert_eq!(outcome.observations.len(), 3);
        assert_eq!(outcome.blanked, 2);
        assert_eq!(outcome.observations[0].get(Field::T2mMax), 1.0);
        assert!(outcome.observations[1].is_blank());
        assert!(outcome.observations[2].is_blank());
        assert_eq!(outcome.observations[1].date.to_string(), "2023-01-02");
    }

    #[test]
    fn test_unchecked_sentinel_is_masked() {
        let cleaner = SentinelCleaner::new(-999.0, vec![Field::T2mMax]);
        let outcome = cleaner.clean(vec![row(1, -999.0)]);
        assert_eq!(outcome.blanked, 0);
        let obs = &outcome.observations[0];
        assert!(!obs.is_blank());
        assert!(obs.get(Field::T2m).is_nan());
        assert_eq!(obs.get(Field::T2mMax), 1.0);
    }
}
