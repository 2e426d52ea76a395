//! Horizon target builder
//!
//! Targets are shifted within each location's own series, grouped by the
//! location name itself. Indicator encoding of the location happens later
//! and is never used as a grouping key.

use crate::config::ShiftMode;
use crate::error::Result;
use crate::frame::{DropReason, FeatureFrame};
use crate::observation::Field;
use crate::schema::TargetSpec;
use crate::shift::shifted_index;
use chrono::NaiveDate;

/// Builds forward-shifted target columns
#[derive(Debug, Clone, Copy)]
pub struct HorizonTargetBuilder {
    shift_mode: ShiftMode,
}

impl HorizonTargetBuilder {
    /// New builder
    pub fn new(shift_mode: ShiftMode) -> Self {
        Self { shift_mode }
    }

    /// `field` at `horizon` days (or rows) after each row, per location
    pub fn target(&self, frame: &FeatureFrame, field: Field, horizon: u32) -> Vec<Option<f64>> {
        let mut out = vec![None; frame.len()];
        let observations = frame.observations();
        for block in frame.location_blocks() {
            let rows = &observations[block.rows.clone()];
            let dates: Vec<NaiveDate> = rows.iter().map(|o| o.date).collect();
            for i in 0..rows.len() {
                out[block.rows.start + i] = shifted_index(&dates, i, horizon as i64, self.shift_mode)
                    .map(|j| rows[j].get(field))
                    .filter(|v| v.is_finite());
            }
        }
        out
    }

    /// Append one column per declared target
    pub fn apply(&self, frame: &mut FeatureFrame, targets: &[TargetSpec]) -> Result<()> {
        for spec in targets {
            let values = self.target(frame, spec.field, spec.horizon);
            frame.push_column(spec.column_name(), values, DropReason::ShiftBoundary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;

    fn obs(location: &str, d: u32, v: f64) -> Observation {
        Observation::filled(location, NaiveDate::from_ymd_opt(2023, 5, d).unwrap(), 0.0)
            .with(Field::T2mMax, v)
    }

    #[test]
    fn test_targets_stay_within_location() {
        let frame = FeatureFrame::new(vec![
            obs("A", 1, 1.0),
            obs("A", 2, 2.0),
            obs("B", 1, 10.0),
            obs("B", 2, 20.0),
        ])
        .unwrap();
        let builder = HorizonTargetBuilder::new(ShiftMode::Calendar);
        assert_eq!(
            builder.target(&frame, Field::T2mMax, 1),
            vec![Some(2.0), None, Some(20.0), None]
        );
        assert_eq!(
            builder.target(&frame, Field::T2mMax, 0),
            vec![Some(1.0), Some(2.0), Some(10.0), Some(20.0)]
        );
    }

    #[test]
    fn test_gap_modes_differ() {
        let frame =
            FeatureFrame::new(vec![obs("A", 1, 1.0), obs("A", 3, 3.0)]).unwrap();
        let by_date = HorizonTargetBuilder::new(ShiftMode::Calendar).target(&frame, Field::T2mMax, 1);
        let by_row = HorizonTargetBuilder::new(ShiftMode::Row).target(&frame, Field::T2mMax, 1);
        assert_eq!(by_date, vec![None, None]);
        assert_eq!(by_row, vec![Some(3.0), None]);
    }
}
