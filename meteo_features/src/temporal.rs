//! Temporal feature generator: lags, trailing means and climatology
//!
//! Every value computed for a row at `(location, date)` is drawn from rows
//! of the same location dated on or before `date`. Climatology is the one
//! statistic that looks across years, and it is fitted only on the
//! reference window.

use crate::config::{DateWindow, DayOfYearMode, ShiftMode};
use crate::error::Result;
use crate::frame::{DropReason, FeatureFrame};
use crate::observation::Field;
use crate::schema::FeatureSpec;
use crate::shift::shifted_index;
use chrono::{Datelike, NaiveDate};
use meteo_math::rolling::{trailing_mean_by_key, trailing_mean_by_row};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Mean of a field per `(location, day_of_year)` over a reference window
#[derive(Debug, Clone, PartialEq)]
pub struct ClimatologyTable {
    field: Field,
    reference: DateWindow,
    day_of_year_mode: DayOfYearMode,
    means: HashMap<(String, u32), f64>,
}

impl ClimatologyTable {
    /// Fit on the rows of `frame` that fall inside `reference`
    pub fn fit(
        frame: &FeatureFrame,
        field: Field,
        reference: DateWindow,
        day_of_year_mode: DayOfYearMode,
    ) -> Self {
        let mut sums: HashMap<(String, u32), (f64, usize)> = HashMap::new();
        for obs in frame
            .observations()
            .iter()
            .filter(|o| reference.contains(o.date))
        {
            let value = obs.get(field);
            if !value.is_finite() {
                continue;
            }
            let key = (obs.location.clone(), day_of_year_mode.key(obs.date));
            let entry = sums.entry(key).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }

        let means = sums
            .into_iter()
            .map(|(key, (sum, n))| (key, sum / n as f64))
            .collect();
        Self {
            field,
            reference,
            day_of_year_mode,
            means,
        }
    }

    /// Climatology for a location on a date, if the reference window covered that day of year
    pub fn lookup(&self, location: &str, date: NaiveDate) -> Option<f64> {
        self.means
            .get(&(location.to_string(), self.day_of_year_mode.key(date)))
            .copied()
    }

    /// Field this table describes
    pub fn field(&self) -> Field {
        self.field
    }

    /// Number of `(location, day_of_year)` cells
    pub fn len(&self) -> usize {
        self.means.len()
    }

    /// Whether no reference rows were found
    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

/// Per-location lag, rolling and climatology features
#[derive(Debug, Clone)]
pub struct TemporalFeatureGenerator {
    shift_mode: ShiftMode,
    min_periods: usize,
    reference: DateWindow,
    day_of_year_mode: DayOfYearMode,
}

impl TemporalFeatureGenerator {
    /// New generator
    pub fn new(
        shift_mode: ShiftMode,
        min_periods: usize,
        reference: DateWindow,
        day_of_year_mode: DayOfYearMode,
    ) -> Self {
        Self {
            shift_mode,
            min_periods,
            reference,
            day_of_year_mode,
        }
    }

    /// Append every lag, rolling and climatology column declared in `specs`
    pub fn apply(&self, frame: &mut FeatureFrame, specs: &[FeatureSpec]) -> Result<()> {
        for spec in specs {
            match *spec {
                FeatureSpec::Lag { field, lag } => {
                    let values = self.lag(frame, field, lag);
                    frame.push_column(spec.column_name(), values, DropReason::ShiftBoundary)?;
                }
                FeatureSpec::Rolling { field, window } => {
                    let values = self.rolling(frame, field, window as usize)?;
                    frame.push_column(spec.column_name(), values, DropReason::ShiftBoundary)?;
                }
                FeatureSpec::Climatology { field } => {
                    let table =
                        ClimatologyTable::fit(frame, field, self.reference, self.day_of_year_mode);
                    if table.is_empty() {
                        warn!(
                            "No reference rows in {} for {} climatology",
                            self.reference, field
                        );
                    }
                    debug!("{} climatology fitted on {} cells", field, table.len());
                    let values = frame
                        .observations()
                        .iter()
                        .map(|o| table.lookup(&o.location, o.date))
                        .collect();
                    frame.push_column(spec.column_name(), values, DropReason::JoinMiss)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `field` at `lag` days (or rows) before each row, per location
    pub fn lag(&self, frame: &FeatureFrame, field: Field, lag: u32) -> Vec<Option<f64>> {
        let mut out = vec![None; frame.len()];
        let observations = frame.observations();
        for block in frame.location_blocks() {
            let rows = &observations[block.rows.clone()];
            let dates: Vec<NaiveDate> = rows.iter().map(|o| o.date).collect();
            for i in 0..rows.len() {
                out[block.rows.start + i] = shifted_index(&dates, i, -(lag as i64), self.shift_mode)
                    .map(|j| rows[j].get(field))
                    .filter(|v| v.is_finite());
            }
        }
        out
    }

    /// Trailing mean of `field` over `window` days (or rows), current row included
    pub fn rolling(
        &self,
        frame: &FeatureFrame,
        field: Field,
        window: usize,
    ) -> Result<Vec<Option<f64>>> {
        let mut out = Vec::with_capacity(frame.len());
        let observations = frame.observations();
        for block in frame.location_blocks() {
            let rows = &observations[block.rows.clone()];
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|o| Some(o.get(field)).filter(|v| v.is_finite()))
                .collect();
            let means = match self.shift_mode {
                ShiftMode::Row => trailing_mean_by_row(&values, window, self.min_periods)?,
                ShiftMode::Calendar => {
                    let keys: Vec<i64> = rows
                        .iter()
                        .map(|o| o.date.num_days_from_ce() as i64)
                        .collect();
                    trailing_mean_by_key(&keys, &values, window, self.min_periods)?
                }
            };
            out.extend(means);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(location: &str, days: &[u32], values: &[f64]) -> Vec<Observation> {
        days.iter()
            .zip(values)
            .map(|(&d, &v)| Observation::filled(location, date(2023, 1, d), 0.0).with(Field::T2m, v))
            .collect()
    }

    fn generator(mode: ShiftMode) -> TemporalFeatureGenerator {
        TemporalFeatureGenerator::new(
            mode,
            1,
            DateWindow::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap(),
            DayOfYearMode::Ordinal,
        )
    }

    #[test]
    fn test_lag_never_crosses_locations() {
        let mut rows = series("A", &[1, 2, 3], &[1.0, 2.0, 3.0]);
        rows.extend(series("B", &[1, 2, 3], &[10.0, 20.0, 30.0]));
        let frame = FeatureFrame::new(rows).unwrap();

        let lagged = generator(ShiftMode::Row).lag(&frame, Field::T2m, 1);
        assert_eq!(lagged, vec![None, Some(1.0), Some(2.0), None, Some(10.0), Some(20.0)]);
    }

    #[test]
    fn test_lag_on_gapped_series() {
        let frame = FeatureFrame::new(series("A", &[1, 2, 4, 5], &[1.0, 2.0, 4.0, 5.0])).unwrap();

        let by_date = generator(ShiftMode::Calendar).lag(&frame, Field::T2m, 1);
        assert_eq!(by_date, vec![None, Some(1.0), None, Some(4.0)]);

        // row shifting reaches back over the missing day
        let by_row = generator(ShiftMode::Row).lag(&frame, Field::T2m, 1);
        assert_eq!(by_row, vec![None, Some(1.0), Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_rolling_on_gapped_series() {
        let frame = FeatureFrame::new(series("A", &[1, 2, 4, 5], &[1.0, 2.0, 4.0, 5.0])).unwrap();

        let by_date = generator(ShiftMode::Calendar)
            .rolling(&frame, Field::T2m, 2)
            .unwrap();
        assert_abs_diff_eq!(by_date[2].unwrap(), 4.0);
        assert_abs_diff_eq!(by_date[3].unwrap(), 4.5);

        let by_row = generator(ShiftMode::Row).rolling(&frame, Field::T2m, 2).unwrap();
        assert_abs_diff_eq!(by_row[2].unwrap(), 3.0);
    }

    #[test]
    fn test_climatology_uses_reference_rows_only() {
        let rows = vec![
            Observation::filled("A", date(2021, 3, 10), 0.0).with(Field::T2mMax, 10.0),
            Observation::filled("A", date(2022, 3, 10), 0.0).with(Field::T2mMax, 20.0),
            Observation::filled("A", date(2023, 3, 10), 0.0).with(Field::T2mMax, 99.0),
        ];
        let frame = FeatureFrame::new(rows).unwrap();
        let reference = DateWindow::new(date(2021, 1, 1), date(2022, 12, 31)).unwrap();
        let table = ClimatologyTable::fit(&frame, Field::T2mMax, reference, DayOfYearMode::Ordinal);

        assert_eq!(table.lookup("A", date(2023, 3, 10)), Some(15.0));
        assert_eq!(table.lookup("A", date(2023, 3, 11)), None);
        assert_eq!(table.lookup("B", date(2023, 3, 10)), None);
    }
}
