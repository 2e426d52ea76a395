//! Derived feature calculator

use crate::config::{DayOfYearMode, DerivedFeature};
use crate::error::Result;
use crate::frame::{DropReason, FeatureFrame};
use crate::observation::Observation;
use crate::schema::{DerivedComponent, FeatureSpec};
use meteo_math::derived::{average, difference, ratio, seasonal_encoding, wind_components};

/// Computes same-day derived columns
#[derive(Debug, Clone, Copy)]
pub struct DerivedFeatureCalculator {
    day_of_year_mode: DayOfYearMode,
    seasonal_period: f64,
}

impl DerivedFeatureCalculator {
    /// New calculator
    pub fn new(day_of_year_mode: DayOfYearMode, seasonal_period: f64) -> Self {
        Self {
            day_of_year_mode,
            seasonal_period,
        }
    }

    /// Value of one derived component for one observation
    pub fn compute(
        &self,
        feature: DerivedFeature,
        component: DerivedComponent,
        obs: &Observation,
    ) -> Option<f64> {
        let pick = |pair: Option<(f64, f64)>| {
            pair.map(|(first, second)| match component {
                DerivedComponent::Second => second,
                _ => first,
            })
        };

        match feature {
            DerivedFeature::Ratio {
                numerator,
                denominator,
            } => ratio(obs.get(numerator), obs.get(denominator)),
            DerivedFeature::Difference {
                minuend,
                subtrahend,
            } => difference(obs.get(minuend), obs.get(subtrahend)),
            DerivedFeature::Average { a, b } => average(obs.get(a), obs.get(b)),
            DerivedFeature::WindComponents { speed, direction } => {
                pick(wind_components(obs.get(speed), obs.get(direction)))
            }
            DerivedFeature::SeasonalEncoding => pick(seasonal_encoding(
                self.day_of_year_mode.key(obs.date),
                self.seasonal_period,
            )),
        }
    }

    /// Append every derived column declared in `specs`
    pub fn apply(&self, frame: &mut FeatureFrame, specs: &[FeatureSpec]) -> Result<()> {
        for spec in specs {
            if let FeatureSpec::Derived { feature, component } = spec {
                let values = frame
                    .observations()
                    .iter()
                    .map(|obs| self.compute(*feature, *component, obs))
                    .collect();
                frame.push_column(spec.column_name(), values, DropReason::MissingData)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Field;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn frame() -> FeatureFrame {
        let date = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        FeatureFrame::new(vec![
            Observation::filled("A", date, 0.0)
                .with(Field::T2mMax, 30.0)
                .with(Field::T2mMin, 18.0)
                .with(Field::Rh2m, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_difference_and_ratio() {
        let mut frame = frame();
        let specs = vec![
            FeatureSpec::Derived {
                feature: DerivedFeature::Difference {
                    minuend: Field::T2mMax,
                    subtrahend: Field::T2mMin,
                },
                component: DerivedComponent::Value,
            },
            FeatureSpec::Derived {
                feature: DerivedFeature::Ratio {
                    numerator: Field::T2mMax,
                    denominator: Field::Rh2m,
                },
                component: DerivedComponent::Value,
            },
        ];
        DerivedFeatureCalculator::new(DayOfYearMode::Ordinal, 365.0)
            .apply(&mut frame, &specs)
            .unwrap();

        assert_abs_diff_eq!(
            frame.column("t2m_max_minus_t2m_min").unwrap().values[0].unwrap(),
            12.0
        );
        // division by zero becomes a missing value and flags the row
        assert_eq!(frame.column("t2m_max_over_rh2m").unwrap().values[0], None);
        assert_eq!(frame.drop_reason(0), Some(DropReason::MissingData));
    }

    #[test]
    fn test_seasonal_components() {
        let calc = DerivedFeatureCalculator::new(DayOfYearMode::Ordinal, 365.0);
        let frame = frame();
        let obs = &frame.observations()[0];
        let sin = calc
            .compute(DerivedFeature::SeasonalEncoding, DerivedComponent::First, obs)
            .unwrap();
        let cos = calc
            .compute(DerivedFeature::SeasonalEncoding, DerivedComponent::Second, obs)
            .unwrap();
        assert_abs_diff_eq!(sin * sin + cos * cos, 1.0, epsilon = 1e-12);
    }
}
