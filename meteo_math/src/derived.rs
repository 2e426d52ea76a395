//! Same-day derived quantities
//!
//! Every function is a pure function of values observed on one day.
//! Results that are not finite are reported as `None` rather than clamped.

use std::f64::consts::PI;

/// Denominators smaller than this in magnitude are treated as zero
pub const MIN_DENOMINATOR: f64 = 1e-9;

fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// `numerator / denominator`, or `None` for a (near-)zero denominator
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.abs() < MIN_DENOMINATOR {
        return None;
    }
    finite(numerator / denominator)
}

/// `a - b`
pub fn difference(a: f64, b: f64) -> Option<f64> {
    finite(a - b)
}

/// Mean of two values
pub fn average(a: f64, b: f64) -> Option<f64> {
    finite((a + b) / 2.0)
}

/// Split a wind speed / direction pair into `(u, v)` components.
///
/// Direction is in meteorological degrees (the direction the wind blows
/// from, clockwise from north), so a northerly wind has a negative `v`.
pub fn wind_components(speed: f64, direction_deg: f64) -> Option<(f64, f64)> {
    let rad = direction_deg.to_radians();
    let u = -speed * rad.sin();
    let v = -speed * rad.cos();
    Some((finite(u)?, finite(v)?))
}

/// Sine/cosine encoding of a day-of-year over a fixed period
pub fn seasonal_encoding(day_of_year: u32, period: f64) -> Option<(f64, f64)> {
    if period <= 0.0 {
        return None;
    }
    let angle = 2.0 * PI * day_of_year as f64 / period;
    Some((finite(angle.sin())?, finite(angle.cos())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ratio_zero_denominator_is_missing() {
        assert_eq!(ratio(1.0, 0.0), None);
        assert_eq!(ratio(1.0, 1e-12), None);
        assert_abs_diff_eq!(ratio(3.0, 2.0).unwrap(), 1.5);
    }

    #[test]
    fn test_non_finite_inputs_are_missing() {
        assert_eq!(difference(f64::INFINITY, 1.0), None);
        assert_eq!(average(f64::NAN, 1.0), None);
    }

    #[test]
    fn test_wind_components() {
        // wind from the north blows southwards
        let (u, v) = wind_components(10.0, 0.0).unwrap();
        assert_abs_diff_eq!(u, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v, -10.0, epsilon = 1e-12);

        // wind from the west blows eastwards
        let (u, v) = wind_components(5.0, 270.0).unwrap();
        assert_abs_diff_eq!(u, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_seasonal_encoding_wraps_at_period() {
        let (s0, c0) = seasonal_encoding(0, 365.0).unwrap();
        let (s1, c1) = seasonal_encoding(365, 365.0).unwrap();
        assert_abs_diff_eq!(s0, s1, epsilon = 1e-12);
        assert_abs_diff_eq!(c0, c1, epsilon = 1e-12);
        assert!(seasonal_encoding(10, 0.0).is_none());
    }
}
