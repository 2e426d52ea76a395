//! Trailing-window means
//!
//! Windows always end at (and include) the current element, so a value
//! never depends on anything that comes after it. Missing inputs are
//! skipped and do not count towards the minimum-periods threshold.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Streaming trailing mean over the last `window` updates
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    min_periods: usize,
    values: VecDeque<Option<f64>>,
    sum: f64,
    count: usize,
}

impl RollingMean {
    /// Create a new rolling mean with the given window and minimum number of observations
    pub fn new(window: usize, min_periods: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }
        if min_periods == 0 || min_periods > window {
            return Err(MathError::InvalidInput(format!(
                "min_periods must be in 1..={}, got {}",
                window, min_periods
            )));
        }

        Ok(Self {
            window,
            min_periods,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
            count: 0,
        })
    }

    /// Push the next value (or a gap) into the window
    pub fn update(&mut self, value: Option<f64>) {
        self.values.push_back(value);
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }

        if self.values.len() > self.window {
            if let Some(Some(old)) = self.values.pop_front() {
                self.sum -= old;
                self.count -= 1;
            }
        }
    }

    /// Current mean, or `None` while fewer than `min_periods` values are present
    pub fn value(&self) -> Option<f64> {
        if self.count < self.min_periods {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Trailing mean over the previous `window` rows (current row included)
pub fn trailing_mean_by_row(
    values: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Result<Vec<Option<f64>>> {
    let mut rolling = RollingMean::new(window, min_periods)?;
    Ok(values
        .iter()
        .map(|&v| {
            rolling.update(v);
            rolling.value()
        })
        .collect())
}

/// Trailing mean over the day keys `(key - span, key]`
///
/// `keys` must be strictly increasing. Gaps in the keys shrink the number
/// of contributing values instead of stretching the window.
pub fn trailing_mean_by_key(
    keys: &[i64],
    values: &[Option<f64>],
    span: usize,
    min_periods: usize,
) -> Result<Vec<Option<f64>>> {
    if keys.len() != values.len() {
        return Err(MathError::LengthMismatch {
            expected: keys.len(),
            actual: values.len(),
        });
    }
    if span == 0 {
        return Err(MathError::InvalidInput(
            "Span must be greater than zero".to_string(),
        ));
    }
    if min_periods == 0 || min_periods > span {
        return Err(MathError::InvalidInput(format!(
            "min_periods must be in 1..={}, got {}",
            span, min_periods
        )));
    }
    if keys.windows(2).any(|w| w[1] <= w[0]) {
        return Err(MathError::InvalidInput(
            "Keys must be strictly increasing".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(keys.len());
    let mut start = 0;
    let mut sum = 0.0;
    let mut count = 0usize;

    for (i, &key) in keys.iter().enumerate() {
        if let Some(v) = values[i] {
            sum += v;
            count += 1;
        }
        while keys[start] <= key - span as i64 {
            if let Some(v) = values[start] {
                sum -= v;
                count -= 1;
            }
            start += 1;
        }
        out.push(if count >= min_periods {
            Some(sum / count as f64)
        } else {
            None
        });
    }

    Ok(out)
}
