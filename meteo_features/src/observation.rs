//! Daily per-location observations

use crate::error::{FeatureError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric fields carried by every observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Daily mean temperature at 2 m
    T2m,
    /// Daily maximum temperature at 2 m
    T2mMax,
    /// Daily minimum temperature at 2 m
    T2mMin,
    /// Dew-point temperature at 2 m
    Dewpoint,
    /// Relative humidity at 2 m
    Rh2m,
    /// Wind speed at 10 m
    Ws10m,
    /// Wind direction at 10 m, degrees
    Wd10m,
    /// Surface pressure
    Ps,
    /// All-sky shortwave downward radiation
    AllskySwDwn,
    /// All-sky longwave downward radiation
    AllskyLwDwn,
    /// Corrected precipitation
    Prectotcorr,
}

impl Field {
    /// Number of fields
    pub const COUNT: usize = 11;

    /// Every field, in storage order
    pub const ALL: [Field; Field::COUNT] = [
        Field::T2m,
        Field::T2mMax,
        Field::T2mMin,
        Field::Dewpoint,
        Field::Rh2m,
        Field::Ws10m,
        Field::Wd10m,
        Field::Ps,
        Field::AllskySwDwn,
        Field::AllskyLwDwn,
        Field::Prectotcorr,
    ];

    /// Column name used in tables and feature names
    pub fn name(self) -> &'static str {
        match self {
            Field::T2m => "t2m",
            Field::T2mMax => "t2m_max",
            Field::T2mMin => "t2m_min",
            Field::Dewpoint => "dewpoint",
            Field::Rh2m => "rh2m",
            Field::Ws10m => "ws10m",
            Field::Wd10m => "wd10m",
            Field::Ps => "ps",
            Field::AllskySwDwn => "allsky_sw_dwn",
            Field::AllskyLwDwn => "allsky_lw_dwn",
            Field::Prectotcorr => "prectotcorr",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| FeatureError::DataError(format!("Unknown field '{}'", s)))
    }
}

/// One row of the observation store: a location on a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Location name
    pub location: String,
    /// Calendar date
    pub date: NaiveDate,
    values: [f64; Field::COUNT],
}

impl Observation {
    /// Create an observation with every field set to `fill`
    pub fn filled(location: impl Into<String>, date: NaiveDate, fill: f64) -> Self {
        Self {
            location: location.into(),
            date,
            values: [fill; Field::COUNT],
        }
    }

    /// Create an observation from values in [`Field::ALL`] order
    pub fn from_values(
        location: impl Into<String>,
        date: NaiveDate,
        values: [f64; Field::COUNT],
    ) -> Self {
        Self {
            location: location.into(),
            date,
            values,
        }
    }

    /// Value of a field
    pub fn get(&self, field: Field) -> f64 {
        self.values[field.index()]
    }

    /// Set the value of a field
    pub fn set(&mut self, field: Field, value: f64) {
        self.values[field.index()] = value;
    }

    /// Builder-style setter
    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, value);
        self
    }

    /// Whether no field holds a value
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }
}

/// Sort observations by `(date, location)` and reject duplicate keys
pub fn sort_and_check(observations: &mut [Observation]) -> Result<()> {
    observations.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.location.cmp(&b.location))
    });

    if let Some(pair) = observations
        .windows(2)
        .find(|w| w[0].date == w[1].date && w[0].location == w[1].location)
    {
        return Err(FeatureError::DataError(format!(
            "Duplicate observation for ({}, {})",
            pair[0].location, pair[0].date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
        assert!("t2m_mean".parse::<Field>().is_err());
    }

    #[test]
    fn test_get_and_set() {
        let obs = Observation::filled("Chattanooga", day(1), 0.0).with(Field::T2mMax, 31.5);
        assert_eq!(obs.get(Field::T2mMax), 31.5);
        assert_eq!(obs.get(Field::T2mMin), 0.0);
    }

    #[test]
    fn test_sort_and_reject_duplicates() {
        let mut rows = vec![
            Observation::filled("B", day(2), 0.0),
            Observation::filled("A", day(2), 0.0),
            Observation::filled("B", day(1), 0.0),
        ];
        sort_and_check(&mut rows).unwrap();
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[1].location, "A");

        rows.push(Observation::filled("A", day(2), 1.0));
        assert!(sort_and_check(&mut rows).is_err());
    }
}
