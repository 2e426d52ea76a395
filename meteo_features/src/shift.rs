//! Source-row lookup for lagged and forward-shifted values

use crate::config::ShiftMode;
use chrono::{Days, NaiveDate};

/// Index inside `dates` of the row `offset` days (or rows) away from row `i`.
///
/// `dates` is one location's strictly increasing series. Negative offsets
/// look into the past, positive ones into the future.
pub fn shifted_index(dates: &[NaiveDate], i: usize, offset: i64, mode: ShiftMode) -> Option<usize> {
    match mode {
        ShiftMode::Row => {
            let j = i as i64 + offset;
            if j >= 0 && (j as usize) < dates.len() {
                Some(j as usize)
            } else {
                None
            }
        }
        ShiftMode::Calendar => {
            let target = shift_date(*dates.get(i)?, offset)?;
            dates.binary_search(&target).ok()
        }
    }
}

/// `date + offset` days, `None` on overflow
pub fn shift_date(date: NaiveDate, offset: i64) -> Option<NaiveDate> {
    if offset >= 0 {
        date.checked_add_days(Days::new(offset as u64))
    } else {
        date.checked_sub_days(Days::new(offset.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(ds: &[u32]) -> Vec<NaiveDate> {
        ds.iter()
            .map(|&d| NaiveDate::from_ymd_opt(2023, 1, d).unwrap())
            .collect()
    }

    #[test]
    fn test_calendar_shift_respects_gaps() {
        let dates = days(&[1, 2, 4, 5]);
        assert_eq!(shifted_index(&dates, 2, -1, ShiftMode::Calendar), None);
        assert_eq!(shifted_index(&dates, 2, -2, ShiftMode::Calendar), Some(1));
        assert_eq!(shifted_index(&dates, 1, 1, ShiftMode::Calendar), None);
        assert_eq!(shifted_index(&dates, 2, 1, ShiftMode::Calendar), Some(3));
    }

    #[test]
    fn test_row_shift_ignores_gaps() {
        let dates = days(&[1, 2, 4, 5]);
        assert_eq!(shifted_index(&dates, 2, -1, ShiftMode::Row), Some(1));
        assert_eq!(shifted_index(&dates, 0, -1, ShiftMode::Row), None);
        assert_eq!(shifted_index(&dates, 3, 1, ShiftMode::Row), None);
    }
}
