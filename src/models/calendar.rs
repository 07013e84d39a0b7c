//! Planning horizon and holiday calendar.
//!
//! The horizon is a run of consecutive calendar dates, usually one month.
//! Each date is a [`Day`] carrying its position in the horizon and whether
//! it is a public holiday.
//!
//! # Holidays
//! Holidays outside the horizon are ignored, so a yearly holiday list can
//! be passed for any month.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A date within the planning horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Day {
    /// Position within the horizon (0-based).
    pub index: usize,
    /// Calendar date.
    pub date: NaiveDate,
    /// Whether the date is a public holiday.
    pub is_holiday: bool,
}

/// A run of consecutive dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    days: Vec<Day>,
}

impl Horizon {
    /// Creates a horizon of `length` consecutive days starting at `start`.
    ///
    /// Stops early if the calendar overflows.
    pub fn new(start: NaiveDate, length: usize) -> Self {
        let days = (0..length)
            .map_while(|i| {
                start.checked_add_days(Days::new(i as u64)).map(|date| Day {
                    index: i,
                    date,
                    is_holiday: false,
                })
            })
            .collect();
        Self { days }
    }

    /// Creates a horizon covering a full calendar month.
    ///
    /// Returns `None` for an invalid year/month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let length = (next - first).num_days() as usize;
        Some(Self::new(first, length))
    }

    /// Flags a date as holiday. Dates outside the horizon are ignored.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        if let Some(index) = self.index_of(date) {
            self.days[index].is_holiday = true;
        }
        self
    }

    /// Flags several dates as holidays.
    pub fn with_holidays(self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        dates.into_iter().fold(self, |h, date| h.with_holiday(date))
    }

    /// All days in order.
    #[inline]
    pub fn days(&self) -> &[Day] {
        &self.days
    }

    /// Number of days.
    #[inline]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Whether the horizon has no days.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// First date, if any.
    pub fn start(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    /// Last date, if any.
    pub fn end(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }

    /// Position of `date` within the horizon.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let start = self.start()?;
        let offset = (date - start).num_days();
        if offset < 0 || offset as usize >= self.days.len() {
            return None;
        }
        Some(offset as usize)
    }

    /// Day record for `date`.
    pub fn day(&self, date: NaiveDate) -> Option<&Day> {
        self.index_of(date).map(|i| &self.days[i])
    }

    /// Whether `date` lies within the horizon.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of(date).is_some()
    }

    /// Whether `date` is a holiday within the horizon.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.day(date).is_some_and(|d| d.is_holiday)
    }

    /// Holiday dates within the horizon.
    pub fn holidays(&self) -> BTreeSet<NaiveDate> {
        self.days
            .iter()
            .filter(|d| d.is_holiday)
            .map(|d| d.date)
            .collect()
    }

    /// Number of non-holiday days.
    pub fn working_day_count(&self) -> usize {
        self.days.iter().filter(|d| !d.is_holiday).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(Horizon::month(2025, 1).unwrap().len(), 31);
        assert_eq!(Horizon::month(2025, 2).unwrap().len(), 28);
        assert_eq!(Horizon::month(2024, 2).unwrap().len(), 29);
        assert_eq!(Horizon::month(2025, 12).unwrap().len(), 31);
        assert!(Horizon::month(2025, 13).is_none());
    }

    #[test]
    fn test_days_are_consecutive() {
        let h = Horizon::new(d(1, 30), 4);
        let dates: Vec<_> = h.days().iter().map(|x| x.date).collect();
        assert_eq!(dates, vec![d(1, 30), d(1, 31), d(2, 1), d(2, 2)]);
        assert_eq!(h.days()[3].index, 3);
        assert_eq!(h.end(), Some(d(2, 2)));
    }

    #[test]
    fn test_holidays_outside_horizon_ignored() {
        let h = Horizon::month(2025, 1)
            .unwrap()
            .with_holidays([d(1, 1), d(12, 25)]);
        assert!(h.is_holiday(d(1, 1)));
        assert!(!h.is_holiday(d(12, 25)));
        assert_eq!(h.holidays().len(), 1);
        assert_eq!(h.working_day_count(), 30);
    }

    #[test]
    fn test_index_of() {
        let h = Horizon::month(2025, 1).unwrap();
        assert_eq!(h.index_of(d(1, 1)), Some(0));
        assert_eq!(h.index_of(d(1, 31)), Some(30));
        assert_eq!(h.index_of(d(2, 1)), None);
        assert!(!h.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
    }

    #[test]
    fn test_empty_horizon() {
        let h = Horizon::new(d(1, 1), 0);
        assert!(h.is_empty());
        assert_eq!(h.start(), None);
        assert_eq!(h.index_of(d(1, 1)), None);
    }
}
