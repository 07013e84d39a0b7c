//! Worker model.
//!
//! A worker is the resource being rostered. Besides its identifier it
//! carries an optional shift preference and the dates on which it cannot
//! work (vacation, sick leave).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ShiftType;

/// A worker that can be assigned to shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    /// Unique worker identifier.
    pub id: String,
    /// Preferred shift type, if any.
    pub preference: Option<ShiftType>,
    /// Dates on which the worker must not be assigned.
    pub unavailable: BTreeSet<NaiveDate>,
}

impl Worker {
    /// Creates a worker without preference or absences.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            preference: None,
            unavailable: BTreeSet::new(),
        }
    }

    /// Sets the preferred shift type.
    pub fn with_preference(mut self, shift: ShiftType) -> Self {
        self.preference = Some(shift);
        self
    }

    /// Marks a date as unavailable.
    pub fn with_unavailable(mut self, date: NaiveDate) -> Self {
        self.unavailable.insert(date);
        self
    }

    /// Marks several dates as unavailable.
    pub fn with_unavailable_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.unavailable.extend(dates);
        self
    }

    /// Whether the worker is absent on `date`.
    #[inline]
    pub fn is_unavailable(&self, date: NaiveDate) -> bool {
        self.unavailable.contains(&date)
    }
}
