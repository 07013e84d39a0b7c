//! Roster: the immutable domain model of one planning run.
//!
//! Bundles the workers, the horizon and the staffing rules (quotas, shift
//! timing, hour budget, rest hours). The constraint builder, objective
//! builder, greedy assigner and audit all read from the same roster,
//! so several rosters can be evaluated side by side in one process.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Day, Horizon, ShiftCatalog, ShiftType, Worker};
use crate::error::{PlanError, PlanResult};
use crate::validation::validate_roster;

/// Required number of workers per shift type and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    /// DayShift holders per regular day.
    pub day: u32,
    /// NightShift holders per regular day.
    pub night: u32,
    /// LateShift holders per regular day.
    pub late: u32,
    /// HolidayShift holders per holiday.
    pub holiday: u32,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            day: 6,
            night: 1,
            late: 0,
            holiday: 0,
        }
    }
}

impl Quotas {
    /// Creates quotas for day and night shifts only.
    pub fn new(day: u32, night: u32) -> Self {
        Self {
            day,
            night,
            late: 0,
            holiday: 0,
        }
    }

    /// Sets the late shift quota.
    pub fn with_late(mut self, late: u32) -> Self {
        self.late = late;
        self
    }

    /// Sets the holiday shift quota.
    pub fn with_holiday(mut self, holiday: u32) -> Self {
        self.holiday = holiday;
        self
    }

    /// Quota of a shift type.
    #[inline]
    pub fn get(&self, shift: ShiftType) -> u32 {
        match shift {
            ShiftType::Day => self.day,
            ShiftType::Night => self.night,
            ShiftType::Late => self.late,
            ShiftType::Holiday => self.holiday,
        }
    }

    /// Workers needed on a regular day.
    #[inline]
    pub fn regular_total(&self) -> u32 {
        self.day + self.night + self.late
    }
}

/// Staffing rules shared by all workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRules {
    /// Coverage quotas.
    pub quotas: Quotas,
    /// Shift durations and start hours.
    pub shifts: ShiftCatalog,
    /// Target hours per worker over the horizon.
    pub monthly_hour_budget: i64,
    /// Minimum rest between consecutive shifts (hours).
    pub min_rest_hours: i64,
}

impl Default for StaffingRules {
    fn default() -> Self {
        Self {
            quotas: Quotas::default(),
            shifts: ShiftCatalog::default(),
            monthly_hour_budget: 160,
            min_rest_hours: 11,
        }
    }
}

impl StaffingRules {
    /// Default rules: quotas 6 day / 1 night, 160 h budget, 11 h rest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the monthly budget from weekly contract hours (4 weeks).
    pub fn from_weekly_hours(weekly_hours: i64) -> Self {
        Self {
            monthly_hour_budget: weekly_hours * 4,
            ..Self::default()
        }
    }

    /// Sets the quotas.
    pub fn with_quotas(mut self, quotas: Quotas) -> Self {
        self.quotas = quotas;
        self
    }

    /// Sets the shift catalog.
    pub fn with_shifts(mut self, shifts: ShiftCatalog) -> Self {
        self.shifts = shifts;
        self
    }

    /// Sets the monthly hour budget.
    pub fn with_budget(mut self, hours: i64) -> Self {
        self.monthly_hour_budget = hours;
        self
    }

    /// Sets the minimum rest hours.
    pub fn with_min_rest(mut self, hours: i64) -> Self {
        self.min_rest_hours = hours;
        self
    }

    /// Shift pairs (type on day d, type on day d+1) a worker may not hold.
    ///
    /// Night→Day and Day→Night are always forbidden. Any other pair is
    /// forbidden when the rest between them is below `min_rest_hours`.
    pub fn rest_conflicts(&self) -> Vec<(ShiftType, ShiftType)> {
        let mut pairs = Vec::new();
        for earlier in ShiftType::ALL {
            for later in ShiftType::ALL {
                let fixed = matches!(
                    (earlier, later),
                    (ShiftType::Night, ShiftType::Day) | (ShiftType::Day, ShiftType::Night)
                );
                if fixed || self.shifts.rest_between(earlier, later) < self.min_rest_hours {
                    pairs.push((earlier, later));
                }
            }
        }
        pairs
    }
}

/// Immutable description of one planning run.
///
/// Construct through [`Roster::new`] (or [`crate::config::PlanConfig`]) so the
/// validation checks always run.
#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    workers: Vec<Worker>,
    horizon: Horizon,
    rules: StaffingRules,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    rest_conflicts: Vec<(ShiftType, ShiftType)>,
}

impl Roster {
    /// Creates a roster after validating it.
    ///
    /// # Errors
    /// `PlanError::Configuration` for an empty roster or horizon, duplicate
    /// worker ids, quotas exceeding the worker count, invalid shift timing
    /// or a negative budget.
    pub fn new(horizon: Horizon, workers: Vec<Worker>, rules: StaffingRules) -> PlanResult<Self> {
        validate_roster(&horizon, &workers, &rules).map_err(PlanError::Configuration)?;

        let index = workers
            .iter()
            .enumerate()
            .map(|(i, w)| (w.id.clone(), i))
            .collect();
        let rest_conflicts = rules.rest_conflicts();

        Ok(Self {
            workers,
            horizon,
            rules,
            index,
            rest_conflicts,
        })
    }

    /// Workers in roster order.
    #[inline]
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Number of workers.
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Position of a worker id in roster order.
    pub fn worker_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Days of the horizon.
    #[inline]
    pub fn days(&self) -> &[Day] {
        self.horizon.days()
    }

    /// The planning horizon.
    #[inline]
    pub fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    /// All shift types.
    #[inline]
    pub fn shift_types(&self) -> &'static [ShiftType] {
        &ShiftType::ALL
    }

    /// Staffing rules.
    #[inline]
    pub fn rules(&self) -> &StaffingRules {
        &self.rules
    }

    /// Whether worker `worker` (roster index) is absent on `date`.
    pub fn is_unavailable(&self, worker: usize, date: NaiveDate) -> bool {
        self.workers
            .get(worker)
            .is_some_and(|w| w.is_unavailable(date))
    }

    /// Preferred shift type of worker `worker`.
    pub fn preference(&self, worker: usize) -> Option<ShiftType> {
        self.workers.get(worker).and_then(|w| w.preference)
    }

    /// Whether `date` is a holiday within the horizon.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.horizon.is_holiday(date)
    }

    /// Coverage quota of a shift type.
    #[inline]
    pub fn quota(&self, shift: ShiftType) -> u32 {
        self.rules.quotas.get(shift)
    }

    /// Duration of a shift type in hours.
    #[inline]
    pub fn shift_hours(&self, shift: ShiftType) -> i64 {
        self.rules.shifts.hours(shift)
    }

    /// Target hours per worker.
    #[inline]
    pub fn monthly_hour_budget(&self) -> i64 {
        self.rules.monthly_hour_budget
    }

    /// Forbidden (day d, day d+1) shift pairs.
    #[inline]
    pub fn rest_conflicts(&self) -> &[(ShiftType, ShiftType)] {
        &self.rest_conflicts
    }

    /// Whether holding `earlier` on d and `later` on d+1 breaks the rest rule.
    pub fn violates_rest(&self, earlier: ShiftType, later: ShiftType) -> bool {
        self.rest_conflicts.contains(&(earlier, later))
    }

    /// Allowed number of night shifts per worker as `(lo, hi)`.
    ///
    /// `lo = quota(Night) · working days / workers` (rounded down) and
    /// `hi = lo + 1`. `None` when no night shift is staffed.
    pub fn night_range(&self) -> Option<(i64, i64)> {
        let quota = self.quota(ShiftType::Night);
        if quota == 0 || self.workers.is_empty() {
            return None;
        }
        let slots = i64::from(quota) * self.horizon.working_day_count() as i64;
        let lo = slots / self.workers.len() as i64;
        Some((lo, lo + 1))
    }

    /// Shift types that must be staffed on `day` (quota > 0).
    pub fn staffed_shifts(&self, day: &Day) -> Vec<ShiftType> {
        if day.is_holiday {
            if self.quota(ShiftType::Holiday) > 0 {
                vec![ShiftType::Holiday]
            } else {
                Vec::new()
            }
        } else {
            ShiftType::REGULAR
                .into_iter()
                .filter(|s| self.quota(*s) > 0)
                .collect()
        }
    }
}
