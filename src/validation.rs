//! Input validation and schedule audit.
//!
//! Two kinds of checks live here:
//!
//! - **Configuration checks** ([`validate_roster`]) run before any solving
//!   and collect every problem found, so a user can fix a configuration in
//!   one pass: empty roster or horizon, duplicate or empty worker ids,
//!   quotas exceeding the worker count, invalid shift timing, negative
//!   budget or rest hours, holiday preferences.
//! - **Schedule audit** ([`audit_schedule`]) checks a finished schedule
//!   against every hard rule (coverage, one shift per day, rest,
//!   availability). The exact engine must always pass it; the greedy
//!   assigner reports its shortfalls through it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{
    Horizon, Roster, Schedule, ShiftType, StaffingRules, Violation, Worker,
};

/// A configuration problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigIssue {
    /// Issue category.
    pub kind: ConfigIssueKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of configuration problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigIssueKind {
    /// No workers.
    EmptyRoster,
    /// Horizon has no days.
    EmptyHorizon,
    /// Two workers share an id.
    DuplicateWorker,
    /// A worker id is blank.
    EmptyWorkerId,
    /// A quota is negative or otherwise unusable.
    InvalidQuota,
    /// Quotas need more workers per day than the roster has.
    QuotaExceedsWorkers,
    /// Shift duration or start hour out of range.
    InvalidShift,
    /// Hour budget is negative.
    InvalidBudget,
    /// Rest hours out of range.
    InvalidRestHours,
    /// A shift type name is not recognized.
    UnknownShiftType,
    /// A worker prefers a shift type that cannot be preferred.
    InvalidPreference,
    /// A date or month could not be interpreted.
    InvalidDate,
    /// The configuration text could not be parsed.
    Malformed,
}

impl ConfigIssue {
    /// Creates an issue.
    pub fn new(kind: ConfigIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the static description of a planning run.
///
/// Checks:
/// 1. At least one worker and one day
/// 2. Worker ids are non-empty and unique
/// 3. No worker prefers the holiday shift
/// 4. Daily quotas fit the worker count
/// 5. Every shift lasts 1..=24 hours and starts within 0..24
/// 6. Budget is non-negative, rest hours within 0..=24
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(issues)` with all detected issues.
pub fn validate_roster(
    horizon: &Horizon,
    workers: &[Worker],
    rules: &StaffingRules,
) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if workers.is_empty() {
        issues.push(ConfigIssue::new(
            ConfigIssueKind::EmptyRoster,
            "roster has no workers",
        ));
    }
    if horizon.is_empty() {
        issues.push(ConfigIssue::new(
            ConfigIssueKind::EmptyHorizon,
            "planning horizon has no days",
        ));
    }

    let mut seen = HashSet::new();
    for w in workers {
        if w.id.trim().is_empty() {
            issues.push(ConfigIssue::new(
                ConfigIssueKind::EmptyWorkerId,
                "worker id must not be empty",
            ));
        } else if !seen.insert(w.id.as_str()) {
            issues.push(ConfigIssue::new(
                ConfigIssueKind::DuplicateWorker,
                format!("duplicate worker id: {}", w.id),
            ));
        }
        if let Some(pref) = w.preference {
            if !pref.is_preferable() {
                issues.push(ConfigIssue::new(
                    ConfigIssueKind::InvalidPreference,
                    format!("worker '{}' cannot prefer {pref}", w.id),
                ));
            }
        }
    }

    let quotas = &rules.quotas;
    if !workers.is_empty() {
        let needed = quotas.regular_total() as usize;
        if needed > workers.len() {
            issues.push(ConfigIssue::new(
                ConfigIssueKind::QuotaExceedsWorkers,
                format!(
                    "quotas need {needed} workers per day but the roster has {}",
                    workers.len()
                ),
            ));
        }
        if quotas.holiday as usize > workers.len() {
            issues.push(ConfigIssue::new(
                ConfigIssueKind::QuotaExceedsWorkers,
                format!(
                    "holiday quota {} exceeds the roster size {}",
                    quotas.holiday,
                    workers.len()
                ),
            ));
        }
    }

    for shift in ShiftType::ALL {
        let spec = rules.shifts.spec(shift);
        if !(1..=24).contains(&spec.hours) {
            issues.push(ConfigIssue::new(
                ConfigIssueKind::InvalidShift,
                format!("{shift} lasts {} hours (expected 1..=24)", spec.hours),
            ));
        }
        if !(0..24).contains(&spec.start_hour) {
            issues.push(ConfigIssue::new(
                ConfigIssueKind::InvalidShift,
                format!("{shift} starts at hour {} (expected 0..24)", spec.start_hour),
            ));
        }
    }

    if rules.monthly_hour_budget < 0 {
        issues.push(ConfigIssue::new(
            ConfigIssueKind::InvalidBudget,
            format!("monthly hour budget is negative: {}", rules.monthly_hour_budget),
        ));
    }
    if !(0..=24).contains(&rules.min_rest_hours) {
        issues.push(ConfigIssue::new(
            ConfigIssueKind::InvalidRestHours,
            format!("minimum rest of {} hours is out of range", rules.min_rest_hours),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Checks a schedule against every hard rule of the roster.
///
/// Returns an empty list for a valid schedule. Per-worker breaches come
/// first (in schedule order), then night counts outside the balanced range
/// (in roster order), then coverage mismatches in date order.
pub fn audit_schedule(roster: &Roster, schedule: &Schedule) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut counts: HashMap<(usize, ShiftType), usize> = HashMap::new();

    for entry in &schedule.entries {
        let worker = roster.worker_index(&entry.worker_id);
        let mut previous: Option<(usize, ShiftType)> = None;

        for (i, s) in entry.shifts.iter().enumerate() {
            let day = roster.horizon().index_of(s.date);
            let (Some(w), Some(day)) = (worker, day) else {
                violations.push(Violation::outside_roster(&entry.worker_id, s.date));
                continue;
            };
            *counts.entry((day, s.shift)).or_insert(0) += 1;

            if i > 0 && entry.shifts[i - 1].date == s.date {
                violations.push(Violation::double_booking(&entry.worker_id, s.date));
            }
            if roster.is_unavailable(w, s.date) {
                violations.push(Violation::unavailable(&entry.worker_id, s.date, s.shift));
            }
            if let Some((prev_day, prev_shift)) = previous {
                if prev_day + 1 == day && roster.violates_rest(prev_shift, s.shift) {
                    let prev_date = roster.days()[prev_day].date;
                    violations.push(Violation::rest(
                        &entry.worker_id,
                        prev_date,
                        prev_shift,
                        s.shift,
                    ));
                }
            }
            previous = Some((day, s.shift));
        }
    }

    if let (Some((lo, hi)), Some(first)) = (roster.night_range(), roster.horizon().start()) {
        for worker in roster.workers() {
            let nights = schedule
                .shifts_for(&worker.id)
                .iter()
                .filter(|s| s.shift == ShiftType::Night && roster.horizon().contains(s.date))
                .count() as i64;
            if nights < lo || nights > hi {
                violations.push(Violation::night_balance(&worker.id, first, nights, lo, hi));
            }
        }
    }

    for day in roster.days() {
        for shift in ShiftType::ALL {
            let required = if day.is_holiday == (shift == ShiftType::Holiday) {
                roster.quota(shift)
            } else {
                0
            };
            let actual = counts.get(&(day.index, shift)).copied().unwrap_or(0);
            if actual != required as usize {
                violations.push(Violation::coverage(day.date, shift, required, actual));
            }
        }
    }

    violations
}
