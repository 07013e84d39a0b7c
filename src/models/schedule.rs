//! Schedule (solution) model.
//!
//! A schedule maps every worker to the shifts it holds, ordered by date.
//! It is the artifact handed to reporting and validation collaborators.
//! Rule breaches found by the audit are described by [`Violation`]s.
//!
//! # Reference
//! Ernst et al. (2004), "Staff scheduling and rostering: A review of
//! applications, methods and models"

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ShiftCatalog, ShiftType};

/// One shift held by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShiftAssignment {
    /// Day the shift belongs to.
    pub date: NaiveDate,
    /// Shift type held that day.
    pub shift: ShiftType,
}

impl ShiftAssignment {
    /// Creates an assignment.
    pub fn new(date: NaiveDate, shift: ShiftType) -> Self {
        Self { date, shift }
    }
}

/// Shifts of a single worker, ordered by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerShifts {
    /// Worker identifier.
    pub worker_id: String,
    /// Assigned shifts, ascending by date.
    pub shifts: Vec<ShiftAssignment>,
}

/// A complete roster result: worker → ordered shift list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// One entry per worker, in roster order.
    pub entries: Vec<WorkerShifts>,
}

/// A breach of a hard rostering rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Affected worker, when the breach concerns one worker.
    pub worker_id: Option<String>,
    /// Day of the breach.
    pub date: NaiveDate,
    /// Shift type involved, if any.
    pub shift: Option<ShiftType>,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of rule breaches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// Fewer holders than the quota.
    CoverageShortfall,
    /// More holders than the quota.
    CoverageExcess,
    /// Two shift types on the same day.
    DoubleBooking,
    /// Incompatible shifts on consecutive days.
    RestViolation,
    /// Assigned on an unavailable date.
    Unavailable,
    /// Assigned on a date outside the horizon, or an unknown worker.
    OutsideRoster,
    /// Night shift count outside the balanced range.
    NightImbalance,
}

impl Violation {
    /// Coverage mismatch for a (date, shift) pair.
    pub fn coverage(date: NaiveDate, shift: ShiftType, required: u32, actual: usize) -> Self {
        let (violation_type, severity) = if (actual as u32) < required {
            (ViolationType::CoverageShortfall, 90)
        } else {
            (ViolationType::CoverageExcess, 40)
        };
        Self {
            violation_type,
            worker_id: None,
            date,
            shift: Some(shift),
            message: format!("{date}: {actual} {shift} holders, {required} required"),
            severity,
        }
    }

    /// A worker holds several shifts on one day.
    pub fn double_booking(worker_id: impl Into<String>, date: NaiveDate) -> Self {
        let worker_id = worker_id.into();
        Self {
            violation_type: ViolationType::DoubleBooking,
            message: format!("{worker_id} holds more than one shift on {date}"),
            worker_id: Some(worker_id),
            date,
            shift: None,
            severity: 100,
        }
    }

    /// Incompatible shifts on `date` and the following day.
    pub fn rest(
        worker_id: impl Into<String>,
        date: NaiveDate,
        earlier: ShiftType,
        later: ShiftType,
    ) -> Self {
        let worker_id = worker_id.into();
        Self {
            violation_type: ViolationType::RestViolation,
            message: format!("{worker_id}: {earlier} on {date} followed by {later}"),
            worker_id: Some(worker_id),
            date,
            shift: Some(later),
            severity: 95,
        }
    }

    /// Assigned while unavailable.
    pub fn unavailable(worker_id: impl Into<String>, date: NaiveDate, shift: ShiftType) -> Self {
        let worker_id = worker_id.into();
        Self {
            violation_type: ViolationType::Unavailable,
            message: format!("{worker_id} is unavailable on {date} but holds {shift}"),
            worker_id: Some(worker_id),
            date,
            shift: Some(shift),
            severity: 95,
        }
    }

    /// Night shift count of a worker outside `lo..=hi`.
    ///
    /// `date` is the first day of the horizon the count covers.
    pub fn night_balance(
        worker_id: impl Into<String>,
        date: NaiveDate,
        nights: i64,
        lo: i64,
        hi: i64,
    ) -> Self {
        let worker_id = worker_id.into();
        Self {
            violation_type: ViolationType::NightImbalance,
            message: format!("{worker_id} holds {nights} night shifts, allowed {lo}..={hi}"),
            worker_id: Some(worker_id),
            date,
            shift: Some(ShiftType::Night),
            severity: 60,
        }
    }

    /// Assignment outside the roster (unknown worker or date).
    pub fn outside_roster(worker_id: impl Into<String>, date: NaiveDate) -> Self {
        let worker_id = worker_id.into();
        Self {
            violation_type: ViolationType::OutsideRoster,
            message: format!("{worker_id} on {date} is outside the roster"),
            worker_id: Some(worker_id),
            date,
            shift: None,
            severity: 100,
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schedule with an empty shift list for each worker.
    pub fn for_workers<I, S>(worker_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: worker_ids
                .into_iter()
                .map(|id| WorkerShifts {
                    worker_id: id.into(),
                    shifts: Vec::new(),
                })
                .collect(),
        }
    }

    /// Adds a shift, keeping the worker's list ordered by date.
    ///
    /// Unknown workers get a new entry at the end.
    pub fn add_assignment(&mut self, worker_id: &str, date: NaiveDate, shift: ShiftType) {
        let assignment = ShiftAssignment::new(date, shift);
        let entry = match self.entries.iter().position(|e| e.worker_id == worker_id) {
            Some(i) => &mut self.entries[i],
            None => {
                self.entries.push(WorkerShifts {
                    worker_id: worker_id.to_string(),
                    shifts: Vec::new(),
                });
                let last = self.entries.len() - 1;
                &mut self.entries[last]
            }
        };
        let pos = entry.shifts.partition_point(|s| *s <= assignment);
        entry.shifts.insert(pos, assignment);
    }

    /// Removes the shift a worker holds on `date`, returning its type.
    pub(crate) fn remove_assignment(&mut self, worker_id: &str, date: NaiveDate) -> Option<ShiftType> {
        let entry = self.entries.iter_mut().find(|e| e.worker_id == worker_id)?;
        let pos = entry.shifts.iter().position(|s| s.date == date)?;
        Some(entry.shifts.remove(pos).shift)
    }

    /// Worker ids in schedule order.
    pub fn worker_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.worker_id.as_str())
    }

    /// Shifts held by a worker (empty if unknown).
    pub fn shifts_for(&self, worker_id: &str) -> &[ShiftAssignment] {
        self.entries
            .iter()
            .find(|e| e.worker_id == worker_id)
            .map(|e| e.shifts.as_slice())
            .unwrap_or(&[])
    }

    /// Shift a worker holds on `date`, if any.
    pub fn shift_on(&self, worker_id: &str, date: NaiveDate) -> Option<ShiftType> {
        self.shifts_for(worker_id)
            .iter()
            .find(|s| s.date == date)
            .map(|s| s.shift)
    }

    /// Workers holding `shift` on `date`.
    pub fn holders(&self, date: NaiveDate, shift: ShiftType) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| {
                e.shifts
                    .iter()
                    .any(|s| s.date == date && s.shift == shift)
            })
            .map(|e| e.worker_id.as_str())
            .collect()
    }

    /// Number of workers holding `shift` on `date`.
    pub fn count_on(&self, date: NaiveDate, shift: ShiftType) -> usize {
        self.entries
            .iter()
            .map(|e| {
                e.shifts
                    .iter()
                    .filter(|s| s.date == date && s.shift == shift)
                    .count()
            })
            .sum()
    }

    /// Total hours of a worker under the given shift timing.
    pub fn total_hours(&self, worker_id: &str, catalog: &ShiftCatalog) -> i64 {
        self.shifts_for(worker_id)
            .iter()
            .map(|s| catalog.hours(s.shift))
            .sum()
    }

    /// Number of assignments across all workers.
    pub fn assignment_count(&self) -> usize {
        self.entries.iter().map(|e| e.shifts.len()).sum()
    }

    /// Whether no shift is assigned.
    pub fn is_empty(&self) -> bool {
        self.assignment_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::for_workers(["A", "B"]);
        s.add_assignment("A", d(3), ShiftType::Day);
        s.add_assignment("A", d(1), ShiftType::Night);
        s.add_assignment("B", d(1), ShiftType::Day);
        s
    }

    #[test]
    fn test_assignments_sorted_by_date() {
        let s = sample_schedule();
        let a = s.shifts_for("A");
        assert_eq!(a.len(), 2);
        assert_eq!(a[0], ShiftAssignment::new(d(1), ShiftType::Night));
        assert_eq!(a[1], ShiftAssignment::new(d(3), ShiftType::Day));
    }

    #[test]
    fn test_queries() {
        let s = sample_schedule();
        assert_eq!(s.shift_on("A", d(1)), Some(ShiftType::Night));
        assert_eq!(s.shift_on("B", d(3)), None);
        assert_eq!(s.count_on(d(1), ShiftType::Day), 1);
        assert_eq!(s.holders(d(1), ShiftType::Night), vec!["A"]);
        assert_eq!(s.assignment_count(), 3);
        assert_eq!(s.worker_ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(s.shifts_for("Z").is_empty());
    }

    #[test]
    fn test_total_hours() {
        let s = sample_schedule();
        let catalog = ShiftCatalog::default();
        assert_eq!(s.total_hours("A", &catalog), 24);
        assert_eq!(s.total_hours("B", &catalog), 8);
    }

    #[test]
    fn test_add_unknown_worker_and_remove() {
        let mut s = sample_schedule();
        s.add_assignment("C", d(2), ShiftType::Late);
        assert_eq!(s.entries.len(), 3);
        assert_eq!(s.remove_assignment("C", d(2)), Some(ShiftType::Late));
        assert_eq!(s.remove_assignment("C", d(2)), None);
    }

    #[test]
    fn test_empty_schedule() {
        let s = Schedule::new();
        assert!(s.is_empty());
        assert_eq!(s.assignment_count(), 0);
    }

    #[test]
    fn test_violation_factories() {
        let v = Violation::coverage(d(2), ShiftType::Day, 6, 5);
        assert_eq!(v.violation_type, ViolationType::CoverageShortfall);
        assert!(v.worker_id.is_none());

        let v = Violation::coverage(d(2), ShiftType::Late, 0, 2);
        assert_eq!(v.violation_type, ViolationType::CoverageExcess);

        let v = Violation::rest("A", d(1), ShiftType::Night, ShiftType::Day);
        assert_eq!(v.violation_type, ViolationType::RestViolation);
        assert_eq!(v.worker_id.as_deref(), Some("A"));

        assert_eq!(
            Violation::double_booking("A", d(1)).violation_type,
            ViolationType::DoubleBooking
        );
        assert_eq!(
            Violation::unavailable("A", d(1), ShiftType::Day).violation_type,
            ViolationType::Unavailable
        );
    }

    #[test]
    fn test_schedule_serde_roundtrip() {
        let s = sample_schedule();
        let json = serde_json::to_string(&s).unwrap();
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
