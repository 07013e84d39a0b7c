//! Workload metrics.
//!
//! Derives per-worker hour totals from a completed schedule.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total hours | Σ shift durations |
//! | Overtime | max(0, total − budget) |
//! | Deviation | total − budget |
//! | Hour spread | max total − min total |
//! | Fairness | Σ (total − budget)² |
//!
//! # Reference
//! Burke et al. (2004), "The State of the Art of Nurse Rostering", §3.4

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Roster, Schedule, ShiftType};

/// Hours and shift counts of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSummary {
    pub worker_id: String,
    /// Σ shift durations (hours).
    pub total_hours: i64,
    /// Hours above the monthly budget.
    pub overtime_hours: i64,
    /// Number of shifts per type.
    pub shift_counts: BTreeMap<ShiftType, u32>,
    /// Days with any shift.
    pub working_days: u32,
}

impl WorkloadSummary {
    /// Shifts of one type.
    pub fn count(&self, shift: ShiftType) -> u32 {
        self.shift_counts.get(&shift).copied().unwrap_or(0)
    }
}

/// Workload of every roster worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadReport {
    /// Monthly hour budget the summaries were measured against.
    pub budget: i64,
    /// One summary per worker, in roster order.
    pub summaries: Vec<WorkloadSummary>,
}

impl WorkloadReport {
    /// Computes workloads of `schedule` under the roster's shift timing.
    ///
    /// Schedule entries of workers outside the roster are ignored.
    pub fn calculate(roster: &Roster, schedule: &Schedule) -> Self {
        let budget = roster.monthly_hour_budget();
        let summaries = roster
            .workers()
            .iter()
            .map(|worker| {
                let shifts = schedule.shifts_for(&worker.id);
                let mut shift_counts = BTreeMap::new();
                let mut total_hours = 0;
                for s in shifts {
                    *shift_counts.entry(s.shift).or_insert(0) += 1;
                    total_hours += roster.shift_hours(s.shift);
                }
                let mut dates: Vec<_> = shifts.iter().map(|s| s.date).collect();
                dates.dedup();

                WorkloadSummary {
                    worker_id: worker.id.clone(),
                    total_hours,
                    overtime_hours: (total_hours - budget).max(0),
                    shift_counts,
                    working_days: dates.len() as u32,
                }
            })
            .collect();

        Self { budget, summaries }
    }

    /// Summary of one worker.
    pub fn summary(&self, worker_id: &str) -> Option<&WorkloadSummary> {
        self.summaries.iter().find(|s| s.worker_id == worker_id)
    }

    /// Σ overtime over all workers.
    pub fn total_overtime(&self) -> i64 {
        self.summaries.iter().map(|s| s.overtime_hours).sum()
    }

    /// Σ (hours − budget)².
    pub fn fairness(&self) -> i64 {
        self.summaries
            .iter()
            .map(|s| (s.total_hours - self.budget).pow(2))
            .sum()
    }

    /// Difference between the busiest and the least busy worker.
    pub fn hour_spread(&self) -> i64 {
        let max = self.summaries.iter().map(|s| s.total_hours).max();
        let min = self.summaries.iter().map(|s| s.total_hours).min();
        match (max, min) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }

    /// Workers above a legal hour ceiling.
    ///
    /// The usual ceiling is four times the weekly contract hours.
    pub fn exceeding(&self, ceiling: i64) -> Vec<&WorkloadSummary> {
        self.summaries
            .iter()
            .filter(|s| s.total_hours > ceiling)
            .collect()
    }
}
