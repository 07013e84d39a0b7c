//! Emergency cover for absences after publication.
//!
//! # Algorithm
//!
//! For each absence, in the given order:
//! 1. Remove the absent worker's shift on that date (nothing to do if none).
//! 2. Collect candidates: roster workers that are available, not absent
//!    themselves, free that date, and whose shifts on the neighboring days
//!    respect the rest rules around the vacated shift.
//! 3. Let the [`CoverPolicy`] pick one; the shift is left uncovered when
//!    there is no candidate.
//!
//! The published schedule is never modified; a repaired copy is returned.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::policy::{CoverCandidate, CoverPolicy};
use crate::models::{Roster, Schedule, ShiftType};

/// A worker missing a date after the schedule was published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Absence {
    pub worker_id: String,
    pub date: NaiveDate,
}

impl Absence {
    pub fn new(worker_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            worker_id: worker_id.into(),
            date,
        }
    }
}

/// What happened to one absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverOutcome {
    pub absence: Absence,
    /// Shift the absent worker held, `None` if there was nothing to cover.
    pub shift: Option<ShiftType>,
    /// Worker taking over the shift.
    pub replacement: Option<String>,
}

impl CoverOutcome {
    /// Whether the absence leaves a hole in the schedule.
    pub fn is_uncovered(&self) -> bool {
        self.shift.is_some() && self.replacement.is_none()
    }
}

/// Replaces absent workers in a published schedule.
#[derive(Debug, Clone, Copy)]
pub struct EmergencyCover<'a> {
    roster: &'a Roster,
}

impl<'a> EmergencyCover<'a> {
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    /// Returns the repaired schedule and one outcome per absence.
    pub fn apply<P: CoverPolicy + ?Sized>(
        &self,
        schedule: &Schedule,
        absences: &[Absence],
        policy: &mut P,
    ) -> (Schedule, Vec<CoverOutcome>) {
        let absent: HashSet<(&str, NaiveDate)> = absences
            .iter()
            .map(|a| (a.worker_id.as_str(), a.date))
            .collect();
        let mut repaired = schedule.clone();
        let mut outcomes = Vec::with_capacity(absences.len());

        for absence in absences {
            let shift = repaired.remove_assignment(&absence.worker_id, absence.date);
            let replacement = shift.and_then(|shift| {
                let candidates = self.candidates(&repaired, &absent, absence.date, shift);
                let chosen = policy
                    .select(&candidates)
                    .and_then(|i| candidates.get(i))
                    .map(|c| c.worker_id.clone());
                match &chosen {
                    Some(id) => {
                        repaired.add_assignment(id, absence.date, shift);
                        info!(
                            absent = %absence.worker_id,
                            replacement = %id,
                            date = %absence.date,
                            %shift,
                            policy = policy.name(),
                            "shift covered"
                        );
                    }
                    None => warn!(
                        absent = %absence.worker_id,
                        date = %absence.date,
                        %shift,
                        "no replacement available"
                    ),
                }
                chosen
            });
            outcomes.push(CoverOutcome {
                absence: absence.clone(),
                shift,
                replacement,
            });
        }

        (repaired, outcomes)
    }

    fn candidates(
        &self,
        schedule: &Schedule,
        absent: &HashSet<(&str, NaiveDate)>,
        date: NaiveDate,
        shift: ShiftType,
    ) -> Vec<CoverCandidate> {
        let roster = self.roster;
        let before = date.pred_opt();
        let after = date.succ_opt();

        roster
            .workers()
            .iter()
            .enumerate()
            .filter(|(w, worker)| {
                let id = worker.id.as_str();
                if absent.contains(&(id, date))
                    || roster.is_unavailable(*w, date)
                    || schedule.shift_on(id, date).is_some()
                {
                    return false;
                }
                let prev_ok = before
                    .and_then(|d| schedule.shift_on(id, d))
                    .is_none_or(|p| !roster.violates_rest(p, shift));
                let next_ok = after
                    .and_then(|d| schedule.shift_on(id, d))
                    .is_none_or(|n| !roster.violates_rest(shift, n));
                prev_ok && next_ok
            })
            .map(|(w, worker)| CoverCandidate {
                worker_id: worker.id.clone(),
                worker: w,
                hours: schedule.total_hours(&worker.id, &roster.rules().shifts),
            })
            .collect()
    }
}
