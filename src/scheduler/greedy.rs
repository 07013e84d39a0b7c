//! Greedy day-by-day shift assigner.
//!
//! # Algorithm
//!
//! For each day of the horizon:
//! 1. Holidays: staff `quota(Holiday)` least-loaded available workers with
//!    the holiday shift (nothing when the quota is 0).
//! 2. Otherwise collect workers that are available and did not work a night
//!    shift the day before.
//! 3. Sort them by cumulative hours (ties keep roster order).
//! 4. Take the first `quota(Day) + quota(Night) + quota(Late)`.
//! 5. Give each the preferred shift type, or alternate Day/Night by the
//!    parity of its shift count (Day only when no night is staffed). A type
//!    conflicting with yesterday's shift is switched to the other of
//!    Day/Night when that one is allowed.
//!
//! Coverage is not guaranteed. Gaps show up in the schedule audit.
//!
//! # Complexity
//! O(D · W log W) for D days and W workers.

use tracing::{debug, warn};

use crate::models::{Roster, Schedule, ShiftType};

/// Per-worker running state.
#[derive(Debug, Clone, Copy, Default)]
struct WorkerState {
    hours: i64,
    shifts: usize,
    /// Day index and type of the latest shift.
    last: Option<(usize, ShiftType)>,
}

impl WorkerState {
    fn yesterday(&self, day: usize) -> Option<ShiftType> {
        match self.last {
            Some((d, shift)) if d + 1 == day => Some(shift),
            _ => None,
        }
    }
}

/// Fast heuristic used when exact optimization is not wanted.
///
/// # Example
///
/// ```
/// use u_roster::models::{Horizon, Roster, StaffingRules, Worker};
/// use u_roster::scheduler::GreedyScheduler;
///
/// let horizon = Horizon::month(2025, 1).unwrap();
/// let workers = (1..=11).map(|i| Worker::new(format!("W{i}"))).collect();
/// let roster = Roster::new(horizon, workers, StaffingRules::new()).unwrap();
///
/// let schedule = GreedyScheduler::new(&roster).schedule();
/// assert_eq!(schedule.entries.len(), 11);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GreedyScheduler<'a> {
    roster: &'a Roster,
}

impl<'a> GreedyScheduler<'a> {
    /// Creates a scheduler for a roster.
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    /// Builds a schedule day by day.
    pub fn schedule(&self) -> Schedule {
        let roster = self.roster;
        let mut schedule = Schedule::for_workers(roster.workers().iter().map(|w| w.id.clone()));
        let mut states = vec![WorkerState::default(); roster.worker_count()];

        for day in roster.days() {
            let (needed, holiday) = if day.is_holiday {
                (roster.quota(ShiftType::Holiday) as usize, true)
            } else {
                (roster.rules().quotas.regular_total() as usize, false)
            };
            if needed == 0 {
                continue;
            }

            let mut candidates: Vec<usize> = (0..roster.worker_count())
                .filter(|&w| !roster.is_unavailable(w, day.date))
                .filter(|&w| {
                    let prev = states[w].yesterday(day.index);
                    if holiday {
                        prev.is_none_or(|p| !roster.violates_rest(p, ShiftType::Holiday))
                    } else {
                        prev != Some(ShiftType::Night)
                    }
                })
                .collect();
            candidates.sort_by_key(|&w| states[w].hours);

            if candidates.len() < needed {
                warn!(
                    date = %day.date,
                    available = candidates.len(),
                    needed,
                    "not enough workers available"
                );
            }

            let mut placed = 0;
            for &w in &candidates {
                if placed == needed {
                    break;
                }
                let state = &mut states[w];
                let shift = if holiday {
                    Some(ShiftType::Holiday)
                } else {
                    self.pick_shift(w, state.shifts, state.yesterday(day.index))
                };
                let Some(shift) = shift else { continue };

                schedule.add_assignment(&roster.workers()[w].id, day.date, shift);
                state.hours += roster.shift_hours(shift);
                state.shifts += 1;
                state.last = Some((day.index, shift));
                placed += 1;
            }
            debug!(date = %day.date, placed, needed, "day staffed");
        }

        schedule
    }

    /// Shift type for worker `w` given its shift count and yesterday's shift.
    fn pick_shift(
        &self,
        w: usize,
        shifts_so_far: usize,
        yesterday: Option<ShiftType>,
    ) -> Option<ShiftType> {
        let roster = self.roster;
        let wanted = match roster.preference(w) {
            Some(pref) => pref,
            None if shifts_so_far % 2 == 1 && roster.quota(ShiftType::Night) > 0 => {
                ShiftType::Night
            }
            None => ShiftType::Day,
        };
        let allowed = |s: ShiftType| yesterday.is_none_or(|p| !roster.violates_rest(p, s));

        if allowed(wanted) {
            return Some(wanted);
        }
        let other = match wanted {
            ShiftType::Night => ShiftType::Day,
            _ => ShiftType::Night,
        };
        allowed(other).then_some(other)
    }
}
