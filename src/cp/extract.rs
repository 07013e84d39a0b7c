//! Solution → [`Schedule`] decoding.

use super::builder::DecisionGrid;
use super::solver::CpSolution;
use crate::error::{PlanError, PlanResult};
use crate::models::{Roster, Schedule, ShiftAssignment, ShiftType, WorkerShifts};

/// Decodes solver values into a schedule, one entry per worker in roster
/// order, shifts ascending by date.
///
/// # Errors
/// `PlanError::InternalInvariant` if the solution does not cover every
/// variable, leaves one unassigned, or gives a worker two shift types on
/// one day.
pub fn extract_schedule(
    roster: &Roster,
    grid: &DecisionGrid,
    solution: &CpSolution,
) -> PlanResult<Schedule> {
    if solution.values.len() != grid.len() {
        return Err(PlanError::InternalInvariant(format!(
            "solution has {} values for {} decisions",
            solution.values.len(),
            grid.len()
        )));
    }

    let days = roster.days();
    let mut taken: Vec<Vec<Option<ShiftType>>> =
        vec![vec![None; days.len()]; roster.worker_count()];

    for (var, cell) in grid.iter() {
        let Some(value) = solution.value(var) else {
            return Err(PlanError::InternalInvariant(format!(
                "decision {} ({} on day {}) is unassigned",
                var.index(),
                cell.shift,
                cell.day
            )));
        };
        if !value {
            continue;
        }
        let slot = &mut taken[cell.worker][cell.day];
        if let Some(existing) = slot {
            return Err(PlanError::InternalInvariant(format!(
                "{} holds {existing} and {} on {}",
                roster.workers()[cell.worker].id,
                cell.shift,
                days[cell.day].date
            )));
        }
        *slot = Some(cell.shift);
    }

    let entries = roster
        .workers()
        .iter()
        .zip(taken)
        .map(|(worker, row)| WorkerShifts {
            worker_id: worker.id.clone(),
            shifts: row
                .into_iter()
                .enumerate()
                .filter_map(|(day, shift)| shift.map(|s| ShiftAssignment::new(days[day].date, s)))
                .collect(),
        })
        .collect();

    Ok(Schedule { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{RosterCpBuilder, SolveStats, SolveStatus};
    use crate::models::{Horizon, Quotas, StaffingRules, Worker};
    use chrono::NaiveDate;

    fn roster() -> Roster {
        let horizon = Horizon::new(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), 2);
        let workers = vec![Worker::new("A"), Worker::new("B")];
        let rules = StaffingRules::new().with_quotas(Quotas::new(1, 1));
        Roster::new(horizon, workers, rules).unwrap()
    }

    fn solution(values: Vec<Option<bool>>) -> CpSolution {
        CpSolution {
            status: SolveStatus::Optimal,
            values,
            objective: None,
            bound: None,
            stats: SolveStats::default(),
        }
    }

    /// All decisions false except the listed (worker, day, shift) cells.
    fn values_for(grid: &DecisionGrid, on: &[(usize, usize, ShiftType)]) -> Vec<Option<bool>> {
        let mut values = vec![Some(false); grid.len()];
        for &(w, d, s) in on {
            if let Some(v) = grid.var(w, d, s) {
                values[v.index()] = Some(true);
            }
        }
        values
    }

    #[test]
    fn test_extract_orders_by_day() {
        let roster = roster();
        let grid = RosterCpBuilder::new(&roster).build().unwrap().grid;
        let values = values_for(
            &grid,
            &[
                (0, 1, ShiftType::Night),
                (0, 0, ShiftType::Night),
                (1, 0, ShiftType::Day),
                (1, 1, ShiftType::Day),
            ],
        );
        let schedule = extract_schedule(&roster, &grid, &solution(values)).unwrap();
        let a = schedule.shifts_for("A");
        assert_eq!(a.len(), 2);
        assert!(a[0].date < a[1].date);
        assert_eq!(schedule.shift_on("B", roster.days()[1].date), Some(ShiftType::Day));
    }

    #[test]
    fn test_double_booking_is_internal_error() {
        let roster = roster();
        let grid = RosterCpBuilder::new(&roster).build().unwrap().grid;
        let values = values_for(&grid, &[(0, 0, ShiftType::Night), (0, 0, ShiftType::Day)]);
        let err = extract_schedule(&roster, &grid, &solution(values)).unwrap_err();
        assert!(matches!(err, PlanError::InternalInvariant(_)));
    }

    #[test]
    fn test_unassigned_is_internal_error() {
        let roster = roster();
        let grid = RosterCpBuilder::new(&roster).build().unwrap().grid;
        let mut values = values_for(&grid, &[]);
        values[0] = None;
        assert!(matches!(
            extract_schedule(&roster, &grid, &solution(values)),
            Err(PlanError::InternalInvariant(_))
        ));
        assert!(matches!(
            extract_schedule(&roster, &grid, &solution(Vec::new())),
            Err(PlanError::InternalInvariant(_))
        ));
    }
}
