//! Roster → 0-1 model translation.
//!
//! One boolean per (worker, day, shift type), created only for shift types
//! that are staffed that day. Constraint families:
//!
//! | Family | Row |
//! |--------|-----|
//! | Coverage | Σ_w x[w,d,s] = quota(s) |
//! | Exclusivity | Σ_s x[w,d,s] ≤ 1 |
//! | Rest | x[w,d,a] + x[w,d+1,b] ≤ 1 for each forbidden (a, b) |
//! | Availability | x[w,d,s] fixed to 0 on unavailable dates |
//! | NightBalance | lo ≤ Σ_d x[w,d,Night] ≤ lo + 1 |
//!
//! # Reference
//! Burke et al. (2004), "The State of the Art of Nurse Rostering"

use std::collections::HashMap;

use tracing::debug;

use super::model::{ConstraintFamily, LinearExpr, Model, Relation, VarId};
use super::objective::ObjectiveBuilder;
use crate::error::{PlanError, PlanResult};
use crate::models::{Roster, ShiftType};
use crate::validation::{ConfigIssue, ConfigIssueKind};

/// Shift types of a regular day in variable order. Night comes first so
/// night coverage is branched on first.
const REGULAR_ORDER: [ShiftType; 3] = [ShiftType::Night, ShiftType::Day, ShiftType::Late];

/// The (worker, day, shift) behind a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    /// Roster index of the worker.
    pub worker: usize,
    /// Horizon index of the day.
    pub day: usize,
    pub shift: ShiftType,
}

/// Mapping between decision variables and roster cells.
#[derive(Debug, Clone, Default)]
pub struct DecisionGrid {
    cells: Vec<GridCell>,
    index: HashMap<(usize, usize, ShiftType), VarId>,
}

impl DecisionGrid {
    fn insert(&mut self, var: VarId, cell: GridCell) {
        debug_assert_eq!(var.index(), self.cells.len());
        self.cells.push(cell);
        self.index.insert((cell.worker, cell.day, cell.shift), var);
    }

    /// Variable of a cell, if the shift is staffed that day.
    pub fn var(&self, worker: usize, day: usize, shift: ShiftType) -> Option<VarId> {
        self.index.get(&(worker, day, shift)).copied()
    }

    /// Cell of a variable.
    pub fn cell(&self, var: VarId) -> Option<&GridCell> {
        self.cells.get(var.index())
    }

    /// Variables of one worker on one day.
    pub fn day_vars(&self, worker: usize, day: usize) -> Vec<VarId> {
        ShiftType::ALL
            .iter()
            .filter_map(|&s| self.var(worker, day, s))
            .collect()
    }

    /// All (variable, cell) pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &GridCell)> {
        self.cells.iter().enumerate().map(|(i, c)| (VarId(i), c))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A roster model ready to solve.
#[derive(Debug, Clone)]
pub struct CpProblem {
    pub model: Model,
    pub grid: DecisionGrid,
}

/// Builds a [`CpProblem`] from a roster.
///
/// # Example
/// ```no_run
/// use u_roster::cp::{BranchAndBound, RosterCpBuilder, Solver, SolverConfig};
/// use u_roster::models::{Horizon, Roster, StaffingRules, Worker};
///
/// let horizon = Horizon::month(2025, 1).unwrap();
/// let workers = (1..=11).map(|i| Worker::new(format!("W{i}"))).collect();
/// let roster = Roster::new(horizon, workers, StaffingRules::new()).unwrap();
/// let problem = RosterCpBuilder::new(&roster).build().unwrap();
/// let solution = BranchAndBound::new().solve(&problem.model, &SolverConfig::default());
/// ```
pub struct RosterCpBuilder<'a> {
    roster: &'a Roster,
    objective: ObjectiveBuilder,
}

impl<'a> RosterCpBuilder<'a> {
    /// Creates a builder with the default objective.
    pub fn new(roster: &'a Roster) -> Self {
        Self {
            roster,
            objective: ObjectiveBuilder::default(),
        }
    }

    /// Sets the objective builder.
    pub fn with_objective(mut self, objective: ObjectiveBuilder) -> Self {
        self.objective = objective;
        self
    }

    /// Builds variables, constraints and objective.
    ///
    /// # Errors
    /// `PlanError::Configuration` if a quota exceeds the number of workers.
    pub fn build(&self) -> PlanResult<CpProblem> {
        let roster = self.roster;
        let mut model = Model::new("roster");
        let mut grid = DecisionGrid::default();
        let workers = roster.worker_count();

        for day in roster.days() {
            let shifts: &[ShiftType] = if day.is_holiday {
                &[ShiftType::Holiday]
            } else {
                &REGULAR_ORDER
            };
            for &shift in shifts.iter().filter(|s| roster.quota(**s) > 0) {
                for worker in 0..workers {
                    let var = model.new_var();
                    grid.insert(
                        var,
                        GridCell {
                            worker,
                            day: day.index,
                            shift,
                        },
                    );
                }
            }
        }

        self.add_coverage(&mut model, &grid)?;
        self.add_exclusivity_and_availability(&mut model, &grid);
        self.add_rest(&mut model, &grid);
        self.add_night_balance(&mut model, &grid);
        model.set_objective(self.objective.build(roster, &grid));

        debug!(
            vars = model.var_count(),
            constraints = model.constraint_count(),
            fixings = model.fixings().len(),
            "roster model built"
        );
        Ok(CpProblem { model, grid })
    }

    fn add_coverage(&self, model: &mut Model, grid: &DecisionGrid) -> PlanResult<()> {
        let roster = self.roster;
        for day in roster.days() {
            let shifts: &[ShiftType] = if day.is_holiday {
                &[ShiftType::Holiday]
            } else {
                &REGULAR_ORDER
            };
            for &shift in shifts {
                let vars: Vec<VarId> = (0..roster.worker_count())
                    .filter_map(|w| grid.var(w, day.index, shift))
                    .collect();
                if vars.is_empty() {
                    continue;
                }
                let quota = roster.quota(shift);
                if quota as usize > vars.len() {
                    return Err(PlanError::config(ConfigIssue::new(
                        ConfigIssueKind::QuotaExceedsWorkers,
                        format!("{shift} quota {quota} exceeds {} workers", vars.len()),
                    )));
                }
                model.add_constraint(
                    LinearExpr::sum(vars),
                    Relation::Equal,
                    i64::from(quota),
                    ConstraintFamily::Coverage,
                    format!("coverage {shift} on {}", day.date),
                );
            }
        }
        Ok(())
    }

    fn add_exclusivity_and_availability(&self, model: &mut Model, grid: &DecisionGrid) {
        let roster = self.roster;
        for (w, worker) in roster.workers().iter().enumerate() {
            for day in roster.days() {
                let vars = grid.day_vars(w, day.index);
                if vars.len() > 1 {
                    model.add_constraint(
                        LinearExpr::sum(vars.iter().copied()),
                        Relation::LessEq,
                        1,
                        ConstraintFamily::Exclusivity,
                        format!("one shift for {} on {}", worker.id, day.date),
                    );
                }
                if roster.is_unavailable(w, day.date) {
                    for var in vars {
                        model.fix(
                            var,
                            false,
                            ConstraintFamily::Availability,
                            format!("{} unavailable on {}", worker.id, day.date),
                        );
                    }
                }
            }
        }
    }

    fn add_rest(&self, model: &mut Model, grid: &DecisionGrid) {
        let roster = self.roster;
        let days = roster.days();
        for (w, worker) in roster.workers().iter().enumerate() {
            for pair in days.windows(2) {
                let (today, tomorrow) = (pair[0], pair[1]);
                for &(earlier, later) in roster.rest_conflicts() {
                    let (Some(a), Some(b)) = (
                        grid.var(w, today.index, earlier),
                        grid.var(w, tomorrow.index, later),
                    ) else {
                        continue;
                    };
                    model.add_constraint(
                        LinearExpr::sum([a, b]),
                        Relation::LessEq,
                        1,
                        ConstraintFamily::Rest,
                        format!(
                            "rest for {}: {earlier} on {} then {later}",
                            worker.id, today.date
                        ),
                    );
                }
            }
        }
    }

    fn add_night_balance(&self, model: &mut Model, grid: &DecisionGrid) {
        let roster = self.roster;
        let Some((lo, hi)) = roster.night_range() else {
            return;
        };

        for (w, worker) in roster.workers().iter().enumerate() {
            let nights = LinearExpr::sum(
                roster
                    .days()
                    .iter()
                    .filter_map(|d| grid.var(w, d.index, ShiftType::Night)),
            );
            if lo > 0 {
                model.add_constraint(
                    nights.clone(),
                    Relation::GreaterEq,
                    lo,
                    ConstraintFamily::NightBalance,
                    format!("at least {lo} nights for {}", worker.id),
                );
            }
            model.add_constraint(
                nights,
                Relation::LessEq,
                hi,
                ConstraintFamily::NightBalance,
                format!("at most {hi} nights for {}", worker.id),
            );
        }
    }
}
