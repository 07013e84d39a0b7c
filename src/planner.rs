//! Planning facade.
//!
//! Runs either the exact engine or the greedy assigner on a roster and
//! packages the result with workload summaries, audit findings, warnings
//! and solver statistics.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cp::{
    diagnose, extract_schedule, BranchAndBound, CpSolution, InfeasibilityReport, Model,
    ObjectiveBuilder, RosterCpBuilder, SolveStats, SolveStatus, Solver, SolverConfig,
};
use crate::error::{PlanError, PlanResult};
use crate::models::{Roster, Schedule, Violation};
use crate::scheduler::{GreedyScheduler, WorkloadReport};
use crate::validation::audit_schedule;

/// Which engine produces the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Exact optimization under the given limits.
    Exact(SolverConfig),
    /// Greedy day-by-day assignment.
    Greedy,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Exact(SolverConfig::default())
    }
}

/// Quality of a returned schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    /// Proven optimal for the objective.
    Optimal,
    /// Satisfies every hard rule, optimality not proven.
    Feasible,
    /// Greedy result breaking some hard rules (see violations).
    BestEffort,
}

/// Non-fatal conditions attached to an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanWarning {
    /// The solver hit a limit; the schedule is feasible but maybe not optimal.
    SolverTimeout { nodes: u64, elapsed_ms: u64 },
    /// The greedy schedule breaks hard rules.
    RuleViolations { count: usize },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::SolverTimeout { nodes, elapsed_ms } => write!(
                f,
                "solver stopped after {nodes} nodes ({elapsed_ms} ms); schedule may not be optimal"
            ),
            PlanWarning::RuleViolations { count } => {
                write!(f, "greedy schedule breaks {count} hard rules")
            }
        }
    }
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub status: PlanStatus,
    pub schedule: Schedule,
    pub workloads: WorkloadReport,
    /// Audit findings; always empty for the exact engine.
    pub violations: Vec<Violation>,
    pub warnings: Vec<PlanWarning>,
    /// Solver statistics (exact engine only).
    pub stats: Option<SolveStats>,
}

/// Runs a strategy on a roster.
///
/// # Example
/// ```no_run
/// use u_roster::models::{Horizon, Roster, StaffingRules, Worker};
/// use u_roster::planner::{Planner, PlanStatus};
///
/// let horizon = Horizon::month(2025, 1).unwrap();
/// let workers = (1..=11).map(|i| Worker::new(format!("W{i}"))).collect();
/// let roster = Roster::new(horizon, workers, StaffingRules::new()).unwrap();
///
/// let outcome = Planner::new(&roster).plan().unwrap();
/// assert_eq!(outcome.status, PlanStatus::Optimal);
/// ```
#[derive(Debug, Clone)]
pub struct Planner<'a> {
    roster: &'a Roster,
    strategy: Strategy,
    objective: ObjectiveBuilder,
}

impl<'a> Planner<'a> {
    /// Exact strategy with default limits and objective.
    pub fn new(roster: &'a Roster) -> Self {
        Self {
            roster,
            strategy: Strategy::default(),
            objective: ObjectiveBuilder::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveBuilder) -> Self {
        self.objective = objective;
        self
    }

    /// Plans with the built-in branch-and-bound solver.
    pub fn plan(&self) -> PlanResult<PlanOutcome> {
        self.plan_with(&BranchAndBound::new())
    }

    /// Plans with a caller-provided solver (used by the exact strategy).
    ///
    /// # Errors
    /// - `PlanError::Infeasible` when the hard rules cannot all hold
    /// - `PlanError::NoSolution` when a limit is hit before any schedule
    /// - `PlanError::InternalInvariant` when the solver result is inconsistent
    pub fn plan_with<S: Solver + ?Sized>(&self, solver: &S) -> PlanResult<PlanOutcome> {
        match &self.strategy {
            Strategy::Exact(config) => self.plan_exact(solver, config),
            Strategy::Greedy => Ok(self.plan_greedy()),
        }
    }

    fn plan_exact<S: Solver + ?Sized>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> PlanResult<PlanOutcome> {
        let roster = self.roster;
        let problem = RosterCpBuilder::new(roster)
            .with_objective(self.objective)
            .build()?;
        let solution = if self.objective.honor_preferences {
            self.solve_with_preferences(solver, config, &problem.model)?
        } else {
            solver.solve(&problem.model, config)
        };

        match solution.status {
            SolveStatus::Infeasible => {
                let report = if config.diagnose {
                    diagnose(&problem.model, &solution, config)
                } else {
                    InfeasibilityReport::from_solution(&solution)
                };
                warn!(%report, "roster is infeasible");
                return Err(PlanError::Infeasible(report));
            }
            SolveStatus::Unknown => {
                return Err(PlanError::NoSolution {
                    nodes: solution.stats.nodes,
                    elapsed_ms: solution.stats.elapsed_ms,
                });
            }
            SolveStatus::Optimal | SolveStatus::Feasible => {}
        }

        let schedule = extract_schedule(roster, &problem.grid, &solution)?;
        let violations = audit_schedule(roster, &schedule);
        if let Some(first) = violations.first() {
            return Err(PlanError::InternalInvariant(format!(
                "solver schedule breaks {} hard rules, first: {}",
                violations.len(),
                first.message
            )));
        }

        let mut warnings = Vec::new();
        let status = if solution.status == SolveStatus::Optimal {
            PlanStatus::Optimal
        } else {
            warnings.push(PlanWarning::SolverTimeout {
                nodes: solution.stats.nodes,
                elapsed_ms: solution.stats.elapsed_ms,
            });
            PlanStatus::Feasible
        };

        let workloads = WorkloadReport::calculate(roster, &schedule);
        info!(
            ?status,
            overtime = workloads.total_overtime(),
            spread = workloads.hour_spread(),
            "exact plan ready"
        );
        Ok(PlanOutcome {
            status,
            schedule,
            workloads,
            violations,
            warnings,
            stats: Some(solution.stats),
        })
    }

    /// Solves without the preference tier first and seeds the full solve
    /// with that schedule. The result is never worse on overtime and
    /// fairness than the preference-free schedule, even when the second
    /// solve stops at a limit. Each solve gets the full limits of `config`.
    fn solve_with_preferences<S: Solver + ?Sized>(
        &self,
        solver: &S,
        config: &SolverConfig,
        model: &Model,
    ) -> PlanResult<CpSolution> {
        let base = RosterCpBuilder::new(self.roster)
            .with_objective(self.objective.with_preferences(false))
            .build()?;
        let first = solver.solve(&base.model, config);
        if !first.is_solution_found() {
            return Ok(first);
        }
        let start: Vec<bool> = first.values.iter().map(|v| *v == Some(true)).collect();
        debug!(objective = ?first.objective, "preference solve seeded");
        Ok(solver.solve_from(model, config, &start))
    }

    fn plan_greedy(&self) -> PlanOutcome {
        let roster = self.roster;
        let schedule = GreedyScheduler::new(roster).schedule();
        let violations = audit_schedule(roster, &schedule);
        let workloads = WorkloadReport::calculate(roster, &schedule);

        let (status, warnings) = if violations.is_empty() {
            (PlanStatus::Feasible, Vec::new())
        } else {
            warn!(count = violations.len(), "greedy schedule breaks hard rules");
            (
                PlanStatus::BestEffort,
                vec![PlanWarning::RuleViolations {
                    count: violations.len(),
                }],
            )
        };
        info!(?status, overtime = workloads.total_overtime(), "greedy plan ready");

        PlanOutcome {
            status,
            schedule,
            workloads,
            violations,
            warnings,
            stats: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::cp::ConstraintFamily;
    use crate::models::{Horizon, Quotas, ShiftType, StaffingRules, Worker};
    use chrono::NaiveDate;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn workers(n: usize) -> Vec<Worker> {
        (1..=n).map(|i| Worker::new(format!("W{i}"))).collect()
    }

    /// 11 workers, January, holidays on the 1st and 6th, quotas 6 day / 1 night.
    fn scenario_a() -> Roster {
        let horizon = Horizon::month(2025, 1).unwrap().with_holidays([d(1, 1), d(1, 6)]);
        Roster::new(horizon, workers(11), StaffingRules::new()).unwrap()
    }

    #[test]
    fn test_scenario_a_optimal() {
        let roster = scenario_a();
        let outcome = Planner::new(&roster).plan().unwrap();

        assert_eq!(outcome.status, PlanStatus::Optimal);
        assert!(outcome.violations.is_empty());
        assert!(outcome.warnings.is_empty());
        for day in roster.days() {
            let (day_count, night_count) = (
                outcome.schedule.count_on(day.date, ShiftType::Day),
                outcome.schedule.count_on(day.date, ShiftType::Night),
            );
            if day.is_holiday {
                assert_eq!((day_count, night_count), (0, 0));
            } else {
                assert_eq!((day_count, night_count), (6, 1));
            }
        }
        // 29 days × (6 × 8 + 16) = 1856 hours over 11 workers, budget 160
        assert_eq!(outcome.workloads.total_overtime(), 96);
        assert_eq!(outcome.workloads.fairness(), 896);
        // 29 nights over 11 workers
        for summary in &outcome.workloads.summaries {
            let nights = summary.count(ShiftType::Night);
            assert!((2..=3).contains(&nights), "{}: {nights} nights", summary.worker_id);
        }
    }

    #[test]
    fn test_limit_with_incumbent_is_feasible() {
        // W1 away for ten working days: the root bound is out of reach
        let mut ws = workers(11);
        ws[0] = ws[0].clone().with_unavailable_dates((7..=16).map(|day| d(1, day)));
        let horizon = Horizon::month(2025, 1).unwrap().with_holidays([d(1, 1), d(1, 6)]);
        let roster = Roster::new(horizon, ws, StaffingRules::new()).unwrap();
        let config = SolverConfig::default().with_node_limit(50_000);

        let outcome = Planner::new(&roster)
            .with_strategy(Strategy::Exact(config))
            .plan()
            .unwrap();
        let stats = outcome.stats.clone().unwrap();
        assert_eq!(outcome.status, PlanStatus::Feasible);
        assert!(stats.limit_reached);
        assert_eq!(
            outcome.warnings,
            vec![PlanWarning::SolverTimeout {
                nodes: stats.nodes,
                elapsed_ms: stats.elapsed_ms,
            }]
        );
        assert!(outcome.violations.is_empty());
        assert!(audit_schedule(&roster, &outcome.schedule).is_empty());
    }

    /// Delegates to branch and bound and records how it was called.
    #[derive(Default)]
    struct Recording {
        plain: Cell<u32>,
        seeded: Cell<u32>,
        truncate: bool,
    }

    impl Solver for Recording {
        fn solve(&self, model: &Model, config: &SolverConfig) -> CpSolution {
            self.plain.set(self.plain.get() + 1);
            let mut solution = BranchAndBound::new().solve(model, config);
            if self.truncate && solution.is_solution_found() {
                solution.status = SolveStatus::Feasible;
                solution.stats.limit_reached = true;
            }
            solution
        }

        fn solve_from(&self, model: &Model, config: &SolverConfig, start: &[bool]) -> CpSolution {
            self.seeded.set(self.seeded.get() + 1);
            assert_eq!(start.len(), model.var_count());
            BranchAndBound::new().solve_from(model, config, start)
        }
    }

    #[test]
    fn test_solver_limit_maps_to_timeout_warning() {
        let horizon = Horizon::new(d(1, 1), 5);
        let rules = StaffingRules::new().with_quotas(Quotas::new(3, 0));
        let roster = Roster::new(horizon, workers(3), rules).unwrap();
        let solver = Recording {
            truncate: true,
            ..Recording::default()
        };
        let outcome = Planner::new(&roster).plan_with(&solver).unwrap();
        assert_eq!(outcome.status, PlanStatus::Feasible);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [PlanWarning::SolverTimeout { .. }]
        ));
        assert_eq!(outcome.schedule.assignment_count(), 15);
    }

    #[test]
    fn test_preferences_seeded_with_workload_optimum() {
        let mut ws = workers(11);
        for w in ws.iter_mut().take(3) {
            *w = w.clone().with_preference(ShiftType::Day);
        }
        let horizon = Horizon::month(2025, 1).unwrap().with_holidays([d(1, 1), d(1, 6)]);
        let roster = Roster::new(horizon, ws, StaffingRules::new()).unwrap();
        let solver = Recording::default();
        let outcome = Planner::new(&roster)
            .with_objective(ObjectiveBuilder::new().with_preferences(true))
            .plan_with(&solver)
            .unwrap();
        assert_eq!((solver.plain.get(), solver.seeded.get()), (1, 1));
        // the preference tier never trades away the workload optimum
        assert_eq!(outcome.workloads.total_overtime(), 96);
        assert_eq!(outcome.workloads.fairness(), 896);
        assert!(outcome.violations.is_empty());
    }

    #[test]
    fn test_preferences_off_solves_once() {
        let roster = scenario_a();
        let solver = Recording::default();
        Planner::new(&roster).plan_with(&solver).unwrap();
        assert_eq!((solver.plain.get(), solver.seeded.get()), (1, 0));
    }

    #[test]
    fn test_exact_respects_hard_rules() {
        let roster = scenario_a();
        let schedule = Planner::new(&roster).plan().unwrap().schedule;
        for entry in &schedule.entries {
            for pair in entry.shifts.windows(2) {
                assert_ne!(pair[0].date, pair[1].date);
                if pair[0].date.succ_opt() == Some(pair[1].date) {
                    assert!(!roster.violates_rest(pair[0].shift, pair[1].shift));
                }
            }
        }
    }

    #[test]
    fn test_exact_is_idempotent() {
        let roster = scenario_a();
        let planner = Planner::new(&roster);
        let first = planner.plan().unwrap();
        let second = planner.plan().unwrap();
        assert_eq!(first.schedule, second.schedule);
    }

    #[test]
    fn test_unavailability_honored() {
        let mut ws = workers(11);
        ws[4] = ws[4].clone().with_unavailable_dates((10..=14).map(|day| d(1, day)));
        let horizon = Horizon::month(2025, 1).unwrap().with_holidays([d(1, 1), d(1, 6)]);
        let roster = Roster::new(horizon, ws, StaffingRules::new()).unwrap();
        let outcome = Planner::new(&roster).plan().unwrap();
        assert!(outcome.status == PlanStatus::Optimal || outcome.status == PlanStatus::Feasible);
        assert!(outcome
            .schedule
            .shifts_for("W5")
            .iter()
            .all(|s| s.date < d(1, 10) || s.date > d(1, 14)));
    }

    #[test]
    fn test_scenario_b_infeasible() {
        let horizon = Horizon::new(d(1, 1), 5);
        let rules = StaffingRules::new().with_quotas(Quotas::new(3, 0));
        let mut ws = workers(3);
        ws[1] = ws[1].clone().with_unavailable(d(1, 3));
        let roster = Roster::new(horizon, ws, rules).unwrap();

        match Planner::new(&roster).plan() {
            Err(PlanError::Infeasible(report)) => {
                assert_eq!(
                    report.failing_constraint.as_deref(),
                    Some("coverage DayShift on 2025-01-03")
                );
                assert!(report.blocking_families.contains(&ConstraintFamily::Availability));
            }
            other => panic!("expected infeasibility, got {other:?}"),
        }
    }

    #[test]
    fn test_scenario_b_feasible_without_absence() {
        let horizon = Horizon::new(d(1, 1), 5);
        let rules = StaffingRules::new().with_quotas(Quotas::new(3, 0));
        let roster = Roster::new(horizon, workers(3), rules).unwrap();
        let outcome = Planner::new(&roster).plan().unwrap();
        assert_eq!(outcome.status, PlanStatus::Optimal);
        assert_eq!(outcome.schedule.assignment_count(), 15);
    }

    #[test]
    fn test_node_limit_without_solution() {
        let roster = scenario_a();
        let config = SolverConfig::default().with_node_limit(1);
        let err = Planner::new(&roster)
            .with_strategy(Strategy::Exact(config))
            .plan()
            .unwrap_err();
        assert!(matches!(err, PlanError::NoSolution { .. }));
    }

    #[test]
    fn test_greedy_strategy() {
        let roster = scenario_a();
        let outcome = Planner::new(&roster)
            .with_strategy(Strategy::Greedy)
            .plan()
            .unwrap();
        assert!(outcome.stats.is_none());
        assert_eq!(outcome.workloads.summaries.len(), 11);
        match outcome.status {
            PlanStatus::Feasible => assert!(outcome.violations.is_empty()),
            PlanStatus::BestEffort => assert!(!outcome.warnings.is_empty()),
            PlanStatus::Optimal => panic!("greedy never proves optimality"),
        }
    }

    #[test]
    fn test_outcome_serializes() {
        let horizon = Horizon::new(d(1, 1), 5);
        let rules = StaffingRules::new().with_quotas(Quotas::new(3, 0));
        let roster = Roster::new(horizon, workers(3), rules).unwrap();
        let outcome = Planner::new(&roster).plan().unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "Optimal");
        assert!(json["stats"]["nodes"].as_u64().is_some());
    }

    #[test]
    fn test_warning_display() {
        let w = PlanWarning::SolverTimeout {
            nodes: 5,
            elapsed_ms: 2,
        };
        assert!(w.to_string().contains("5 nodes"));
    }
}
