//! Solver interface and the built-in branch-and-bound solver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::model::{Model, Score, VarId};
use super::search::Search;

/// Search limits and tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock limit. `None` = unlimited.
    pub time_limit: Option<Duration>,
    /// Maximum number of search nodes. `None` = unlimited.
    pub node_limit: Option<u64>,
    /// Tie-break seed. 0 keeps declaration order.
    pub seed: u64,
    /// Explain infeasibility by relaxing constraint families.
    pub diagnose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(60)),
            node_limit: Some(1_000_000),
            seed: 0,
            diagnose: true,
        }
    }
}

impl SolverConfig {
    /// Default limits: 60 s, one million nodes, seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Sets the node limit.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    /// Removes both limits.
    pub fn unlimited(mut self) -> Self {
        self.time_limit = None;
        self.node_limit = None;
        self
    }

    /// Sets the tie-break seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables infeasibility diagnostics.
    pub fn with_diagnose(mut self, diagnose: bool) -> Self {
        self.diagnose = diagnose;
        self
    }
}

/// Outcome class of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal solution.
    Optimal,
    /// Solution found, limit reached before proving optimality.
    Feasible,
    /// Proven that no solution exists.
    Infeasible,
    /// Limit reached before any solution was found.
    Unknown,
}

impl SolveStatus {
    /// Whether a solution is available.
    #[inline]
    pub fn is_solution_found(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Search statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Search nodes explored.
    pub nodes: u64,
    /// Improving solutions found.
    pub incumbents: u32,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
    /// Whether a time or node limit stopped the search.
    pub limit_reached: bool,
    /// Label of the constraint that failed root propagation, if any.
    pub root_conflict: Option<String>,
}

/// Result of a solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpSolution {
    pub status: SolveStatus,
    /// One value per model variable. Empty when no solution was found.
    pub values: Vec<Option<bool>>,
    /// Score of the returned solution.
    pub objective: Option<Score>,
    /// Lower bound proven at the root.
    pub bound: Option<Score>,
    pub stats: SolveStats,
}

impl CpSolution {
    /// Solution without values.
    pub(crate) fn empty(status: SolveStatus, stats: SolveStats) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            bound: None,
            stats,
        }
    }

    /// Whether a solution is available.
    #[inline]
    pub fn is_solution_found(&self) -> bool {
        self.status.is_solution_found()
    }

    /// Value of a variable, if assigned.
    pub fn value(&self, var: VarId) -> Option<bool> {
        self.values.get(var.index()).copied().flatten()
    }
}

/// A solver for 0-1 models.
///
/// Implementations must be deterministic for identical model and config,
/// except where the wall-clock limit cuts the search short.
pub trait Solver {
    /// Solves `model` within the limits of `config`.
    fn solve(&self, model: &Model, config: &SolverConfig) -> CpSolution;

    /// Solves `model` starting from a complete assignment (one value per
    /// variable) that satisfies it. The result is never worse than `start`.
    ///
    /// The default implementation ignores `start`.
    fn solve_from(&self, model: &Model, config: &SolverConfig, start: &[bool]) -> CpSolution {
        let _ = start;
        self.solve(model, config)
    }
}

/// Depth-first branch and bound with bounds propagation.
///
/// # Algorithm
/// 1. Apply fixings, propagate every linear row to a fixpoint
/// 2. At each node compute a lower bound on the objective; prune when it
///    cannot beat the incumbent
/// 3. Branch on the first unsatisfied equality row: try each free variable
///    set to 1, keep the one with the tightest remaining rows, then the
///    best bound, then the lightest current load
/// 4. Stop when the incumbent reaches the root bound or the tree is exhausted
///
/// The bound assumes convex per-load penalties: the conserved load total is
/// distributed over the loads unit by unit, each unit going to the load with
/// the smallest marginal cost (water filling).
///
/// # Reference
/// - Achterberg (2007), "Constraint Integer Programming", Ch. 7
/// - Ibaraki & Katoh (1988), "Resource Allocation Problems", Ch. 4
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, search: Search<'_>, model: &Model, config: &SolverConfig) -> CpSolution {
        info!(
            model = model.name(),
            vars = model.var_count(),
            constraints = model.constraint_count(),
            "solve started"
        );
        let solution = search.run(config);
        if solution.stats.limit_reached {
            warn!(
                nodes = solution.stats.nodes,
                elapsed_ms = solution.stats.elapsed_ms,
                status = ?solution.status,
                "solver stopped at its limit"
            );
        }
        info!(
            status = ?solution.status,
            nodes = solution.stats.nodes,
            elapsed_ms = solution.stats.elapsed_ms,
            objective = ?solution.objective,
            "solve finished"
        );
        solution
    }
}

impl Solver for BranchAndBound {
    fn solve(&self, model: &Model, config: &SolverConfig) -> CpSolution {
        self.run(Search::new(model, config.seed), model, config)
    }

    fn solve_from(&self, model: &Model, config: &SolverConfig, start: &[bool]) -> CpSolution {
        let search = Search::new(model, config.seed).with_start(start);
        self.run(search, model, config)
    }
}
