//! Exact roster optimization.
//!
//! Translates a [`Roster`](crate::models::Roster) into a 0-1 linear model,
//! solves it with a [`Solver`] and decodes the result into a
//! [`Schedule`](crate::models::Schedule).
//!
//! # Pipeline
//!
//! ```text
//! Roster ─┬─ RosterCpBuilder ──► Model ──► Solver ──► CpSolution ──► extract_schedule
//!         └─ ObjectiveBuilder ──┘                         │
//!                                                         └─ diagnose (if infeasible)
//! ```
//!
//! The model layer is problem-agnostic: any type implementing [`Solver`]
//! can replace the built-in [`BranchAndBound`].
//!
//! # Reference
//! - Wolsey (1998), "Integer Programming"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

mod builder;
mod diagnose;
mod extract;
mod model;
mod objective;
mod search;
mod solver;

pub use builder::{CpProblem, DecisionGrid, GridCell, RosterCpBuilder};
pub use diagnose::{diagnose, InfeasibilityReport};
pub use extract::extract_schedule;
pub use model::{
    ConstraintFamily, Fixing, LinearConstraint, LinearExpr, Model, Objective, ObjectiveTier,
    Penalty, PenaltyKind, Relation, Score, VarId,
};
pub use objective::{ObjectiveBuilder, ObjectivePolicy};
pub use solver::{BranchAndBound, CpSolution, SolveStats, SolveStatus, Solver, SolverConfig};
