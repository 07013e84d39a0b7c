//! Monthly shift rostering.
//!
//! Assigns workers to day, night, late and holiday shifts over a planning
//! horizon so that daily quotas are met exactly, nobody works two shifts a
//! day, rest rules hold between consecutive days and absences are
//! respected, while overtime and workload imbalance are minimized.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Worker`, `ShiftType`, `Horizon`, `Roster`,
//!   `Schedule`, `Violation`
//! - **`cp`**: 0-1 constraint model, objective builder, branch-and-bound
//!   solver, schedule extraction and infeasibility diagnosis
//! - **`scheduler`**: Greedy assigner, workload metrics, emergency cover
//! - **`planner`**: `Planner` facade returning a `PlanOutcome`
//! - **`config`**: `PlanConfig` loaded from TOML or JSON
//! - **`validation`**: Configuration checks and schedule audit
//!
//! # Example
//!
//! ```no_run
//! use u_roster::config::PlanConfig;
//!
//! let outcome = PlanConfig::load("plan.toml")?.plan()?;
//! println!("{:?}: {} assignments", outcome.status, outcome.schedule.assignment_count());
//! # Ok::<(), u_roster::PlanError>(())
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 13

pub mod config;
pub mod cp;
pub mod error;
pub mod models;
pub mod planner;
pub mod scheduler;
pub mod validation;

pub use error::{PlanError, PlanResult};
pub use planner::{PlanOutcome, PlanStatus, PlanWarning, Planner, Strategy};
