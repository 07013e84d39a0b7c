//! Heuristic scheduling, workload metrics and emergency cover.
//!
//! # Algorithm
//!
//! `GreedyScheduler` fills each day with the least-loaded available workers.
//! It is not optimal and may leave coverage gaps, but needs no search and
//! provides fast baseline rosters.
//!
//! # Workload
//!
//! `WorkloadReport` computes per-worker hours, overtime and shift counts.
//!
//! # Cover
//!
//! `EmergencyCover` repairs a published schedule after absences, choosing
//! replacements through a `CoverPolicy`.
//!
//! # References
//!
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 13

mod cover;
mod greedy;
mod policy;
mod workload;

pub use cover::{Absence, CoverOutcome, EmergencyCover};
pub use greedy::GreedyScheduler;
pub use policy::{CoverCandidate, CoverPolicy, LeastLoaded, SeededRandom};
pub use workload::{WorkloadReport, WorkloadSummary};
