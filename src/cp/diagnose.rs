//! Infeasibility explanation.
//!
//! When a model has no solution, two facts help the user fix the input:
//! the constraint that failed first during root propagation, and the
//! constraint families whose removal alone makes the model feasible. The
//! latter is found by re-solving one relaxed copy per family as a pure
//! feasibility problem under a small node budget.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{ConstraintFamily, Model};
use super::search::Search;
use super::solver::{CpSolution, SolverConfig};

/// Node budget of each relaxed feasibility check.
const RELAX_NODE_LIMIT: u64 = 20_000;

/// Why a model has no solution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfeasibilityReport {
    /// Label of the constraint that failed root propagation.
    pub failing_constraint: Option<String>,
    /// Families whose removal alone restores feasibility.
    pub blocking_families: Vec<ConstraintFamily>,
}

impl InfeasibilityReport {
    /// Report carrying only the root conflict.
    pub fn from_solution(solution: &CpSolution) -> Self {
        Self {
            failing_constraint: solution.stats.root_conflict.clone(),
            blocking_families: Vec::new(),
        }
    }
}

impl fmt::Display for InfeasibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failing_constraint {
            Some(label) => write!(f, "constraint '{label}' cannot be satisfied")?,
            None => f.write_str("the constraints admit no schedule")?,
        }
        if !self.blocking_families.is_empty() {
            let names: Vec<String> = self.blocking_families.iter().map(|x| x.to_string()).collect();
            write!(f, "; relaxing {} alone restores feasibility", names.join(" or "))?;
        }
        Ok(())
    }
}

/// Explains an infeasible solve of `model`.
pub fn diagnose(model: &Model, solution: &CpSolution, config: &SolverConfig) -> InfeasibilityReport {
    let mut report = InfeasibilityReport::from_solution(solution);
    let relaxed_config = SolverConfig {
        time_limit: config.time_limit,
        node_limit: Some(RELAX_NODE_LIMIT),
        seed: config.seed,
        diagnose: false,
    };

    for family in ConstraintFamily::ALL {
        let present = model.constraints().iter().any(|c| c.family == family)
            || model.fixings().iter().any(|f| f.family == family);
        if !present {
            continue;
        }
        let relaxed = model.without_family(family).without_objective();
        let result = Search::new(&relaxed, relaxed_config.seed).run(&relaxed_config);
        debug!(%family, status = ?result.status, nodes = result.stats.nodes, "relaxation solved");
        if result.is_solution_found() {
            report.blocking_families.push(family);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{LinearExpr, Relation, SolveStatus};

    #[test]
    fn test_display() {
        let report = InfeasibilityReport {
            failing_constraint: Some("coverage DayShift on 2025-01-03".into()),
            blocking_families: vec![ConstraintFamily::Coverage, ConstraintFamily::Availability],
        };
        assert_eq!(
            report.to_string(),
            "constraint 'coverage DayShift on 2025-01-03' cannot be satisfied; \
             relaxing Coverage or Availability alone restores feasibility"
        );
        assert_eq!(
            InfeasibilityReport::default().to_string(),
            "the constraints admit no schedule"
        );
    }

    #[test]
    fn test_diagnose_finds_blocking_family() {
        let mut m = Model::new("blocked");
        let a = m.new_var();
        let b = m.new_var();
        m.add_constraint(LinearExpr::sum([a, b]), Relation::GreaterEq, 2, ConstraintFamily::Coverage, "need both");
        m.add_constraint(LinearExpr::sum([a, b]), Relation::LessEq, 1, ConstraintFamily::Exclusivity, "at most one");
        m.fix(b, false, ConstraintFamily::Availability, "b away");

        let config = SolverConfig::default();
        let solution = Search::new(&m, 0).run(&config);
        assert_eq!(solution.status, SolveStatus::Infeasible);

        let report = diagnose(&m, &solution, &config);
        assert!(report.failing_constraint.is_some());
        // dropping coverage makes it trivially feasible; exclusivity and
        // availability each leave the other in the way
        assert_eq!(report.blocking_families, vec![ConstraintFamily::Coverage]);
    }
}
