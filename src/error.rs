//! Planning error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::cp::InfeasibilityReport;
use crate::validation::ConfigIssue;

/// Errors that can occur while building or solving a roster.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Invalid or contradictory static input. Raised before any solving.
    #[error("invalid configuration: {}", join_issues(.0))]
    Configuration(Vec<ConfigIssue>),

    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The hard constraints cannot be satisfied simultaneously.
    #[error("no schedule satisfies the hard constraints: {0}")]
    Infeasible(InfeasibilityReport),

    /// The solver hit its limits before finding any schedule.
    #[error("solver stopped after {nodes} nodes ({elapsed_ms} ms) without finding a schedule")]
    NoSolution { nodes: u64, elapsed_ms: u64 },

    /// A solver result contradicts the model. Indicates an engine bug.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl PlanError {
    /// Shorthand for a configuration error with a single issue.
    pub(crate) fn config(issue: ConfigIssue) -> Self {
        PlanError::Configuration(vec![issue])
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ConfigIssueKind;

    #[test]
    fn test_configuration_display_joins_issues() {
        let err = PlanError::Configuration(vec![
            ConfigIssue::new(ConfigIssueKind::EmptyRoster, "roster has no workers"),
            ConfigIssue::new(ConfigIssueKind::InvalidQuota, "night quota is negative"),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: roster has no workers; night quota is negative"
        );
    }

    #[test]
    fn test_no_solution_display() {
        let err = PlanError::NoSolution {
            nodes: 10,
            elapsed_ms: 5,
        };
        assert!(err.to_string().contains("10 nodes"));
    }
}
