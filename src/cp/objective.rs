//! Workload objective.
//!
//! Each worker's total hours are a linear expression over its decisions
//! (`Σ decision × duration`). Two penalties rank schedules:
//!
//! | Term | Definition |
//! |------|-----------|
//! | Overtime | Σ max(0, hours − budget) |
//! | Fairness | Σ (hours − budget)² |
//!
//! An optional last tier counts assignments contradicting a stated
//! preference.

use serde::{Deserialize, Serialize};

use super::builder::DecisionGrid;
use super::model::{LinearExpr, Objective, ObjectiveTier, Penalty, PenaltyKind};
use crate::models::{Roster, ShiftType};

/// How overtime and fairness are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectivePolicy {
    /// Overtime first, fairness only among overtime-optimal schedules.
    #[default]
    Lexicographic,
    /// Single weighted sum `overtime * Σ overtime + fairness * Σ deviation²`.
    ///
    /// The builder takes the weights as given. Overtime only dominates when
    /// its weight outgrows any fairness gain the roster allows, and choosing
    /// such weights is up to the caller; the config loader only requires
    /// `overtime > fairness >= 0`.
    Weighted { overtime: i64, fairness: i64 },
}

/// Builds the [`Objective`] of a roster model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveBuilder {
    pub policy: ObjectivePolicy,
    /// Adds a final tier minimizing assignments against preferences.
    pub honor_preferences: bool,
}

impl ObjectiveBuilder {
    /// Lexicographic policy, preferences ignored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the combination policy.
    pub fn with_policy(mut self, policy: ObjectivePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables the preference tier.
    pub fn with_preferences(mut self, honor: bool) -> Self {
        self.honor_preferences = honor;
        self
    }

    /// Builds the objective over the decisions of `grid`.
    pub fn build(&self, roster: &Roster, grid: &DecisionGrid) -> Objective {
        let mut loads = vec![LinearExpr::new(); roster.worker_count()];
        let mut mismatches = LinearExpr::new();

        for (var, cell) in grid.iter() {
            loads[cell.worker].push(var, roster.shift_hours(cell.shift));
            if let Some(pref) = roster.preference(cell.worker) {
                if cell.shift != pref && cell.shift != ShiftType::Holiday {
                    mismatches.push(var, 1);
                }
            }
        }

        // Coverage is exact, so every schedule books the same total.
        let total_load = roster
            .days()
            .iter()
            .flat_map(|day| roster.staffed_shifts(day))
            .map(|shift| i64::from(roster.quota(shift)) * roster.shift_hours(shift))
            .sum();

        let overtime = |w| Penalty::new(PenaltyKind::Overtime, w);
        let fairness = |w| Penalty::new(PenaltyKind::SquaredDeviation, w);
        let mut tiers = match self.policy {
            ObjectivePolicy::Lexicographic => vec![
                ObjectiveTier::Load(vec![overtime(1)]),
                ObjectiveTier::Load(vec![fairness(1)]),
            ],
            ObjectivePolicy::Weighted {
                overtime: wo,
                fairness: wf,
            } => vec![ObjectiveTier::Load(vec![overtime(wo), fairness(wf)])],
        };
        if self.honor_preferences {
            tiers.push(ObjectiveTier::Linear(mismatches));
        }

        Objective {
            loads,
            target: roster.monthly_hour_budget(),
            tiers,
            total_load: Some(total_load),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::RosterCpBuilder;
    use crate::models::{Horizon, Quotas, StaffingRules, Worker};
    use chrono::NaiveDate;

    fn roster() -> Roster {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let horizon = Horizon::new(start, 4).with_holiday(start);
        let rules = StaffingRules::new()
            .with_quotas(Quotas::new(2, 1))
            .with_budget(24);
        let workers = vec![
            Worker::new("A").with_preference(ShiftType::Day),
            Worker::new("B"),
            Worker::new("C"),
            Worker::new("D"),
        ];
        Roster::new(horizon, workers, rules).unwrap()
    }

    #[test]
    fn test_total_load_and_loads() {
        let roster = roster();
        let problem = RosterCpBuilder::new(&roster).build().unwrap();
        let obj = ObjectiveBuilder::new().build(&roster, &problem.grid);
        // 3 regular days × (2 × 8 + 1 × 16)
        assert_eq!(obj.total_load, Some(96));
        assert_eq!(obj.loads.len(), 4);
        assert_eq!(obj.target, 24);
        assert_eq!(obj.tiers.len(), 2);
    }

    #[test]
    fn test_weighted_policy_single_tier() {
        let roster = roster();
        let problem = RosterCpBuilder::new(&roster).build().unwrap();
        let obj = ObjectiveBuilder::new()
            .with_policy(ObjectivePolicy::Weighted {
                overtime: 10,
                fairness: 1,
            })
            .build(&roster, &problem.grid);
        assert_eq!(obj.tiers.len(), 1);
    }

    #[test]
    fn test_preference_tier() {
        let roster = roster();
        let problem = RosterCpBuilder::new(&roster).build().unwrap();
        let obj = ObjectiveBuilder::new()
            .with_preferences(true)
            .build(&roster, &problem.grid);
        assert_eq!(obj.tiers.len(), 3);
        match &obj.tiers[2] {
            // worker A can take the night shift on 3 regular days
            ObjectiveTier::Linear(expr) => assert_eq!(expr.terms().len(), 3),
            other => panic!("unexpected tier {other:?}"),
        }
    }
}
