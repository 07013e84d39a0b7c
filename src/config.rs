//! Plan configuration files.
//!
//! A [`PlanConfig`] is the serde image of one planning run: horizon,
//! holidays, quotas, shift timing, hour rules, workers, objective and solver
//! settings. It is read from TOML or JSON and turned into a validated
//! [`Roster`] plus a [`Strategy`] and an [`ObjectiveBuilder`].
//!
//! Every interpretation problem (unknown shift names, negative quotas, bad
//! months) is collected before reporting, together with the roster checks.
//!
//! ```toml
//! [horizon]
//! year = 2025
//! month = 1
//! holidays = ["2025-01-01", "2025-01-06"]
//!
//! [quotas]
//! day = 6
//! night = 1
//!
//! [shifts.night]
//! hours = 16
//! start_hour = 16
//!
//! [[workers]]
//! id = "W1"
//! preference = "day"
//! unavailable = ["2025-01-10"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cp::{ObjectiveBuilder, ObjectivePolicy, SolverConfig};
use crate::error::{PlanError, PlanResult};
use crate::models::{
    Horizon, Quotas, Roster, ShiftCatalog, ShiftSpec, ShiftType, StaffingRules, Worker,
};
use crate::planner::{Planner, PlanOutcome, Strategy};
use crate::validation::{validate_roster, ConfigIssue, ConfigIssueKind};

/// Full description of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub horizon: HorizonConfig,
    #[serde(default)]
    pub quotas: QuotaConfig,
    /// Timing overrides keyed by shift name (`day`, `night`, `late`, `holiday`).
    #[serde(default)]
    pub shifts: BTreeMap<String, ShiftSpec>,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
    #[serde(default)]
    pub objective: ObjectiveConfig,
    #[serde(default)]
    pub solver: SolverSettings,
}

/// Either a calendar month or an explicit start date and length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonConfig {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub start: Option<NaiveDate>,
    pub days: Option<usize>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

/// Raw quotas; negative values are reported, not rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub day: i64,
    pub night: i64,
    pub late: i64,
    pub holiday: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        let q = Quotas::default();
        Self {
            day: q.day.into(),
            night: q.night.into(),
            late: q.late.into(),
            holiday: q.holiday.into(),
        }
    }
}

/// Hour budget and rest rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Target hours per worker over the horizon.
    pub monthly_hour_budget: Option<i64>,
    /// Weekly contract hours; the monthly budget is four times this.
    pub weekly_hours: Option<i64>,
    pub min_rest_hours: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            monthly_hour_budget: None,
            weekly_hours: None,
            min_rest_hours: StaffingRules::default().min_rest_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub id: String,
    /// Shift name, e.g. `"day"` or `"NightShift"`.
    #[serde(default)]
    pub preference: Option<String>,
    #[serde(default)]
    pub unavailable: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    /// `"lexicographic"` or `"weighted"`.
    pub policy: String,
    /// Must exceed `fairness_weight` under the weighted policy.
    pub overtime_weight: i64,
    pub fairness_weight: i64,
    pub honor_preferences: bool,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            policy: "lexicographic".to_string(),
            overtime_weight: 100,
            fairness_weight: 1,
            honor_preferences: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// `"exact"` or `"greedy"`.
    pub strategy: String,
    pub time_limit_secs: Option<f64>,
    pub node_limit: Option<u64>,
    pub seed: u64,
    pub diagnose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let defaults = SolverConfig::default();
        Self {
            strategy: "exact".to_string(),
            time_limit_secs: defaults.time_limit.map(|d| d.as_secs_f64()),
            node_limit: defaults.node_limit,
            seed: defaults.seed,
            diagnose: defaults.diagnose,
        }
    }
}

impl PlanConfig {
    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> PlanResult<Self> {
        toml::from_str(text).map_err(|e| malformed(format!("invalid TOML: {e}")))
    }

    /// Parses JSON text.
    pub fn from_json_str(text: &str) -> PlanResult<Self> {
        serde_json::from_str(text).map_err(|e| malformed(format!("invalid JSON: {e}")))
    }

    /// Reads a configuration file; `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Builds the validated roster.
    ///
    /// # Errors
    /// `PlanError::Configuration` with every problem found, both in
    /// interpreting the file and in the roster checks.
    pub fn to_roster(&self) -> PlanResult<Roster> {
        let mut issues = Vec::new();

        let horizon = self.horizon(&mut issues);
        let quotas = self.quotas(&mut issues);
        let shifts = self.shift_catalog(&mut issues);
        let workers = self.workers(&mut issues);

        let budget = match (self.rules.monthly_hour_budget, self.rules.weekly_hours) {
            (Some(budget), _) => budget,
            (None, Some(weekly)) => StaffingRules::from_weekly_hours(weekly).monthly_hour_budget,
            (None, None) => StaffingRules::default().monthly_hour_budget,
        };
        let rules = StaffingRules::new()
            .with_quotas(quotas)
            .with_shifts(shifts)
            .with_budget(budget)
            .with_min_rest(self.rules.min_rest_hours);

        let horizon = horizon.unwrap_or_else(|| Horizon::new(NaiveDate::MIN, 0));
        if let Err(found) = validate_roster(&horizon, &workers, &rules) {
            // an unresolved horizon is already reported
            let horizon_reported = issues
                .iter()
                .any(|i| i.kind == ConfigIssueKind::InvalidDate);
            issues.extend(
                found
                    .into_iter()
                    .filter(|i| !(horizon_reported && i.kind == ConfigIssueKind::EmptyHorizon)),
            );
        }
        if !issues.is_empty() {
            return Err(PlanError::Configuration(issues));
        }
        Roster::new(horizon, workers, rules)
    }

    /// Engine selected by the `[solver]` section.
    pub fn strategy(&self) -> PlanResult<Strategy> {
        let s = &self.solver;
        match s.strategy.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Strategy::Greedy),
            "exact" => {
                let mut config = SolverConfig::new().with_seed(s.seed).with_diagnose(s.diagnose);
                config.node_limit = s.node_limit;
                config.time_limit = match s.time_limit_secs {
                    Some(secs) if secs.is_finite() && secs >= 0.0 => {
                        Some(Duration::from_secs_f64(secs))
                    }
                    Some(secs) => {
                        return Err(malformed(format!("invalid time limit: {secs}")));
                    }
                    None => None,
                };
                Ok(Strategy::Exact(config))
            }
            other => Err(malformed(format!("unknown solver strategy '{other}'"))),
        }
    }

    /// Objective selected by the `[objective]` section.
    pub fn objective(&self) -> PlanResult<ObjectiveBuilder> {
        let o = &self.objective;
        let policy = match o.policy.trim().to_ascii_lowercase().as_str() {
            "lexicographic" => ObjectivePolicy::Lexicographic,
            "weighted" => {
                if o.fairness_weight < 0 {
                    return Err(malformed("objective weights must be non-negative"));
                }
                if o.overtime_weight <= o.fairness_weight {
                    return Err(malformed(format!(
                        "overtime weight {} must exceed fairness weight {}",
                        o.overtime_weight, o.fairness_weight
                    )));
                }
                ObjectivePolicy::Weighted {
                    overtime: o.overtime_weight,
                    fairness: o.fairness_weight,
                }
            }
            other => return Err(malformed(format!("unknown objective policy '{other}'"))),
        };
        Ok(ObjectiveBuilder::new()
            .with_policy(policy)
            .with_preferences(o.honor_preferences))
    }

    /// Builds the roster and runs the configured engine.
    pub fn plan(&self) -> PlanResult<PlanOutcome> {
        let roster = self.to_roster()?;
        Planner::new(&roster)
            .with_strategy(self.strategy()?)
            .with_objective(self.objective()?)
            .plan()
    }

    fn horizon(&self, issues: &mut Vec<ConfigIssue>) -> Option<Horizon> {
        let h = &self.horizon;
        let base = match (h.year, h.month, h.start, h.days) {
            (Some(year), Some(month), None, None) => {
                let horizon = Horizon::month(year, month);
                if horizon.is_none() {
                    issues.push(ConfigIssue::new(
                        ConfigIssueKind::InvalidDate,
                        format!("invalid month {year}-{month}"),
                    ));
                }
                horizon
            }
            (None, None, Some(start), Some(days)) => Some(Horizon::new(start, days)),
            _ => {
                issues.push(ConfigIssue::new(
                    ConfigIssueKind::InvalidDate,
                    "horizon needs either year and month, or start and days",
                ));
                None
            }
        }?;

        for date in &h.holidays {
            if !base.contains(*date) {
                issues.push(ConfigIssue::new(
                    ConfigIssueKind::InvalidDate,
                    format!("holiday {date} lies outside the horizon"),
                ));
            }
        }
        Some(base.with_holidays(h.holidays.iter().copied()))
    }

    fn quotas(&self, issues: &mut Vec<ConfigIssue>) -> Quotas {
        let q = &self.quotas;
        let mut quota = |name: &str, value: i64| match u32::try_from(value) {
            Ok(v) => v,
            Err(_) => {
                issues.push(ConfigIssue::new(
                    ConfigIssueKind::InvalidQuota,
                    format!("{name} quota must be a non-negative integer, got {value}"),
                ));
                0
            }
        };
        Quotas::new(quota("day", q.day), quota("night", q.night))
            .with_late(quota("late", q.late))
            .with_holiday(quota("holiday", q.holiday))
    }

    fn shift_catalog(&self, issues: &mut Vec<ConfigIssue>) -> ShiftCatalog {
        let mut catalog = ShiftCatalog::new();
        for (name, spec) in &self.shifts {
            match name.parse::<ShiftType>() {
                Ok(shift) => catalog = catalog.with_spec(shift, *spec),
                Err(e) => issues.push(ConfigIssue::new(
                    ConfigIssueKind::UnknownShiftType,
                    e.to_string(),
                )),
            }
        }
        catalog
    }

    fn workers(&self, issues: &mut Vec<ConfigIssue>) -> Vec<Worker> {
        self.workers
            .iter()
            .map(|w| {
                let mut worker =
                    Worker::new(w.id.clone()).with_unavailable_dates(w.unavailable.iter().copied());
                if let Some(pref) = &w.preference {
                    match pref.parse::<ShiftType>() {
                        Ok(shift) => worker = worker.with_preference(shift),
                        Err(e) => issues.push(ConfigIssue::new(
                            ConfigIssueKind::UnknownShiftType,
                            format!("worker '{}': {e}", w.id),
                        )),
                    }
                }
                worker
            })
            .collect()
    }
}

fn malformed(message: impl Into<String>) -> PlanError {
    PlanError::config(ConfigIssue::new(ConfigIssueKind::Malformed, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JANUARY: &str = r#"
        [horizon]
        year = 2025
        month = 1
        holidays = ["2025-01-01", "2025-01-06"]

        [quotas]
        day = 2
        night = 1

        [shifts.late]
        hours = 6
        start_hour = 14

        [rules]
        weekly_hours = 38

        [[workers]]
        id = "A"
        preference = "day"

        [[workers]]
        id = "B"
        preference = "NightShift"
        unavailable = ["2025-01-10", "2025-01-11"]

        [[workers]]
        id = "C"

        [[workers]]
        id = "D"

        [solver]
        strategy = "greedy"
    "#;

    fn issue_kinds(err: PlanError) -> Vec<ConfigIssueKind> {
        match err {
            PlanError::Configuration(issues) => issues.into_iter().map(|i| i.kind).collect(),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_to_roster() {
        let config = PlanConfig::from_toml_str(JANUARY).unwrap();
        let roster = config.to_roster().unwrap();

        assert_eq!(roster.days().len(), 31);
        assert!(roster.is_holiday(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()));
        assert_eq!(roster.worker_count(), 4);
        assert_eq!(roster.quota(ShiftType::Day), 2);
        assert_eq!(roster.shift_hours(ShiftType::Late), 6);
        assert_eq!(roster.monthly_hour_budget(), 152);
        assert_eq!(roster.preference(0), Some(ShiftType::Day));
        assert_eq!(roster.preference(1), Some(ShiftType::Night));
        assert!(roster.is_unavailable(1, NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()));
        assert_eq!(config.strategy().unwrap(), Strategy::Greedy);
    }

    #[test]
    fn test_json_matches_toml() {
        let json = r#"{
            "horizon": {"start": "2025-03-01", "days": 7},
            "quotas": {"day": 1, "night": 0},
            "rules": {"monthly_hour_budget": 40},
            "workers": [{"id": "X"}, {"id": "Y", "preference": "late"}]
        }"#;
        let config = PlanConfig::from_json_str(json).unwrap();
        let roster = config.to_roster().unwrap();
        assert_eq!(roster.days().len(), 7);
        assert_eq!(roster.monthly_hour_budget(), 40);
        assert_eq!(roster.rules().min_rest_hours, 11);
        assert!(matches!(config.strategy().unwrap(), Strategy::Exact(_)));
    }

    #[test]
    fn test_collects_all_issues() {
        let text = r#"
            [horizon]
            year = 2025
            month = 1

            [quotas]
            day = -1
            night = 1

            [shifts.evening]
            hours = 8
            start_hour = 18

            [[workers]]
            id = "A"
            preference = "weekend"

            [[workers]]
            id = "A"
        "#;
        let kinds = issue_kinds(PlanConfig::from_toml_str(text).unwrap().to_roster().unwrap_err());
        assert!(kinds.contains(&ConfigIssueKind::InvalidQuota));
        assert!(kinds.contains(&ConfigIssueKind::UnknownShiftType));
        assert!(kinds.contains(&ConfigIssueKind::DuplicateWorker));
        assert_eq!(
            kinds.iter().filter(|k| **k == ConfigIssueKind::UnknownShiftType).count(),
            2
        );
    }

    #[test]
    fn test_zero_workers_and_quota_overflow() {
        let text = "[horizon]\nstart = \"2025-01-01\"\ndays = 3\n";
        let kinds = issue_kinds(PlanConfig::from_toml_str(text).unwrap().to_roster().unwrap_err());
        assert!(kinds.contains(&ConfigIssueKind::EmptyRoster));

        let text = r#"
            [horizon]
            start = "2025-01-01"
            days = 3
            [quotas]
            day = 3
            night = 1
            [[workers]]
            id = "A"
        "#;
        let kinds = issue_kinds(PlanConfig::from_toml_str(text).unwrap().to_roster().unwrap_err());
        assert!(kinds.contains(&ConfigIssueKind::QuotaExceedsWorkers));
    }

    #[test]
    fn test_bad_horizon() {
        let text = "[horizon]\nyear = 2025\nmonth = 13\n[[workers]]\nid = \"A\"\n";
        let kinds = issue_kinds(PlanConfig::from_toml_str(text).unwrap().to_roster().unwrap_err());
        assert!(kinds.contains(&ConfigIssueKind::InvalidDate));
        assert!(!kinds.contains(&ConfigIssueKind::EmptyHorizon));

        let text = "[horizon]\nyear = 2025\n[quotas]\nday = 1\nnight = 0\n[[workers]]\nid = \"A\"\n";
        let kinds = issue_kinds(PlanConfig::from_toml_str(text).unwrap().to_roster().unwrap_err());
        assert_eq!(kinds, vec![ConfigIssueKind::InvalidDate]);
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let kinds = issue_kinds(PlanConfig::from_toml_str("[horizon\nyear = ").unwrap_err());
        assert_eq!(kinds, vec![ConfigIssueKind::Malformed]);
        let kinds = issue_kinds(PlanConfig::from_json_str("{\"horizon\": 3}").unwrap_err());
        assert_eq!(kinds, vec![ConfigIssueKind::Malformed]);
    }

    #[test]
    fn test_objective_and_strategy_settings() {
        let mut config = PlanConfig::from_toml_str(JANUARY).unwrap();
        config.objective.policy = "weighted".into();
        config.objective.overtime_weight = 50;
        config.objective.honor_preferences = true;
        let objective = config.objective().unwrap();
        assert_eq!(
            objective.policy,
            ObjectivePolicy::Weighted {
                overtime: 50,
                fairness: 1
            }
        );
        assert!(objective.honor_preferences);

        config.solver.strategy = "exact".into();
        config.solver.time_limit_secs = Some(2.5);
        config.solver.seed = 9;
        match config.strategy().unwrap() {
            Strategy::Exact(c) => {
                assert_eq!(c.time_limit, Some(Duration::from_millis(2500)));
                assert_eq!(c.seed, 9);
            }
            Strategy::Greedy => panic!("expected exact strategy"),
        }

        config.solver.strategy = "annealing".into();
        assert!(config.strategy().is_err());
        config.objective.policy = "pareto".into();
        assert!(config.objective().is_err());
    }

    #[test]
    fn test_weighted_overtime_must_dominate() {
        let mut config = PlanConfig::from_toml_str(JANUARY).unwrap();
        config.objective.policy = "weighted".into();
        for (overtime, fairness) in [(0, 1), (1, 1), (5, -1), (-2, -3)] {
            config.objective.overtime_weight = overtime;
            config.objective.fairness_weight = fairness;
            let err = config.objective().unwrap_err();
            assert!(matches!(err, PlanError::Configuration(_)), "({overtime}, {fairness})");
        }
        config.objective.overtime_weight = 2;
        config.objective.fairness_weight = 0;
        assert!(config.objective().is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PlanConfig::load("/nonexistent/u-roster/plan.toml").unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }

    #[test]
    fn test_plan_from_config() {
        let outcome = PlanConfig::from_toml_str(JANUARY).unwrap().plan().unwrap();
        assert_eq!(outcome.schedule.entries.len(), 4);
        assert!(outcome.stats.is_none());
    }
}
