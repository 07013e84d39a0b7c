//! Declarative 0-1 model.
//!
//! A [`Model`] is a set of boolean variables, linear constraints with
//! positive coefficients, fixings and a lexicographic [`Objective`]. It knows
//! nothing about rostering: the builders in this module translate a roster
//! into it, any [`Solver`](super::Solver) can consume it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a boolean decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in the model.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Weighted sum of boolean variables. Coefficients are positive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
}

impl LinearExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the given variables with coefficient 1.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
        }
    }

    /// Adds `coef * var`.
    pub fn with_term(mut self, var: VarId, coef: i64) -> Self {
        self.push(var, coef);
        self
    }

    /// Adds `coef * var` in place.
    pub fn push(&mut self, var: VarId, coef: i64) {
        self.terms.push((var, coef));
    }

    /// Terms as (variable, coefficient).
    #[inline]
    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    /// Whether the expression has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value under a full assignment (`None` counts as 0).
    pub fn evaluate(&self, values: &[Option<bool>]) -> i64 {
        self.terms
            .iter()
            .filter(|(v, _)| values.get(v.0).copied().flatten() == Some(true))
            .map(|(_, c)| c)
            .sum()
    }
}

/// Comparison between an expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// `expr <= rhs`
    LessEq,
    /// `expr == rhs`
    Equal,
    /// `expr >= rhs`
    GreaterEq,
}

impl Relation {
    /// Whether the relation bounds the expression from above.
    #[inline]
    pub fn has_upper(self) -> bool {
        matches!(self, Relation::LessEq | Relation::Equal)
    }

    /// Whether the relation bounds the expression from below.
    #[inline]
    pub fn has_lower(self) -> bool {
        matches!(self, Relation::GreaterEq | Relation::Equal)
    }
}

/// Origin of a constraint, used to explain infeasibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintFamily {
    /// Daily staffing quotas.
    Coverage,
    /// One shift per worker and day.
    Exclusivity,
    /// Forbidden shift sequences on consecutive days.
    Rest,
    /// Unavailable dates.
    Availability,
    /// Even spread of night shifts.
    NightBalance,
}

impl ConstraintFamily {
    /// All families in declaration order.
    pub const ALL: [ConstraintFamily; 5] = [
        ConstraintFamily::Coverage,
        ConstraintFamily::Exclusivity,
        ConstraintFamily::Rest,
        ConstraintFamily::Availability,
        ConstraintFamily::NightBalance,
    ];
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::Coverage => "Coverage",
            ConstraintFamily::Exclusivity => "Exclusivity",
            ConstraintFamily::Rest => "Rest",
            ConstraintFamily::Availability => "Availability",
            ConstraintFamily::NightBalance => "NightBalance",
        };
        f.write_str(name)
    }
}

/// A labelled linear constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
    pub family: ConstraintFamily,
    pub label: String,
}

impl LinearConstraint {
    /// Whether the constraint holds under a full assignment.
    pub fn is_satisfied(&self, values: &[Option<bool>]) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs,
            Relation::Equal => lhs == self.rhs,
            Relation::GreaterEq => lhs >= self.rhs,
        }
    }
}

/// A variable forced to a value before search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixing {
    pub var: VarId,
    pub value: bool,
    pub family: ConstraintFamily,
    pub label: String,
}

/// Penalty applied to one load against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyKind {
    /// `max(0, load - target)`
    Overtime,
    /// `(load - target)^2`
    SquaredDeviation,
}

/// Weighted penalty term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub kind: PenaltyKind,
    pub weight: i64,
}

impl Penalty {
    /// Creates a penalty term.
    pub fn new(kind: PenaltyKind, weight: i64) -> Self {
        Self { kind, weight }
    }

    /// Penalty of a single load.
    #[inline]
    pub fn evaluate(&self, load: i64, target: i64) -> i64 {
        let diff = load - target;
        let raw = match self.kind {
            PenaltyKind::Overtime => diff.max(0),
            PenaltyKind::SquaredDeviation => diff * diff,
        };
        self.weight * raw
    }
}

/// One level of a lexicographic objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveTier {
    /// Sum over all loads of the given penalties.
    Load(Vec<Penalty>),
    /// A linear expression (positive coefficients).
    Linear(LinearExpr),
}

/// Objective value, compared lexicographically tier by tier.
pub type Score = Vec<i64>;

/// Lexicographic minimization over per-entity load expressions.
///
/// `total_load`, when known, is the sum every complete solution gives to the
/// loads. Solvers use it to tighten their lower bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub loads: Vec<LinearExpr>,
    pub target: i64,
    pub tiers: Vec<ObjectiveTier>,
    pub total_load: Option<i64>,
}

impl Objective {
    /// Objective without any tier: every solution is optimal.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the objective has no tier.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Score of a load tier for one load value.
    pub(crate) fn load_cost(penalties: &[Penalty], load: i64, target: i64) -> i64 {
        penalties.iter().map(|p| p.evaluate(load, target)).sum()
    }

    /// Score of a full assignment.
    pub fn evaluate(&self, values: &[Option<bool>]) -> Score {
        let loads: Vec<i64> = self.loads.iter().map(|e| e.evaluate(values)).collect();
        self.tiers
            .iter()
            .map(|tier| match tier {
                ObjectiveTier::Load(penalties) => loads
                    .iter()
                    .map(|&h| Self::load_cost(penalties, h, self.target))
                    .sum(),
                ObjectiveTier::Linear(expr) => expr.evaluate(values),
            })
            .collect()
    }
}

/// A 0-1 linear model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    var_count: usize,
    constraints: Vec<LinearConstraint>,
    fixings: Vec<Fixing>,
    objective: Objective,
}

impl Model {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a boolean variable.
    pub fn new_var(&mut self) -> VarId {
        self.var_count += 1;
        VarId(self.var_count - 1)
    }

    /// Adds a constraint.
    pub fn add_constraint(
        &mut self,
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
        family: ConstraintFamily,
        label: impl Into<String>,
    ) {
        self.constraints.push(LinearConstraint {
            expr,
            relation,
            rhs,
            family,
            label: label.into(),
        });
    }

    /// Forces a variable to a value.
    pub fn fix(
        &mut self,
        var: VarId,
        value: bool,
        family: ConstraintFamily,
        label: impl Into<String>,
    ) {
        self.fixings.push(Fixing {
            var,
            value,
            family,
            label: label.into(),
        });
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = objective;
    }

    /// Copy of the model without any constraint or fixing of `family`.
    pub fn without_family(&self, family: ConstraintFamily) -> Self {
        Self {
            name: format!("{}-without-{family}", self.name),
            var_count: self.var_count,
            constraints: self
                .constraints
                .iter()
                .filter(|c| c.family != family)
                .cloned()
                .collect(),
            fixings: self
                .fixings
                .iter()
                .filter(|f| f.family != family)
                .cloned()
                .collect(),
            objective: self.objective.clone(),
        }
    }

    /// Copy of the model with an empty objective (pure feasibility).
    pub fn without_objective(&self) -> Self {
        Self {
            objective: Objective::none(),
            ..self.clone()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    #[inline]
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    #[inline]
    pub fn fixings(&self) -> &[Fixing] {
        &self.fixings
    }

    #[inline]
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Whether a full assignment satisfies every constraint and fixing.
    pub fn is_satisfied(&self, values: &[Option<bool>]) -> bool {
        values.len() == self.var_count
            && values.iter().all(Option::is_some)
            && self
                .fixings
                .iter()
                .all(|f| values[f.var.0] == Some(f.value))
            && self.constraints.iter().all(|c| c.is_satisfied(values))
    }
}
