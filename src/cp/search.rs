//! Propagation, bounding and tree search for [`BranchAndBound`](super::BranchAndBound).
//!
//! Every linear row and every objective expression is a *slot* holding two
//! running sums: `fixed` (coefficients of variables set to 1) and `free`
//! (coefficients of unassigned variables). Assignments are recorded on a
//! trail and undone by replaying it backwards, so a node costs no copying.
//!
//! Slot layout: model constraints first, then one slot per objective load,
//! then one slot per linear objective tier.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::model::{Model, Objective, ObjectiveTier, Penalty, Relation, Score, VarId};
use super::solver::{CpSolution, SolveStats, SolveStatus, SolverConfig};

/// Nodes between two wall-clock checks.
const CLOCK_INTERVAL: u64 = 256;

struct Frame {
    mark: usize,
    var: usize,
    value: bool,
    retried: bool,
}

struct Candidate {
    var: usize,
    tightness: f64,
    bound: Score,
    load: i64,
    rank: usize,
}

impl Candidate {
    fn cmp_key(&self, other: &Self) -> Ordering {
        other
            .tightness
            .total_cmp(&self.tightness)
            .then_with(|| self.bound.cmp(&other.bound))
            .then_with(|| self.load.cmp(&other.load))
            .then_with(|| self.rank.cmp(&other.rank))
    }
}

pub(crate) struct Search<'m> {
    model: &'m Model,
    objective: &'m Objective,
    values: Vec<Option<bool>>,
    /// Slots each variable appears in, with its coefficient.
    occ: Vec<Vec<(usize, i64)>>,
    fixed: Vec<i64>,
    free: Vec<i64>,
    max_coef: Vec<i64>,
    queued: Vec<bool>,
    trail: Vec<usize>,
    row_count: usize,
    load_base: usize,
    /// Slot of each objective tier (linear tiers only).
    tier_slots: Vec<Option<usize>>,
    /// Granularity of load values.
    unit: i64,
    rank: Vec<usize>,
    /// Known assignment used as the first incumbent.
    start: Option<Vec<Option<bool>>>,
}

impl<'m> Search<'m> {
    pub(crate) fn new(model: &'m Model, seed: u64) -> Self {
        let n = model.var_count();
        let objective = model.objective();
        let row_count = model.constraints().len();
        let load_base = row_count;

        let mut exprs: Vec<&[(VarId, i64)]> = model
            .constraints()
            .iter()
            .map(|c| c.expr.terms())
            .collect();
        exprs.extend(objective.loads.iter().map(|e| e.terms()));
        let mut tier_slots = Vec::with_capacity(objective.tiers.len());
        for tier in &objective.tiers {
            match tier {
                ObjectiveTier::Linear(expr) => {
                    tier_slots.push(Some(exprs.len()));
                    exprs.push(expr.terms());
                }
                ObjectiveTier::Load(_) => tier_slots.push(None),
            }
        }

        let mut occ = vec![Vec::new(); n];
        let mut free = vec![0; exprs.len()];
        let mut max_coef = vec![0; row_count];
        for (slot, terms) in exprs.iter().enumerate() {
            for &(v, c) in terms.iter() {
                occ[v.index()].push((slot, c));
                free[slot] += c;
                if slot < row_count {
                    max_coef[slot] = max_coef[slot].max(c);
                }
            }
        }

        let unit = objective
            .loads
            .iter()
            .flat_map(|e| e.terms().iter().map(|&(_, c)| c))
            .fold(0, gcd)
            .max(1);

        let rank = if seed == 0 {
            (0..n).collect()
        } else {
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut SmallRng::seed_from_u64(seed));
            let mut rank = vec![0; n];
            for (position, &v) in order.iter().enumerate() {
                rank[v] = position;
            }
            rank
        };

        Self {
            model,
            objective,
            values: vec![None; n],
            occ,
            fixed: vec![0; exprs.len()],
            free,
            max_coef,
            queued: vec![false; row_count],
            trail: Vec::new(),
            row_count,
            load_base,
            tier_slots,
            unit,
            rank,
            start: None,
        }
    }

    /// Seeds the search with a complete assignment. Ignored at run time
    /// unless it satisfies every constraint and fixing of the model.
    pub(crate) fn with_start(mut self, values: &[bool]) -> Self {
        self.start = Some(values.iter().map(|&v| Some(v)).collect());
        self
    }

    fn assign(&mut self, var: usize, value: bool) {
        self.values[var] = Some(value);
        self.trail.push(var);
        for &(slot, c) in &self.occ[var] {
            self.free[slot] -= c;
            if value {
                self.fixed[slot] += c;
            }
        }
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(var) = self.trail.pop() else { break };
            let value = self.values[var] == Some(true);
            self.values[var] = None;
            for &(slot, c) in &self.occ[var] {
                self.free[slot] += c;
                if value {
                    self.fixed[slot] -= c;
                }
            }
        }
    }

    fn enqueue(&mut self, row: usize, queue: &mut Vec<usize>) {
        if row < self.row_count && !self.queued[row] {
            self.queued[row] = true;
            queue.push(row);
        }
    }

    /// Propagates rows to a fixpoint. Returns the first violated row on conflict.
    fn propagate(&mut self, mut queue: Vec<usize>) -> Result<(), usize> {
        let model = self.model;
        let mut forced: Vec<(usize, bool)> = Vec::new();

        while let Some(row) = queue.pop() {
            self.queued[row] = false;
            let c = &model.constraints()[row];
            let (fx, fr, rhs) = (self.fixed[row], self.free[row], c.rhs);
            let upper = c.relation.has_upper();
            let lower = c.relation.has_lower();

            if (upper && fx > rhs) || (lower && fx + fr < rhs) {
                self.clear_queue(&queue);
                return Err(row);
            }
            let max_coef = self.max_coef[row];
            let scan_upper = upper && fx + max_coef > rhs;
            let scan_lower = lower && fx + fr - max_coef < rhs;
            if !scan_upper && !scan_lower {
                continue;
            }

            forced.clear();
            for &(v, coef) in c.expr.terms() {
                if self.values[v.index()].is_some() {
                    continue;
                }
                if scan_upper && fx + coef > rhs {
                    forced.push((v.index(), false));
                } else if scan_lower && fx + fr - coef < rhs {
                    forced.push((v.index(), true));
                }
            }

            for &(var, value) in &forced {
                match self.values[var] {
                    Some(current) if current != value => {
                        self.clear_queue(&queue);
                        return Err(row);
                    }
                    Some(_) => continue,
                    None => {}
                }
                self.assign(var, value);
                for i in 0..self.occ[var].len() {
                    let slot = self.occ[var][i].0;
                    self.enqueue(slot, &mut queue);
                }
            }
        }
        Ok(())
    }

    fn clear_queue(&mut self, queue: &[usize]) {
        for &row in queue {
            self.queued[row] = false;
        }
    }

    fn propagate_var(&mut self, var: usize) -> Result<(), usize> {
        let mut queue = Vec::new();
        for i in 0..self.occ[var].len() {
            let slot = self.occ[var][i].0;
            self.enqueue(slot, &mut queue);
        }
        self.propagate(queue)
    }

    fn propagate_all(&mut self) -> Result<(), usize> {
        let mut queue = Vec::with_capacity(self.row_count);
        for row in 0..self.row_count {
            self.enqueue(row, &mut queue);
        }
        self.propagate(queue)
    }

    fn load_penalties(&self) -> Vec<&'m [Penalty]> {
        let objective = self.objective;
        objective
            .tiers
            .iter()
            .filter_map(|t| match t {
                ObjectiveTier::Load(p) => Some(p.as_slice()),
                ObjectiveTier::Linear(_) => None,
            })
            .collect()
    }

    fn marginal(&self, tiers: &[&[Penalty]], load: i64) -> Vec<i64> {
        let target = self.objective.target;
        tiers
            .iter()
            .map(|p| {
                Objective::load_cost(p, load + self.unit, target) - Objective::load_cost(p, load, target)
            })
            .collect()
    }

    /// Lower bound on the objective below the current node, `None` if no
    /// completion can exist.
    fn bound(&self) -> Option<Score> {
        let objective = self.objective;
        let count = objective.loads.len();
        let lo: Vec<i64> = (0..count).map(|k| self.fixed[self.load_base + k]).collect();
        let hi: Vec<i64> = (0..count)
            .map(|k| lo[k] + self.free[self.load_base + k])
            .collect();
        let tiers = self.load_penalties();
        let mut loads = lo.clone();

        match objective.total_load {
            Some(total) => {
                let remaining = total - lo.iter().sum::<i64>();
                let capacity: i64 = hi.iter().zip(&lo).map(|(h, l)| h - l).sum();
                if remaining < 0 || remaining > capacity {
                    return None;
                }
                if !tiers.is_empty() {
                    let mut heap = BinaryHeap::with_capacity(count);
                    for k in 0..count {
                        if loads[k] + self.unit <= hi[k] {
                            heap.push(Reverse((self.marginal(&tiers, loads[k]), k)));
                        }
                    }
                    for _ in 0..remaining / self.unit {
                        let Reverse((_, k)) = heap.pop()?;
                        loads[k] += self.unit;
                        if loads[k] + self.unit <= hi[k] {
                            heap.push(Reverse((self.marginal(&tiers, loads[k]), k)));
                        }
                    }
                }
            }
            None => {
                for k in 0..count {
                    loads[k] = objective.target.clamp(lo[k], hi[k]);
                }
            }
        }

        let score = objective
            .tiers
            .iter()
            .zip(&self.tier_slots)
            .map(|(tier, slot)| match (tier, slot) {
                (ObjectiveTier::Load(p), _) => loads
                    .iter()
                    .map(|&h| Objective::load_cost(p, h, objective.target))
                    .sum(),
                (ObjectiveTier::Linear(_), Some(slot)) => self.fixed[*slot],
                (ObjectiveTier::Linear(_), None) => 0,
            })
            .collect();
        Some(score)
    }

    /// Largest unmet share `need / free` over the other `>=` rows of `var`.
    fn tightness(&self, var: usize, current: usize) -> f64 {
        let constraints = self.model.constraints();
        let mut best = 0.0;
        for &(slot, _) in &self.occ[var] {
            if slot == current || slot >= self.row_count {
                continue;
            }
            let c = &constraints[slot];
            if c.relation != Relation::GreaterEq || self.free[slot] <= 0 {
                continue;
            }
            let need = c.rhs - self.fixed[slot];
            if need > 0 {
                let share = need as f64 / self.free[slot] as f64;
                if share > best {
                    best = share;
                }
            }
        }
        best
    }

    fn load_of(&self, var: usize) -> i64 {
        self.occ[var]
            .iter()
            .filter(|(slot, _)| *slot >= self.load_base && *slot < self.load_base + self.objective.loads.len())
            .map(|(slot, _)| self.fixed[*slot])
            .min()
            .unwrap_or(0)
    }

    /// Picks the next branching variable and the value to try first.
    fn choose(&mut self) -> Option<(usize, bool)> {
        let model = self.model;
        for (row, c) in model.constraints().iter().enumerate() {
            if c.relation != Relation::Equal || self.free[row] <= 0 || self.fixed[row] >= c.rhs {
                continue;
            }

            let mut best: Option<Candidate> = None;
            let mut first_free = None;
            for &(v, _) in c.expr.terms() {
                let var = v.index();
                if self.values[var].is_some() {
                    continue;
                }
                first_free.get_or_insert(var);

                let mark = self.trail.len();
                self.assign(var, true);
                let bound = match self.propagate_var(var) {
                    Ok(()) => self.bound(),
                    Err(_) => None,
                };
                self.undo(mark);
                let Some(bound) = bound else { continue };

                let candidate = Candidate {
                    var,
                    tightness: self.tightness(var, row),
                    bound,
                    load: self.load_of(var),
                    rank: self.rank[var],
                };
                if best
                    .as_ref()
                    .is_none_or(|b| candidate.cmp_key(b) == Ordering::Less)
                {
                    best = Some(candidate);
                }
            }
            // With no viable candidate the first free variable fails fast.
            return best.map(|b| b.var).or(first_free).map(|v| (v, true));
        }

        self.values
            .iter()
            .position(Option::is_none)
            .map(|v| (v, false))
    }

    pub(crate) fn run(mut self, config: &SolverConfig) -> CpSolution {
        let start = Instant::now();
        let mut stats = SolveStats::default();
        let model = self.model;

        for fixing in model.fixings() {
            let var = fixing.var.index();
            match self.values[var] {
                None => self.assign(var, fixing.value),
                Some(v) if v != fixing.value => {
                    stats.root_conflict = Some(fixing.label.clone());
                    return infeasible(stats, start);
                }
                Some(_) => {}
            }
        }
        if let Err(row) = self.propagate_all() {
            stats.root_conflict = Some(model.constraints()[row].label.clone());
            debug!(constraint = %model.constraints()[row].label, "root propagation failed");
            return infeasible(stats, start);
        }
        let Some(root_bound) = self.bound() else {
            debug!("load capacity cannot absorb the demanded total");
            return infeasible(stats, start);
        };
        debug!(bound = ?root_bound, fixed = self.trail.len(), "root node ready");

        let mut incumbent: Option<(Score, Vec<Option<bool>>)> =
            self.start.take().and_then(|values| {
                if model.is_satisfied(&values) {
                    let score = self.objective.evaluate(&values);
                    debug!(objective = ?score, "search seeded with a start assignment");
                    Some((score, values))
                } else {
                    debug!("start assignment breaks the model, ignored");
                    None
                }
            });
        let mut stack: Vec<Frame> = Vec::new();
        let mut nodes: u64 = 0;

        let status = loop {
            nodes += 1;
            let over_nodes = config.node_limit.is_some_and(|limit| nodes > limit);
            let over_time = nodes % CLOCK_INTERVAL == 0
                && config.time_limit.is_some_and(|limit| start.elapsed() >= limit);
            if over_nodes || over_time {
                stats.limit_reached = true;
                nodes -= 1;
                break if incumbent.is_some() {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Unknown
                };
            }

            let expand = match self.bound() {
                None => false,
                Some(b) => incumbent.as_ref().is_none_or(|(best, _)| b < *best),
            };
            if expand {
                match self.choose() {
                    None => {
                        let score = self.objective.evaluate(&self.values);
                        if incumbent.as_ref().is_none_or(|(best, _)| score < *best) {
                            stats.incumbents += 1;
                            debug!(objective = ?score, nodes, "new incumbent");
                            let proven = score == root_bound;
                            incumbent = Some((score, self.values.clone()));
                            if proven {
                                break SolveStatus::Optimal;
                            }
                        }
                    }
                    Some((var, value)) => {
                        stack.push(Frame {
                            mark: self.trail.len(),
                            var,
                            value,
                            retried: false,
                        });
                        self.assign(var, value);
                        if self.propagate_var(var).is_ok() {
                            continue;
                        }
                    }
                }
            }

            let mut resumed = false;
            while let Some(frame) = stack.pop() {
                self.undo(frame.mark);
                if frame.retried {
                    continue;
                }
                let (var, value) = (frame.var, !frame.value);
                stack.push(Frame {
                    retried: true,
                    ..frame
                });
                self.assign(var, value);
                if self.propagate_var(var).is_ok() {
                    resumed = true;
                    break;
                }
            }
            if !resumed {
                break if incumbent.is_some() {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Infeasible
                };
            }
        };

        stats.nodes = nodes;
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        match incumbent {
            Some((score, values)) => CpSolution {
                status,
                values,
                objective: Some(score),
                bound: Some(root_bound),
                stats,
            },
            None => {
                let mut solution = CpSolution::empty(status, stats);
                solution.bound = Some(root_bound);
                solution
            }
        }
    }
}

fn infeasible(mut stats: SolveStats, start: Instant) -> CpSolution {
    stats.elapsed_ms = start.elapsed().as_millis() as u64;
    CpSolution::empty(SolveStatus::Infeasible, stats)
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{ConstraintFamily, LinearExpr, Model, PenaltyKind};

    /// Three loads of two 8-hour slots each, exactly three slots to fill.
    fn balance_model() -> Model {
        let mut m = Model::new("balance");
        let vars: Vec<_> = (0..6).map(|_| m.new_var()).collect();
        m.add_constraint(
            LinearExpr::sum(vars.iter().copied()),
            Relation::Equal,
            3,
            ConstraintFamily::Coverage,
            "three shifts",
        );
        let loads = (0..3)
            .map(|w| {
                LinearExpr::new()
                    .with_term(vars[2 * w], 8)
                    .with_term(vars[2 * w + 1], 8)
            })
            .collect();
        m.set_objective(Objective {
            loads,
            target: 8,
            tiers: vec![
                ObjectiveTier::Load(vec![Penalty::new(PenaltyKind::Overtime, 1)]),
                ObjectiveTier::Load(vec![Penalty::new(PenaltyKind::SquaredDeviation, 1)]),
            ],
            total_load: Some(24),
        });
        m
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(16, 8), 8);
        assert_eq!(gcd(0, 8), 8);
        assert_eq!(gcd(12, 18), 6);
    }

    #[test]
    fn test_root_bound_water_filling() {
        let m = balance_model();
        let search = Search::new(&m, 0);
        // 24 hours spread as 8/8/8: no overtime, no deviation
        assert_eq!(search.bound(), Some(vec![0, 0]));
    }

    #[test]
    fn test_bound_detects_capacity_shortage() {
        let mut m = balance_model();
        let mut objective = m.objective().clone();
        objective.total_load = Some(64);
        m.set_objective(objective);
        assert_eq!(Search::new(&m, 0).bound(), None);
    }

    #[test]
    fn test_balanced_optimum() {
        let m = balance_model();
        let sol = Search::new(&m, 0).run(&SolverConfig::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_eq!(sol.objective, Some(vec![0, 0]));
        assert!(m.is_satisfied(&sol.values));
    }

    #[test]
    fn test_propagation_conflict_reports_row() {
        let mut m = Model::new("conflict");
        let a = m.new_var();
        m.add_constraint(LinearExpr::sum([a]), Relation::GreaterEq, 1, ConstraintFamily::Coverage, "need a");
        m.fix(a, false, ConstraintFamily::Availability, "a away");
        let sol = Search::new(&m, 0).run(&SolverConfig::default());
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert_eq!(sol.stats.root_conflict.as_deref(), Some("need a"));
    }

    #[test]
    fn test_conflicting_fixings() {
        let mut m = Model::new("fixings");
        let a = m.new_var();
        m.fix(a, true, ConstraintFamily::Coverage, "a on");
        m.fix(a, false, ConstraintFamily::Availability, "a off");
        let sol = Search::new(&m, 0).run(&SolverConfig::default());
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert_eq!(sol.stats.root_conflict.as_deref(), Some("a off"));
    }

    #[test]
    fn test_infeasible_after_search() {
        // x0 + x1 == 1, x1 + x2 == 1, x0 + x2 == 1: odd cycle, no 0-1 solution
        let mut m = Model::new("odd-cycle");
        let x: Vec<_> = (0..3).map(|_| m.new_var()).collect();
        for (a, b) in [(0, 1), (1, 2), (0, 2)] {
            m.add_constraint(
                LinearExpr::sum([x[a], x[b]]),
                Relation::Equal,
                1,
                ConstraintFamily::Coverage,
                format!("pair {a}{b}"),
            );
        }
        let sol = Search::new(&m, 0).run(&SolverConfig::default());
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert!(sol.stats.nodes > 0);
    }

    #[test]
    fn test_node_limit_without_incumbent() {
        let m = balance_model();
        let sol = Search::new(&m, 0).run(&SolverConfig::default().with_node_limit(0));
        assert_eq!(sol.status, SolveStatus::Unknown);
        assert!(sol.stats.limit_reached);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_start_assignment_is_first_incumbent() {
        let m = balance_model();
        // loads 16/8/0: one load over target
        let start = [true, true, true, false, false, false];
        let sol = Search::new(&m, 0)
            .with_start(&start)
            .run(&SolverConfig::default().with_node_limit(0));
        assert_eq!(sol.status, SolveStatus::Feasible);
        assert_eq!(sol.objective, Some(vec![8, 128]));
        assert_eq!(sol.stats.incumbents, 0);

        let sol = Search::new(&m, 0).with_start(&start).run(&SolverConfig::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_eq!(sol.objective, Some(vec![0, 0]));
    }

    #[test]
    fn test_optimal_start_needs_no_search() {
        let m = balance_model();
        let start = [true, false, true, false, true, false];
        let sol = Search::new(&m, 0).with_start(&start).run(&SolverConfig::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_eq!(sol.stats.nodes, 1);
        assert_eq!(sol.values, start.map(Some).to_vec());
    }

    #[test]
    fn test_infeasible_start_ignored() {
        let m = balance_model();
        // four shifts where exactly three are required
        let start = [true, true, true, true, false, false];
        let sol = Search::new(&m, 0)
            .with_start(&start)
            .run(&SolverConfig::default().with_node_limit(0));
        assert_eq!(sol.status, SolveStatus::Unknown);
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let m = balance_model();
        let config = SolverConfig::default().with_seed(42);
        let a = Search::new(&m, 42).run(&config);
        let b = Search::new(&m, 42).run(&config);
        assert_eq!(a.values, b.values);
        assert_eq!(a.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_linear_tier_bound_uses_fixed_part() {
        let mut m = Model::new("linear");
        let a = m.new_var();
        let b = m.new_var();
        m.add_constraint(LinearExpr::sum([a, b]), Relation::Equal, 1, ConstraintFamily::Coverage, "one");
        m.fix(a, true, ConstraintFamily::Coverage, "a forced");
        m.set_objective(Objective {
            loads: Vec::new(),
            target: 0,
            tiers: vec![ObjectiveTier::Linear(LinearExpr::new().with_term(a, 3))],
            total_load: None,
        });
        let mut search = Search::new(&m, 0);
        assert_eq!(search.bound(), Some(vec![0]));
        assert!(search.propagate_all().is_ok());
        search.assign(a.index(), true);
        assert_eq!(search.bound(), Some(vec![3]));
    }
}
