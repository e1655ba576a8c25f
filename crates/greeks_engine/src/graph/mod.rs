//! Curve dependency graph.
//!
//! This module implements:
//! - Discovery of every curve a set of pricers depends on, through declared
//!   prerequisite curves
//! - Topological ordering (prerequisites first) by depth-first post-order
//! - Cycle detection, reported as a configuration error
//! - Dependent lookup used to decide which curves a bump must refit
//!
//! ## Architecture
//!
//! ```text
//!   OIS ◄── 3M basis ◄── 6M basis        topological order:
//!    ▲                                    [OIS, 3M, 6M, CDS]
//!    └──── CDS (credit)
//! ```
//!
//! The graph is rebuilt for every sensitivity run from the evaluators'
//! current dependencies.

use crate::error::ConfigError;
use crate::evaluator::PricerEvaluator;
use greeks_core::market_data::curves::{CurveHandle, CurveId};
use greeks_core::traits::BumpTarget;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Curves in dependency order: every curve appears after its prerequisites.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    curves: Vec<CurveHandle>,
    positions: HashMap<CurveId, usize>,
    prerequisites: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds the graph of curves relevant to `targets` for the given evaluators.
    ///
    /// All curves the evaluators read are traversed (and checked for cycles);
    /// the graph keeps those selected by `targets` together with every curve
    /// derived from one of them, so that dependents are refit when a
    /// selected curve is bumped.
    ///
    /// # Errors
    ///
    /// `ConfigError::CyclicDependency` when prerequisites form a loop.
    pub fn build(evaluators: &[PricerEvaluator], targets: BumpTarget) -> Result<Self, ConfigError> {
        let roots = evaluators.iter().flat_map(PricerEvaluator::curves);
        Ok(Self::from_roots(roots)?.restricted(targets))
    }

    /// Builds the full graph reachable from `roots`.
    ///
    /// # Errors
    ///
    /// `ConfigError::CyclicDependency` when prerequisites form a loop.
    pub fn from_roots<I>(roots: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = CurveHandle>,
    {
        let mut marks: HashMap<CurveId, Mark> = HashMap::new();
        let mut order: Vec<CurveHandle> = Vec::new();
        let mut path: Vec<CurveHandle> = Vec::new();
        for root in roots {
            visit(&root, &mut marks, &mut order, &mut path)?;
        }
        Ok(Self::from_ordered(order))
    }

    fn from_ordered(curves: Vec<CurveHandle>) -> Self {
        let positions: HashMap<CurveId, usize> = curves
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id(), i))
            .collect();
        let mut prerequisites = vec![Vec::new(); curves.len()];
        let mut dependents = vec![Vec::new(); curves.len()];
        for (i, curve) in curves.iter().enumerate() {
            for prerequisite in curve.prerequisites() {
                if let Some(&p) = positions.get(&prerequisite.id()) {
                    prerequisites[i].push(p);
                    dependents[p].push(i);
                }
            }
        }
        Self {
            curves,
            positions,
            prerequisites,
            dependents,
        }
    }

    fn restricted(self, targets: BumpTarget) -> Self {
        let categories = targets.categories();
        let mut relevant = vec![false; self.curves.len()];
        for (i, curve) in self.curves.iter().enumerate() {
            relevant[i] = categories.intersects(curve.kind().bump_target())
                || self.prerequisites[i].iter().any(|&p| relevant[p]);
        }
        let kept = self
            .curves
            .into_iter()
            .zip(relevant)
            .filter_map(|(curve, keep)| keep.then_some(curve))
            .collect();
        Self::from_ordered(kept)
    }

    /// Curves in topological order.
    #[inline]
    pub fn curves(&self) -> &[CurveHandle] {
        &self.curves
    }

    /// Number of curves.
    #[inline]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// True when the graph is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Position of a curve in topological order.
    pub fn position(&self, id: CurveId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// True when the curve is part of the graph.
    pub fn contains(&self, id: CurveId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Direct prerequisites of a curve that are part of the graph.
    pub fn prerequisites_of(&self, id: CurveId) -> Vec<&CurveHandle> {
        self.position(id)
            .map(|i| self.prerequisites[i].iter().map(|&p| &self.curves[p]).collect())
            .unwrap_or_default()
    }

    /// Curves depending on any of `touched`, directly or transitively,
    /// excluding `touched` itself, in topological order.
    pub fn dependents_of(&self, touched: &[CurveId]) -> Vec<CurveHandle> {
        let start: HashSet<usize> = touched.iter().filter_map(|id| self.position(*id)).collect();
        let mut reached = vec![false; self.curves.len()];
        let mut stack: Vec<usize> = start.iter().copied().collect();
        while let Some(i) = stack.pop() {
            for &d in &self.dependents[i] {
                if !reached[d] {
                    reached[d] = true;
                    stack.push(d);
                }
            }
        }
        reached
            .iter()
            .enumerate()
            .filter(|(i, &r)| r && !start.contains(i))
            .map(|(i, _)| self.curves[i].clone())
            .collect()
    }

    /// True when `curve` is derived from `prerequisite`, directly or transitively.
    pub fn depends_on(&self, curve: CurveId, prerequisite: CurveId) -> bool {
        let (Some(c), Some(p)) = (self.position(curve), self.position(prerequisite)) else {
            return false;
        };
        let mut stack = vec![c];
        let mut seen = HashSet::new();
        while let Some(i) = stack.pop() {
            for &q in &self.prerequisites[i] {
                if q == p {
                    return true;
                }
                if seen.insert(q) {
                    stack.push(q);
                }
            }
        }
        false
    }
}

fn visit(
    curve: &CurveHandle,
    marks: &mut HashMap<CurveId, Mark>,
    order: &mut Vec<CurveHandle>,
    path: &mut Vec<CurveHandle>,
) -> Result<(), ConfigError> {
    match marks.get(&curve.id()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path.iter().position(|c| c.id() == curve.id()).unwrap_or(0);
            let mut names: Vec<&str> = path[start..].iter().map(CurveHandle::name).collect();
            names.push(curve.name());
            return Err(ConfigError::CyclicDependency {
                path: names.join(" -> "),
            });
        }
        None => {}
    }

    marks.insert(curve.id(), Mark::Visiting);
    path.push(curve.clone());
    for prerequisite in curve.prerequisites() {
        visit(&prerequisite, marks, order, path)?;
    }
    path.pop();
    marks.insert(curve.id(), Mark::Done);
    order.push(curve.clone());
    Ok(())
}
