//! Tenor selection strategies.
//!
//! A [`TenorSelection`] is one unit of perturbation: every tenor it holds is
//! bumped together and produces one delta per affected pricer.
//!
//! | Strategy | Selections | Name |
//! |----------|------------|------|
//! | Uniform | one, all tenors of all curves | `all` |
//! | Parallel | one per curve, in topological order | curve name |
//! | ByTenor | one per distinct tenor point | `owner/tenor` |
//!
//! ByTenor merges tenors of different curves that denote the same point
//! (same name and maturity) so a single bump moves all of them. The owner
//! used for labelling is the most dependent curve holding the point, found
//! by scanning the graph in reverse topological order.

use crate::config::{BumpType, SensitivityConfig};
use crate::graph::DependencyGraph;
use greeks_core::market_data::curves::{CurveHandle, CurveTenor};
use greeks_core::traits::BumpTarget;
use std::collections::BTreeSet;
use std::fmt;

/// Label used for element and tenor columns of whole-market selections.
pub const ALL: &str = "all";

/// Reference to one tenor of one curve.
#[derive(Debug, Clone)]
pub struct TenorRef {
    curve: CurveHandle,
    index: usize,
    name: String,
    maturity: f64,
}

impl TenorRef {
    fn new(curve: &CurveHandle, index: usize, tenor: &CurveTenor) -> Self {
        Self {
            curve: curve.clone(),
            index,
            name: tenor.name().to_string(),
            maturity: tenor.maturity(),
        }
    }

    /// Curve holding the tenor.
    pub fn curve(&self) -> &CurveHandle {
        &self.curve
    }

    /// Index of the tenor within its curve.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Tenor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tenor maturity.
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    fn same_point(&self, tenor: &CurveTenor) -> bool {
        self.name == tenor.name() && self.maturity.to_bits() == tenor.maturity().to_bits()
    }
}

impl fmt::Display for TenorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.curve.name(), self.name)
    }
}

/// A named group of tenors bumped as one unit.
#[derive(Debug, Clone)]
pub struct TenorSelection {
    name: String,
    kind: BumpType,
    tenors: Vec<TenorRef>,
    curves: Vec<CurveHandle>,
}

impl TenorSelection {
    /// Selection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strategy that produced the selection.
    pub fn kind(&self) -> BumpType {
        self.kind
    }

    /// Tenors bumped together.
    pub fn tenors(&self) -> &[TenorRef] {
        &self.tenors
    }

    /// Curves the tenors belong to, owner first.
    pub fn curves(&self) -> &[CurveHandle] {
        &self.curves
    }

    /// Curve used for labelling.
    pub fn owner(&self) -> Option<&CurveHandle> {
        self.curves.first()
    }

    /// True for whole-market selections, which report every pricer.
    pub fn is_uniform(&self) -> bool {
        self.kind == BumpType::Uniform
    }

    /// Element column: owner curve name, or `all` for uniform selections.
    pub fn element(&self) -> String {
        match (self.kind, self.owner()) {
            (BumpType::Uniform, _) | (_, None) => ALL.to_string(),
            (_, Some(owner)) => owner.name().to_string(),
        }
    }

    /// Tenor column: the tenor name for ByTenor selections, `all` otherwise.
    pub fn tenor_label(&self) -> String {
        match (self.kind, self.tenors.first()) {
            (BumpType::ByTenor, Some(tenor)) => tenor.name().to_string(),
            _ => ALL.to_string(),
        }
    }

    /// Category column: the curves' common kind, `Mixed` otherwise.
    pub fn category(&self) -> String {
        let mut kinds = self.curves.iter().map(CurveHandle::kind);
        match kinds.next() {
            Some(first) if kinds.all(|k| k == first) => first.label().to_string(),
            Some(_) => "Mixed".to_string(),
            None => ALL.to_string(),
        }
    }
}

/// Which curves and tenors may be bumped.
#[derive(Debug, Clone, PartialEq)]
pub struct TenorFilter {
    targets: BumpTarget,
    curves: Option<BTreeSet<String>>,
    tenors: Option<BTreeSet<String>>,
}

impl TenorFilter {
    /// Filter on curve categories only.
    pub fn new(targets: BumpTarget) -> Self {
        Self {
            targets,
            curves: None,
            tenors: None,
        }
    }

    /// Filter described by a run configuration.
    pub fn from_config(config: &SensitivityConfig) -> Self {
        Self {
            targets: config.targets,
            curves: config.curve_filter.clone(),
            tenors: config.tenor_filter.clone(),
        }
    }

    /// Restricts to the named curves.
    pub fn with_curves<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.curves = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to the named tenors.
    pub fn with_tenors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tenors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Category bits of the filter.
    pub fn targets(&self) -> BumpTarget {
        self.targets
    }

    /// True when the curve's kind and name pass.
    pub fn accepts_curve(&self, curve: &CurveHandle) -> bool {
        self.targets
            .categories()
            .intersects(curve.kind().bump_target())
            && self.curves.as_ref().map_or(true, |n| n.contains(curve.name()))
    }

    /// True when the tenor passes (spot tenors need `INCLUDE_SPOT`).
    pub fn accepts_tenor(&self, tenor: &CurveTenor) -> bool {
        (!tenor.convention().is_spot() || self.targets.includes_spot())
            && self.tenors.as_ref().map_or(true, |n| n.contains(tenor.name()))
    }

    fn accepted<'a>(&'a self, curve: &'a CurveHandle) -> Vec<TenorRef> {
        if !self.accepts_curve(curve) {
            return Vec::new();
        }
        let guard = curve.read();
        guard
            .tenors()
            .iter()
            .enumerate()
            .filter(|(_, t)| self.accepts_tenor(t))
            .map(|(i, t)| TenorRef::new(curve, i, t))
            .collect()
    }
}

impl BumpType {
    /// Partitions the graph's tenors into selections.
    pub fn select(self, graph: &DependencyGraph, filter: &TenorFilter) -> Vec<TenorSelection> {
        match self {
            BumpType::Uniform => select_uniform(graph, filter),
            BumpType::Parallel => select_parallel(graph, filter),
            BumpType::ByTenor => select_by_tenor(graph, filter),
        }
    }
}

fn select_uniform(graph: &DependencyGraph, filter: &TenorFilter) -> Vec<TenorSelection> {
    let mut tenors = Vec::new();
    let mut curves = Vec::new();
    for curve in graph.curves() {
        let accepted = filter.accepted(curve);
        if !accepted.is_empty() {
            curves.push(curve.clone());
            tenors.extend(accepted);
        }
    }
    if tenors.is_empty() {
        return Vec::new();
    }
    vec![TenorSelection {
        name: ALL.to_string(),
        kind: BumpType::Uniform,
        tenors,
        curves,
    }]
}

fn select_parallel(graph: &DependencyGraph, filter: &TenorFilter) -> Vec<TenorSelection> {
    graph
        .curves()
        .iter()
        .filter_map(|curve| {
            let tenors = filter.accepted(curve);
            (!tenors.is_empty()).then(|| TenorSelection {
                name: curve.name().to_string(),
                kind: BumpType::Parallel,
                tenors,
                curves: vec![curve.clone()],
            })
        })
        .collect()
}

fn select_by_tenor(graph: &DependencyGraph, filter: &TenorFilter) -> Vec<TenorSelection> {
    let mut selections: Vec<TenorSelection> = Vec::new();
    for curve in graph.curves().iter().rev() {
        if !filter.accepts_curve(curve) {
            continue;
        }
        let guard = curve.read();
        for (index, tenor) in guard.tenors().iter().enumerate() {
            if !filter.accepts_tenor(tenor) {
                continue;
            }
            let tenor_ref = TenorRef::new(curve, index, tenor);
            match selections
                .iter_mut()
                .find(|s| s.tenors[0].same_point(tenor))
            {
                Some(selection) => {
                    selection.tenors.push(tenor_ref);
                    if !selection.curves.contains(curve) {
                        selection.curves.push(curve.clone());
                    }
                }
                None => selections.push(TenorSelection {
                    name: tenor_ref.to_string(),
                    kind: BumpType::ByTenor,
                    tenors: vec![tenor_ref],
                    curves: vec![curve.clone()],
                }),
            }
        }
    }
    selections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{basis_curve, curve, flat_curve};
    use greeks_core::market_data::curves::{CurveKind, QuoteConvention};

    fn two_curve_graph() -> (DependencyGraph, CurveHandle, CurveHandle) {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 2.0, 5.0], 0.01);
        let libor = flat_curve("LIBOR", CurveKind::Projection, &[1.0, 3.0, 5.0], 0.012);
        let graph = DependencyGraph::from_roots([ois.clone(), libor.clone()]).unwrap();
        (graph, ois, libor)
    }

    #[test]
    fn test_uniform_single_selection() {
        let (graph, _, _) = two_curve_graph();
        let selections =
            BumpType::Uniform.select(&graph, &TenorFilter::new(BumpTarget::INTEREST_RATES));
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].name(), "all");
        assert_eq!(selections[0].tenors().len(), 6);
        assert_eq!(selections[0].element(), "all");
        assert_eq!(selections[0].category(), "Mixed");
    }

    #[test]
    fn test_parallel_one_per_curve() {
        let (graph, _, _) = two_curve_graph();
        let selections =
            BumpType::Parallel.select(&graph, &TenorFilter::new(BumpTarget::INTEREST_RATES));
        let names: Vec<&str> = selections.iter().map(TenorSelection::name).collect();
        assert_eq!(names, vec!["OIS", "LIBOR"]);
        assert!(selections.iter().all(|s| s.tenors().len() == 3));
        assert_eq!(selections[1].category(), "Projection");
        assert_eq!(selections[0].tenor_label(), "all");
    }

    #[test]
    fn test_by_tenor_merges_same_points() {
        let (graph, _, _) = two_curve_graph();
        let selections =
            BumpType::ByTenor.select(&graph, &TenorFilter::new(BumpTarget::INTEREST_RATES));
        // 1Y and 5Y are shared, 2Y and 3Y are not.
        assert_eq!(selections.len(), 4);
        let merged: Vec<&TenorSelection> =
            selections.iter().filter(|s| s.tenors().len() == 2).collect();
        assert_eq!(merged.len(), 2);
        // LIBOR comes after OIS in topological order, so it is scanned first.
        assert!(merged.iter().all(|s| s.element() == "LIBOR"));
        let names: Vec<&str> = selections.iter().map(TenorSelection::name).collect();
        assert_eq!(names, vec!["LIBOR/1Y", "LIBOR/3Y", "LIBOR/5Y", "OIS/2Y"]);
    }

    #[test]
    fn test_by_tenor_owner_is_most_dependent() {
        let ois = flat_curve("OIS", CurveKind::Discount, &[1.0, 5.0], 0.01);
        let basis = basis_curve("3M", &ois, &[1.0, 5.0], 0.001);
        let graph = DependencyGraph::from_roots([ois, basis]).unwrap();
        let filter = TenorFilter::new(BumpTarget::INTEREST_RATES | BumpTarget::INTEREST_RATE_BASIS);
        let selections = BumpType::ByTenor.select(&graph, &filter);
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[0].owner().unwrap().name(), "3M");
        assert_eq!(selections[0].curves().len(), 2);
        assert_eq!(selections[0].tenor_label(), "1Y");
    }

    #[test]
    fn test_filters_by_name() {
        let (graph, _, _) = two_curve_graph();
        let filter = TenorFilter::new(BumpTarget::INTEREST_RATES)
            .with_curves(["OIS"])
            .with_tenors(["5Y", "2Y"]);
        let selections = BumpType::ByTenor.select(&graph, &filter);
        let names: Vec<&str> = selections.iter().map(TenorSelection::name).collect();
        assert_eq!(names, vec!["OIS/2Y", "OIS/5Y"]);
    }

    #[test]
    fn test_spot_needs_include_spot() {
        let fx = curve(
            "EURUSD",
            CurveKind::Fx,
            &[("SPOT", 0.0, 1.10, QuoteConvention::Spot), ("1Y", 1.0, 1.12, QuoteConvention::Price)],
        );
        let graph = DependencyGraph::from_roots([fx]).unwrap();

        let without = BumpType::Uniform.select(&graph, &TenorFilter::new(BumpTarget::FX_RATES));
        assert_eq!(without[0].tenors().len(), 1);

        let with = BumpType::Uniform.select(
            &graph,
            &TenorFilter::new(BumpTarget::FX_RATES | BumpTarget::INCLUDE_SPOT),
        );
        assert_eq!(with[0].tenors().len(), 2);
    }

    #[test]
    fn test_untargeted_kind_yields_nothing() {
        let (graph, _, _) = two_curve_graph();
        assert!(BumpType::Uniform
            .select(&graph, &TenorFilter::new(BumpTarget::CREDIT_QUOTES))
            .is_empty());
    }
}
