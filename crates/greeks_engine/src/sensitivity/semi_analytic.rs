//! Chain-rule sensitivities from pricer-supplied ordinate derivatives.
//!
//! With `o = o(q)` the fitted ordinates of a curve as functions of the
//! quotes of a selection, and `m(o)` a pricer measure:
//!
//! ```text
//! ∂m/∂q_i      = Σ_k ∂m/∂o_k · ∂o_k/∂q_i
//! ∂²m/∂q_i∂q_j = Σ_k ∂²m/∂o_k² · ∂o_k/∂q_i · ∂o_k/∂q_j + ∂m/∂o_k · ∂²o_k/∂q_i∂q_j
//! ```
//!
//! A curve whose own tenors are the only ones selected uses its
//! calibrator's quote Jacobian. A curve derived from a selected curve is
//! differentiated through its prerequisites: the chain from the selected
//! curves down to it is refit on private copies, leaving the market as it
//! is. Results are reported in the same units as the finite-difference
//! calculator for the configured bump sizes `u` (up) and `d` (down):
//!
//! | Column | Scaled | Unscaled |
//! |--------|--------|----------|
//! | delta | `Σ g` | `Σ g · (u + d)` |
//! | gamma | `Σ H · (u² + d²) / (u + d)` | `Σ H · (u² + d²) / 2` |
//!
//! where the sums run over the tenors of the selection, cross terms included.
//! Tenors of defaulted curves contribute nothing.

use crate::bump::refits_dependent;
use crate::config::SensitivityConfig;
use crate::error::{ConfigError, Result, SensitivityError};
use crate::evaluator::PricerEvaluator;
use crate::graph::DependencyGraph;
use crate::results::{ResultRow, ResultTable};
use crate::selection::{TenorFilter, TenorSelection};
use greeks_core::market_data::curves::{CurveHandle, CurveId};
use greeks_core::traits::{central_difference_jacobian, OrdinateDerivatives, QuoteJacobian};
use greeks_core::types::CalibrationError;
use std::collections::HashMap;
use tracing::{debug, info};

/// `∂m/∂q_i = Σ_k ∂m/∂o_k · ∂o_k/∂q_i`.
pub fn propagate_gradient(ordinate_gradient: &[f64], jacobian: &QuoteJacobian) -> Vec<f64> {
    let n_ordinates = ordinate_gradient.len().min(jacobian.n_ordinates());
    (0..jacobian.n_quotes())
        .map(|i| {
            (0..n_ordinates)
                .map(|k| ordinate_gradient[k] * jacobian.first(k, i))
                .sum()
        })
        .collect()
}

/// Symmetric quote Hessian from the ordinate gradient, the diagonal ordinate
/// curvature (zero when absent) and the Jacobian's second-order terms.
pub fn propagate_hessian(
    ordinate_gradient: &[f64],
    ordinate_curvature: Option<&[f64]>,
    jacobian: &QuoteJacobian,
) -> Vec<Vec<f64>> {
    let n = jacobian.n_quotes();
    let n_ordinates = ordinate_gradient.len().min(jacobian.n_ordinates());
    let mut hessian = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let mut value = 0.0;
            for k in 0..n_ordinates {
                if let Some(c) = ordinate_curvature.and_then(|c| c.get(k)) {
                    value += c * jacobian.first(k, i) * jacobian.first(k, j);
                }
                if jacobian.has_second_order() {
                    value += ordinate_gradient[k] * jacobian.second(k, i, j);
                }
            }
            hessian[i][j] = value;
            hessian[j][i] = value;
        }
    }
    hessian
}

/// Semi-analytic counterpart of the finite-difference calculator.
///
/// Pricers report `∂m/∂o` and a diagonal `∂²m/∂o²` per curve they read, so
/// second-order terms between ordinates of two different curves are taken
/// as zero. Every term that arises through calibration, including those
/// between tenors of different curves of one selection, is kept.
#[derive(Debug, Clone)]
pub struct SemiAnalyticCalculator<'c> {
    config: &'c SensitivityConfig,
}

impl<'c> SemiAnalyticCalculator<'c> {
    /// Calculator for an already validated configuration.
    pub fn new(config: &'c SensitivityConfig) -> Self {
        Self { config }
    }

    /// Sensitivity rows, selection by selection, without touching any curve.
    ///
    /// # Errors
    ///
    /// * `ConfigError::SemiAnalyticUnsupported` - a pricer cannot supply
    ///   ordinate derivatives (checked before anything is computed)
    /// * `SensitivityError::Calibration` - a curve's quote Jacobian failed
    /// * `SensitivityError::Pricing` - a pricer's derivatives failed
    pub fn compute(&self, evaluators: &[PricerEvaluator]) -> Result<ResultTable> {
        for evaluator in evaluators {
            if !evaluator.pricer().supports_ordinate_derivatives(evaluator.measure()) {
                return Err(ConfigError::SemiAnalyticUnsupported {
                    pricer: evaluator.label().to_string(),
                    measure: evaluator.measure().to_string(),
                }
                .into());
            }
        }

        let graph = DependencyGraph::build(evaluators, self.config.targets)?;
        let selections = self
            .config
            .bump_type
            .select(&graph, &TenorFilter::from_config(self.config));
        info!(
            evaluators = evaluators.len(),
            curves = graph.len(),
            selections = selections.len(),
            "semi-analytic sensitivities"
        );

        let mut derivatives: HashMap<(usize, CurveId), OrdinateDerivatives> = HashMap::new();
        let mut table = ResultTable::new();
        for selection in &selections {
            let mut jacobians: HashMap<CurveId, Option<QuoteJacobian>> = HashMap::new();
            for (index, evaluator) in evaluators.iter().enumerate() {
                if !selection.is_uniform() && !evaluator.depends_on_any(selection.curves()) {
                    continue;
                }
                let row = self.row(&graph, selection, index, evaluator, &mut jacobians, &mut derivatives)?;
                table.push(row);
            }
        }
        info!(rows = table.len(), "semi-analytic sensitivities done");
        Ok(table)
    }

    fn row(
        &self,
        graph: &DependencyGraph,
        selection: &TenorSelection,
        index: usize,
        evaluator: &PricerEvaluator,
        jacobians: &mut HashMap<CurveId, Option<QuoteJacobian>>,
        derivatives: &mut HashMap<(usize, CurveId), OrdinateDerivatives>,
    ) -> Result<ResultRow> {
        let (up, down) = (self.config.up, self.config.down);
        let width = up + down;

        let mut gradient_sum = 0.0;
        let mut hessian_sum = 0.0;
        for curve in evaluator.curves() {
            if !jacobians.contains_key(&curve.id()) {
                let jacobian = self.selection_jacobian(graph, selection, &curve)?;
                jacobians.insert(curve.id(), jacobian);
            }
            let Some(jacobian) = &jacobians[&curve.id()] else {
                continue;
            };

            let key = (index, curve.id());
            if !derivatives.contains_key(&key) {
                let computed = evaluator
                    .pricer()
                    .ordinate_derivatives(evaluator.measure(), &curve)
                    .map_err(|source| evaluator.pricing_error(selection.name(), source))?;
                derivatives.insert(key, computed);
            }
            let ordinate = &derivatives[&key];

            gradient_sum += propagate_gradient(&ordinate.gradient, jacobian).iter().sum::<f64>();
            if self.config.calc_gamma {
                hessian_sum += propagate_hessian(&ordinate.gradient, ordinate.curvature.as_deref(), jacobian)
                    .iter()
                    .flatten()
                    .sum::<f64>();
            }
        }

        let delta = match (width > 0.0, self.config.scale_delta) {
            (false, _) => 0.0,
            (true, true) => gradient_sum,
            (true, false) => gradient_sum * width,
        };
        debug!(selection = selection.name(), pricer = evaluator.label(), delta, "chain rule");

        let category = self
            .config
            .category
            .clone()
            .unwrap_or_else(|| selection.category());
        let mut row = ResultRow::new(
            category,
            selection.element(),
            selection.tenor_label(),
            evaluator.label(),
            delta,
        );
        if self.config.calc_gamma {
            let second = hessian_sum * (up * up + down * down) / 2.0;
            let gamma = match (width > 0.0, self.config.scale_delta) {
                (false, _) => 0.0,
                (true, true) => second / (width / 2.0),
                (true, false) => second,
            };
            row = row.with_gamma(gamma);
        }
        Ok(row)
    }

    /// `∂o/∂q` of `curve`'s ordinates with respect to the selection's tenors,
    /// one column per tenor. `None` when no selected tenor reaches the curve.
    fn selection_jacobian(
        &self,
        graph: &DependencyGraph,
        selection: &TenorSelection,
        curve: &CurveHandle,
    ) -> Result<Option<QuoteJacobian>> {
        let selected = selection.curves().iter().any(|c| c == curve);
        let upstream: Vec<&CurveHandle> = selection
            .curves()
            .iter()
            .filter(|c| graph.depends_on(curve.id(), c.id()))
            .collect();
        if !selected && (upstream.is_empty() || !refits_dependent(curve.kind(), self.config.flags)) {
            return Ok(None);
        }

        let live: Vec<bool> = selection
            .tenors()
            .iter()
            .map(|t| t.curve().read().default_time().is_none())
            .collect();
        let second_order = self.config.calc_gamma;
        let jacobian = if upstream.is_empty() {
            curve
                .read()
                .quote_jacobian(second_order)
                .map(|own| own_columns(&own, selection, curve, &live))
        } else {
            let chain = self.refit_chain(graph, selection, curve);
            central_difference_jacobian(selection.tenors().len(), second_order, |shifts| {
                sandbox_ordinates(graph, selection, &chain, curve.id(), &live, shifts)
            })
        };
        jacobian
            .map(Some)
            .map_err(|source| SensitivityError::Calibration {
                selection: selection.name().to_string(),
                curve: curve.name().to_string(),
                source,
            })
    }

    /// Curves a bump of `selection` refits on its way to `target`, in
    /// topological order, `target` last.
    fn refit_chain(
        &self,
        graph: &DependencyGraph,
        selection: &TenorSelection,
        target: &CurveHandle,
    ) -> Vec<CurveHandle> {
        let touched: Vec<CurveId> = selection.curves().iter().map(CurveHandle::id).collect();
        graph
            .curves()
            .iter()
            .filter(|c| c.id() == target.id() || graph.depends_on(target.id(), c.id()))
            .filter(|c| {
                touched.contains(&c.id())
                    || (touched.iter().any(|&t| graph.depends_on(c.id(), t))
                        && refits_dependent(c.kind(), self.config.flags))
            })
            .cloned()
            .collect()
    }
}

/// Restricts a curve's own quote Jacobian to the selection's columns.
fn own_columns(
    own: &QuoteJacobian,
    selection: &TenorSelection,
    curve: &CurveHandle,
    live: &[bool],
) -> QuoteJacobian {
    let columns: Vec<Option<usize>> = selection
        .tenors()
        .iter()
        .zip(live)
        .map(|(t, &is_live)| {
            (is_live && t.curve() == curve && t.index() < own.n_quotes()).then(|| t.index())
        })
        .collect();
    let first = (0..own.n_ordinates())
        .map(|k| {
            columns
                .iter()
                .map(|c| c.map_or(0.0, |i| own.first(k, i)))
                .collect()
        })
        .collect();
    let second = own.has_second_order().then(|| {
        (0..own.n_ordinates())
            .map(|k| {
                columns
                    .iter()
                    .map(|ci| {
                        columns
                            .iter()
                            .map(|cj| match (ci, cj) {
                                (Some(i), Some(j)) => own.second(k, *i, *j),
                                _ => 0.0,
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect()
    });
    QuoteJacobian::new(first, second)
}

/// Ordinates of `target` after shifting selection tenors and refitting
/// copies of `chain`. The market curves are only read.
fn sandbox_ordinates(
    graph: &DependencyGraph,
    selection: &TenorSelection,
    chain: &[CurveHandle],
    target: CurveId,
    live: &[bool],
    shifts: &[(usize, f64)],
) -> std::result::Result<Vec<f64>, CalibrationError> {
    let mut copies: HashMap<CurveId, CurveHandle> = HashMap::new();
    for curve in chain {
        let mut copy = curve.read().clone();
        for &(column, dq) in shifts {
            let tenor = &selection.tenors()[column];
            if !live[column] || tenor.curve() != curve {
                continue;
            }
            let quote = copy.tenor(tenor.index()).map_or(0.0, |t| t.quote());
            copy.set_quote(tenor.index(), quote + dq)?;
        }
        for prerequisite in graph.prerequisites_of(curve.id()) {
            if let Some(replacement) = copies.get(&prerequisite.id()) {
                copy.replace_prerequisite(prerequisite.id(), replacement.clone());
            }
        }
        copy.refit()?;
        copies.insert(curve.id(), CurveHandle::new(copy));
    }
    Ok(copies
        .get(&target)
        .map(|c| c.read().ordinates().iter().map(|o| o.value).collect())
        .unwrap_or_default())
}
