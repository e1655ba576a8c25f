//! Pricer evaluator adapter.
//!
//! A [`PricerEvaluator`] binds a pricer to one [`Measure`]. The measure is
//! checked against the pricer's capabilities when the adapter is built, so
//! evaluation never fails for an unknown measure mid-run.
//!
//! Evaluators are created per sensitivity call and dropped afterwards.

mod batch;

pub use batch::{evaluate_batch, EvaluationFailure, SharedModelGroup, SharedModelGroups};

use crate::error::{ConfigError, SensitivityError};
use greeks_core::market_data::curves::{CurveHandle, CurveId};
use greeks_core::traits::{BumpTarget, Measure, Pricer, SharedModel};
use greeks_core::types::PricingError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// A pricer bound to a measure.
#[derive(Clone, Debug)]
pub struct PricerEvaluator {
    pricer: Arc<dyn Pricer>,
    measure: Measure,
    label: String,
}

impl PricerEvaluator {
    /// Binds `pricer` to `measure`.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownMeasure` when the pricer does not support the measure.
    pub fn new(pricer: Arc<dyn Pricer>, measure: Measure) -> Result<Self, ConfigError> {
        if !pricer.supports(&measure) {
            return Err(ConfigError::UnknownMeasure {
                pricer: pricer.name().to_string(),
                measure: measure.to_string(),
            });
        }
        let label = match measure {
            Measure::Pv => pricer.name().to_string(),
            ref other => format!("{} [{}]", pricer.name(), other),
        };
        Ok(Self {
            pricer,
            measure,
            label,
        })
    }

    /// Builds one evaluator per `(pricer, measure)` pair.
    ///
    /// With `allow_missing`, pricers lacking their measure are skipped with a
    /// warning; otherwise the first one is an error.
    ///
    /// # Errors
    ///
    /// * `ConfigError::LengthMismatch` - `pricers` and `measures` differ in length
    /// * `ConfigError::UnknownMeasure` - unsupported measure without `allow_missing`
    pub fn from_pairs(
        pricers: &[Arc<dyn Pricer>],
        measures: &[Measure],
        allow_missing: bool,
    ) -> Result<Vec<Self>, ConfigError> {
        if pricers.len() != measures.len() {
            return Err(ConfigError::LengthMismatch {
                pricers: pricers.len(),
                options: measures.len(),
                what: "measures",
            });
        }
        let mut evaluators = Vec::with_capacity(pricers.len());
        for (pricer, measure) in pricers.iter().zip(measures) {
            match Self::new(Arc::clone(pricer), measure.clone()) {
                Ok(evaluator) => evaluators.push(evaluator),
                Err(err) if allow_missing => {
                    warn!(pricer = pricer.name(), measure = %measure, "skipping pricer: {}", err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(evaluators)
    }

    /// Rebinds the same measure to another, compatible pricer (hedge instruments).
    pub fn substitute(&self, pricer: Arc<dyn Pricer>) -> Result<Self, ConfigError> {
        Self::new(pricer, self.measure.clone())
    }

    /// Evaluates the measure against the current market.
    pub fn evaluate(&self) -> Result<f64, PricingError> {
        self.pricer.evaluate(&self.measure)
    }

    /// Invalidates the pricer's cached state.
    pub fn reset(&self) {
        self.pricer.reset();
    }

    /// Label used in results: the pricer name, plus the measure unless it is `pv`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bound measure.
    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    /// Underlying pricer.
    pub fn pricer(&self) -> &Arc<dyn Pricer> {
        &self.pricer
    }

    /// Shared sub-model of the pricer, if any.
    pub fn shared_model(&self) -> Option<Arc<dyn SharedModel>> {
        self.pricer.shared_model()
    }

    /// Curves the pricer reads directly.
    pub fn curves(&self) -> Vec<CurveHandle> {
        self.pricer.market_dependencies().iter().cloned().collect()
    }

    /// Direct curves whose category is selected by `targets`.
    pub fn curves_for(&self, targets: BumpTarget) -> Vec<CurveHandle> {
        self.pricer
            .market_dependencies()
            .targeted(targets)
            .cloned()
            .collect()
    }

    /// True when the pricer reads `curve`, directly or through prerequisites.
    pub fn depends_on(&self, curve: &CurveHandle) -> bool {
        self.depends_on_any(std::slice::from_ref(curve))
    }

    /// True when the pricer reads any of `curves`, directly or through prerequisites.
    pub fn depends_on_any(&self, curves: &[CurveHandle]) -> bool {
        if curves.is_empty() {
            return false;
        }
        let wanted: HashSet<CurveId> = curves.iter().map(CurveHandle::id).collect();
        let mut visited = HashSet::new();
        let mut stack = self.curves();
        while let Some(curve) = stack.pop() {
            if wanted.contains(&curve.id()) {
                return true;
            }
            if visited.insert(curve.id()) {
                stack.extend(curve.prerequisites());
            }
        }
        false
    }

    pub(crate) fn pricing_error(&self, selection: &str, source: PricingError) -> SensitivityError {
        SensitivityError::Pricing {
            selection: selection.to_string(),
            pricer: self.label.clone(),
            measure: self.measure.to_string(),
            source,
        }
    }
}
