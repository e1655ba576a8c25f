//! Batched evaluation with shared sub-model pre-warming.
//!
//! ```text
//! reset every pricer ──► prepare shared models (sequential) ──► evaluate (rayon)
//! ```
//!
//! Pricers that reference the same sub-model (by `Arc` identity) would
//! otherwise race to rebuild its cache during the parallel pass.

use super::PricerEvaluator;
use crate::parallel::ParallelConfig;
use greeks_core::traits::SharedModel;
use greeks_core::types::PricingError;
use std::sync::Arc;
use tracing::trace;

/// A sub-model and the evaluators referencing it.
#[derive(Debug, Clone)]
pub struct SharedModelGroup {
    /// The shared model.
    pub model: Arc<dyn SharedModel>,
    /// Indices of the evaluators referencing it.
    pub members: Vec<usize>,
}

/// Sub-models referenced by at least two evaluators of a batch.
#[derive(Debug, Clone, Default)]
pub struct SharedModelGroups {
    groups: Vec<SharedModelGroup>,
}

impl SharedModelGroups {
    /// Groups evaluators by shared model identity, keeping groups of two or more.
    pub fn detect(evaluators: &[&PricerEvaluator]) -> Self {
        let mut groups: Vec<SharedModelGroup> = Vec::new();
        for (index, evaluator) in evaluators.iter().enumerate() {
            let Some(model) = evaluator.shared_model() else {
                continue;
            };
            match groups.iter_mut().find(|g| same_model(&g.model, &model)) {
                Some(group) => group.members.push(index),
                None => groups.push(SharedModelGroup {
                    model,
                    members: vec![index],
                }),
            }
        }
        groups.retain(|g| g.members.len() > 1);
        Self { groups }
    }

    /// Detected groups.
    pub fn groups(&self) -> &[SharedModelGroup] {
        &self.groups
    }

    /// True when no sharing was detected.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Invalidates and prepares each shared model once, one at a time.
    pub fn prewarm(&self) -> Result<(), EvaluationFailure> {
        for group in &self.groups {
            trace!(model = group.model.name(), members = group.members.len(), "prewarming shared model");
            group.model.invalidate();
            group.model.prepare().map_err(|source| EvaluationFailure {
                index: group.members[0],
                source,
            })?;
        }
        Ok(())
    }
}

fn same_model(a: &Arc<dyn SharedModel>, b: &Arc<dyn SharedModel>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// The first evaluator of a batch that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
    /// Index of the failing evaluator in the batch.
    pub index: usize,
    /// Underlying error.
    pub source: PricingError,
}

/// Resets, pre-warms and evaluates a batch against the current market.
///
/// Values are returned in input order. On failure the lowest failing index
/// is reported.
pub fn evaluate_batch(
    evaluators: &[&PricerEvaluator],
    parallel: &ParallelConfig,
) -> Result<Vec<f64>, EvaluationFailure> {
    for evaluator in evaluators {
        evaluator.reset();
    }
    SharedModelGroups::detect(evaluators).prewarm()?;

    parallel
        .map(evaluators, |evaluator| evaluator.evaluate())
        .into_iter()
        .enumerate()
        .map(|(index, value)| value.map_err(|source| EvaluationFailure { index, source }))
        .collect()
}
