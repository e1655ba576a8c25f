use crate::config::BumpFlags;
use crate::error::{Result, SensitivityError};
use crate::graph::DependencyGraph;
use crate::selection::TenorSelection;
use greeks_core::market_data::curves::{CurveHandle, CurveKind, CurveState};
use greeks_core::types::CalibrationError;
use std::collections::HashSet;
use tracing::debug;

/// Outcome of a bump that moved at least one quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BumpResult {
    requested: f64,
    realized: f64,
    tenors_moved: usize,
}

impl BumpResult {
    /// Signed amount asked for (negated on the down leg).
    pub fn requested(&self) -> f64 {
        self.requested
    }

    /// Mean signed change over the moved tenors, in the requested units
    /// (absolute quote units, or fractions of the quote for relative bumps).
    /// Differs from `requested` only where quotes were clipped or floored.
    pub fn realized(&self) -> f64 {
        self.realized
    }

    /// Number of tenors whose quote changed.
    pub fn tenors_moved(&self) -> usize {
        self.tenors_moved
    }
}

#[derive(Debug)]
struct Applied {
    selection: String,
    saved: Vec<(CurveHandle, CurveState)>,
}

/// Guard holding at most one applied bump over a dependency graph.
///
/// [`restore`](BumpTransaction::restore) may be called any number of times,
/// including before any bump; dropping the guard restores as well, so every
/// exit path (errors and panics included) leaves the curves as they were.
///
/// # Example
///
/// ```
/// use greeks_core::market_data::curves::{Curve, CurveHandle, CurveKind, CurveTenor};
/// use greeks_core::traits::BumpTarget;
/// use greeks_engine::bump::BumpTransaction;
/// use greeks_engine::config::{BumpFlags, BumpType};
/// use greeks_engine::graph::DependencyGraph;
/// use greeks_engine::selection::TenorFilter;
///
/// let ois = CurveHandle::new(
///     Curve::new("OIS", CurveKind::Discount, vec![CurveTenor::rate("1Y", 1.0, 0.01)]).unwrap(),
/// );
/// let graph = DependencyGraph::from_roots([ois.clone()]).unwrap();
/// let selections = BumpType::Parallel.select(&graph, &TenorFilter::new(BumpTarget::INTEREST_RATES));
///
/// let before = ois.snapshot();
/// {
///     let mut tx = BumpTransaction::new(&graph);
///     let result = tx.apply(&selections[0], 0.0001, BumpFlags::empty()).unwrap().unwrap();
///     assert_eq!(result.tenors_moved(), 1);
///     assert!(ois.read().ordinates()[0].value > 0.01);
/// }
/// assert!(ois.snapshot().same_bits(&before));
/// ```
#[derive(Debug)]
pub struct BumpTransaction<'g> {
    graph: &'g DependencyGraph,
    applied: Option<Applied>,
}

impl<'g> BumpTransaction<'g> {
    /// Opens a transaction with nothing applied.
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            applied: None,
        }
    }

    /// True while a bump is applied and not yet restored.
    pub fn is_open(&self) -> bool {
        self.applied.is_some()
    }

    /// Bumps every tenor of `selection` by `amount` and refits the affected
    /// curves in dependency order.
    ///
    /// Tenors of curves that have already defaulted are left alone. Returns
    /// `None` when no quote moved (zero amount, quotes already at their
    /// bounds, defaulted curves); nothing is refit in that case and the
    /// transaction stays closed.
    ///
    /// # Errors
    ///
    /// * `SensitivityError::TransactionOpen` - a previous bump was not restored
    /// * `SensitivityError::Calibration` - a refit failed; the curves have
    ///   already been restored when this is returned
    pub fn apply(
        &mut self,
        selection: &TenorSelection,
        amount: f64,
        flags: BumpFlags,
    ) -> Result<Option<BumpResult>> {
        if let Some(applied) = &self.applied {
            return Err(SensitivityError::TransactionOpen {
                selection: applied.selection.clone(),
            });
        }

        let touched: HashSet<_> = selection.curves().iter().map(CurveHandle::id).collect();
        let affected = self.affected_curves(selection, flags);
        self.applied = Some(Applied {
            selection: selection.name().to_string(),
            saved: affected.iter().map(|c| (c.clone(), c.snapshot())).collect(),
        });

        let relative = flags.contains(BumpFlags::BUMP_RELATIVE);
        let in_place = flags.contains(BumpFlags::BUMP_IN_PLACE);
        let signed = if flags.contains(BumpFlags::BUMP_DOWN) {
            -amount
        } else {
            amount
        };
        // Relative moves below -100% would flip the sign of the quote.
        let unit_change = if relative { signed.max(-1.0) } else { signed };

        let mut moved = 0usize;
        let mut realized_sum = 0.0;
        for tenor in selection.tenors() {
            let curve = tenor.curve();
            let mut guard = curve.write();
            if guard.default_time().is_some() {
                debug!(curve = curve.name(), tenor = tenor.name(), "curve has defaulted, tenor not bumped");
                continue;
            }
            let Some(current) = guard.tenor(tenor.index()) else {
                continue;
            };
            let quote = current.quote();
            let convention = current.convention();
            let maturity = current.maturity();

            let target = if relative {
                quote + quote * unit_change
            } else {
                quote + unit_change
            };
            let bumped = convention.clip(target);
            if bumped == quote {
                continue;
            }

            let shifted = guard.set_quote(tenor.index(), bumped).and_then(|()| {
                if in_place {
                    guard.shift_ordinate(maturity, bumped - quote)
                } else {
                    Ok(())
                }
            });
            drop(guard);
            if let Err(err) = shifted {
                self.restore();
                return Err(SensitivityError::Calibration {
                    selection: selection.name().to_string(),
                    curve: curve.name().to_string(),
                    source: CalibrationError::from(err),
                });
            }

            moved += 1;
            realized_sum += match (bumped == target, relative) {
                (true, _) => unit_change,
                (false, true) => (bumped - quote) / quote,
                (false, false) => bumped - quote,
            };
        }

        if moved == 0 {
            debug!(selection = selection.name(), amount = signed, "bump moved no quote");
            self.restore();
            return Ok(None);
        }

        let mut refits = 0usize;
        for curve in &affected {
            if in_place && touched.contains(&curve.id()) {
                continue;
            }
            if let Err(source) = curve.refit() {
                self.restore();
                return Err(SensitivityError::Calibration {
                    selection: selection.name().to_string(),
                    curve: curve.name().to_string(),
                    source,
                });
            }
            refits += 1;
        }

        let result = BumpResult {
            requested: signed,
            realized: realized_sum / moved as f64,
            tenors_moved: moved,
        };
        debug!(
            selection = selection.name(),
            requested = result.requested,
            realized = result.realized,
            tenors = moved,
            refits,
            "bump applied"
        );
        Ok(Some(result))
    }

    /// Reinstates every saved curve, last saved first. A no-op when nothing
    /// is applied.
    pub fn restore(&mut self) {
        if let Some(applied) = self.applied.take() {
            for (curve, state) in applied.saved.into_iter().rev() {
                curve.restore(state);
            }
        }
    }

    /// Touched curves plus the dependents that must follow them, in
    /// topological order.
    fn affected_curves(&self, selection: &TenorSelection, flags: BumpFlags) -> Vec<CurveHandle> {
        let touched: Vec<_> = selection.curves().iter().map(CurveHandle::id).collect();
        let mut curves: Vec<CurveHandle> = selection.curves().to_vec();
        curves.extend(
            self.graph
                .dependents_of(&touched)
                .into_iter()
                .filter(|c| refits_dependent(c.kind(), flags)),
        );
        curves.sort_by_key(|c| self.graph.position(c.id()).unwrap_or(usize::MAX));
        curves
    }
}

impl Drop for BumpTransaction<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

pub(crate) fn refits_dependent(kind: CurveKind, flags: BumpFlags) -> bool {
    match kind {
        CurveKind::Credit => flags.contains(BumpFlags::RECALIBRATE_SURVIVAL),
        CurveKind::Correlation => flags.contains(BumpFlags::REMAP_CORRELATIONS),
        _ => true,
    }
}
