//! Hedge instrument resolution.
//!
//! | Rule | Tenor used |
//! |------|------------|
//! | `All` | the bumped tenor of a ByTenor selection; none for wider selections |
//! | `Named(n)` | tenor `n` on the owner curve, then on the other curves |
//! | `Maturity` | tenor of the selection's curves nearest the pricer's maturity |
//! | `Matching` | bumped tenor nearest the pricer's maturity |
//!
//! No tenor, no hedge instrument on it, or an instrument the factory cannot
//! price all yield no hedge; the calculator then reports zero hedge columns.

use crate::config::{BumpFlags, BumpType, HedgeTenor};
use crate::selection::TenorSelection;
use greeks_core::market_data::curves::{CurveTenor, HedgeInstrument};
use greeks_core::traits::Pricer;
use std::sync::Arc;

/// Maximum maturity gap (one day) tolerated by `Matching` under
/// `NO_HEDGE_ON_TENOR_MISMATCH`.
pub const MATURITY_MATCH_TOLERANCE: f64 = 1.0 / 365.0;

/// Builds pricers for hedge instruments.
pub trait HedgePricerFactory: Send + Sync {
    /// Pricer for `instrument`, or `None` when it cannot be priced.
    fn hedge_pricer(&self, instrument: &HedgeInstrument) -> Option<Arc<dyn Pricer>>;
}

impl<F> HedgePricerFactory for F
where
    F: Fn(&HedgeInstrument) -> Option<Arc<dyn Pricer>> + Send + Sync,
{
    fn hedge_pricer(&self, instrument: &HedgeInstrument) -> Option<Arc<dyn Pricer>> {
        self(instrument)
    }
}

/// A tenor chosen to hedge a pricer, with its instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeChoice {
    /// Name of the hedging tenor.
    pub tenor: String,
    /// Hedge instrument attached to it.
    pub instrument: HedgeInstrument,
}

impl HedgeChoice {
    fn from_tenor(tenor: &CurveTenor) -> Option<Self> {
        tenor.hedge().map(|instrument| Self {
            tenor: tenor.name().to_string(),
            instrument: instrument.clone(),
        })
    }
}

/// Applies `rule` to a selection and a pricer maturity.
pub fn resolve_hedge(
    rule: &HedgeTenor,
    selection: &TenorSelection,
    maturity: Option<f64>,
    flags: BumpFlags,
) -> Option<HedgeChoice> {
    match rule {
        HedgeTenor::All => {
            if selection.kind() != BumpType::ByTenor {
                return None;
            }
            selection.tenors().iter().find_map(|t| {
                let guard = t.curve().read();
                guard.tenor(t.index()).and_then(HedgeChoice::from_tenor)
            })
        }
        HedgeTenor::Named(name) => selection.curves().iter().find_map(|curve| {
            let guard = curve.read();
            guard
                .tenor_by_name(name)
                .and_then(|(_, tenor)| HedgeChoice::from_tenor(tenor))
        }),
        HedgeTenor::Maturity => {
            let target = maturity?;
            let mut best: Option<(f64, HedgeChoice)> = None;
            for curve in selection.curves() {
                let guard = curve.read();
                for tenor in guard.tenors() {
                    consider(&mut best, target, tenor);
                }
            }
            best.map(|(_, choice)| choice)
        }
        HedgeTenor::Matching => {
            let target = maturity?;
            let nearest = selection
                .tenors()
                .iter()
                .min_by(|a, b| {
                    (a.maturity() - target)
                        .abs()
                        .partial_cmp(&(b.maturity() - target).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })?;
            if flags.contains(BumpFlags::NO_HEDGE_ON_TENOR_MISMATCH)
                && (nearest.maturity() - target).abs() > MATURITY_MATCH_TOLERANCE
            {
                return None;
            }
            let guard = nearest.curve().read();
            guard.tenor(nearest.index()).and_then(HedgeChoice::from_tenor)
        }
    }
}

fn consider(best: &mut Option<(f64, HedgeChoice)>, target: f64, tenor: &CurveTenor) {
    let Some(choice) = HedgeChoice::from_tenor(tenor) else {
        return;
    };
    let gap = (tenor.maturity() - target).abs();
    if best.as_ref().map_or(true, |(g, _)| gap < *g) {
        *best = Some((gap, choice));
    }
}
