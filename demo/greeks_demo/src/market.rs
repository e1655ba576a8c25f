//! Synthetic market and book.
//!
//! A USD OIS discount curve, a 3M basis curve projected off it, and one
//! credit name with its recovery curve. The book holds payer swaps and CDS
//! protection; both pricers support date rolls and term overrides so every
//! scenario shift has something to act on.

use crate::error::Result;
use greeks_core::market_data::curves::calibrators::{
    HazardRateCalibrator, SpreadCalibrator, ZeroRateCalibrator,
};
use greeks_core::market_data::curves::{
    Curve, CurveHandle, CurveKind, CurveTenor, HedgeInstrument, QuoteConvention, TermStructure,
};
use greeks_core::traits::{MarketDependencies, Measure, Pricer};
use greeks_core::types::PricingError;
use greeks_engine::sensitivity::HedgePricerFactory;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

const OIS_QUOTES: [(&str, f64, f64); 9] = [
    ("1Y", 1.0, 0.0410),
    ("2Y", 2.0, 0.0385),
    ("3Y", 3.0, 0.0370),
    ("5Y", 5.0, 0.0360),
    ("7Y", 7.0, 0.0358),
    ("10Y", 10.0, 0.0362),
    ("15Y", 15.0, 0.0368),
    ("20Y", 20.0, 0.0370),
    ("30Y", 30.0, 0.0365),
];

const BASIS_SPREADS: [(&str, f64, f64); 5] = [
    ("1Y", 1.0, 0.0012),
    ("2Y", 2.0, 0.0011),
    ("5Y", 5.0, 0.0010),
    ("10Y", 10.0, 0.0009),
    ("30Y", 30.0, 0.0008),
];

const CDS_SPREADS: [(&str, f64, f64); 5] = [
    ("1Y", 1.0, 0.0060),
    ("3Y", 3.0, 0.0085),
    ("5Y", 5.0, 0.0105),
    ("7Y", 7.0, 0.0120),
    ("10Y", 10.0, 0.0135),
];

/// Name of the demo credit curve.
pub const CREDIT_NAME: &str = "ACME";

/// Curves of the demo market.
#[derive(Debug, Clone)]
pub struct DemoMarket {
    /// USD OIS discount curve
    pub ois: CurveHandle,
    /// USD 3M projection basis over OIS
    pub basis: CurveHandle,
    /// Recovery curve of the credit name
    pub recovery: CurveHandle,
    /// Hazard-rate curve of the credit name
    pub credit: CurveHandle,
}

impl DemoMarket {
    /// Builds and calibrates every curve.
    pub fn build() -> Result<Self> {
        let ois_tenors = OIS_QUOTES
            .iter()
            .map(|&(name, t, q)| {
                CurveTenor::rate(name, t, q).with_hedge(HedgeInstrument::new(format!("OIS-{}", name), t))
            })
            .collect();
        let ois = CurveHandle::new(
            Curve::new("USD-OIS", CurveKind::Discount, ois_tenors)?
                .with_calibrator(Arc::new(ZeroRateCalibrator))
                .fitted()?,
        );

        let basis_tenors = BASIS_SPREADS
            .iter()
            .map(|&(name, t, q)| CurveTenor::spread(name, t, q))
            .collect();
        let basis = CurveHandle::new(
            Curve::new("USD-3M", CurveKind::Basis, basis_tenors)?
                .with_calibrator(Arc::new(SpreadCalibrator))
                .with_prerequisite(ois.clone())
                .fitted()?,
        );

        let recovery = CurveHandle::new(Curve::new(
            format!("{}-REC", CREDIT_NAME),
            CurveKind::Recovery,
            vec![CurveTenor::new("5Y", 5.0, 0.40, QuoteConvention::Recovery)],
        )?);

        let credit_tenors = CDS_SPREADS
            .iter()
            .map(|&(name, t, q)| {
                CurveTenor::spread(name, t, q)
                    .with_hedge(HedgeInstrument::new(format!("CDS-{}-{}", CREDIT_NAME, name), t))
            })
            .collect();
        let credit = CurveHandle::new(
            Curve::new(CREDIT_NAME, CurveKind::Credit, credit_tenors)?
                .with_calibrator(Arc::new(HazardRateCalibrator::default()))
                .with_prerequisite(recovery.clone())
                .fitted()?,
        );

        Ok(Self {
            ois,
            basis,
            recovery,
            credit,
        })
    }

    /// Every curve, prerequisites first.
    pub fn curves(&self) -> [&CurveHandle; 4] {
        [&self.ois, &self.basis, &self.recovery, &self.credit]
    }

    /// Synthetic book of `swaps` payer swaps and `cds` protection trades, all priced for PV.
    pub fn book(&self, swaps: usize, cds: usize) -> Vec<(Arc<dyn Pricer>, Measure)> {
        const SWAP_YEARS: [u32; 7] = [2, 5, 7, 10, 15, 20, 30];
        const CDS_YEARS: [u32; 4] = [3, 5, 7, 10];

        let mut book: Vec<(Arc<dyn Pricer>, Measure)> = Vec::with_capacity(swaps + cds);
        for i in 0..swaps {
            let swap = SwapPricer::new(
                format!("IRS-{:03}", i + 1),
                &self.ois,
                &self.basis,
                SWAP_YEARS[i % SWAP_YEARS.len()],
                1.0e7 * (1 + i % 3) as f64,
                0.035 + 0.001 * (i % 4) as f64,
            );
            book.push((Arc::new(swap), Measure::Pv));
        }
        for i in 0..cds {
            let trade = CdsPricer::new(
                format!("CDS-{:03}", i + 1),
                &self.credit,
                &self.recovery,
                &self.ois,
                CDS_YEARS[i % CDS_YEARS.len()],
                5.0e6,
                0.0100,
            );
            book.push((Arc::new(trade), Measure::Pv));
        }
        book
    }
}

/// Payer swap: pays an annual fixed rate, receives the annual 3M-basis float.
#[derive(Debug)]
pub struct SwapPricer {
    name: String,
    discount: CurveHandle,
    projection: CurveHandle,
    years: u32,
    notional: f64,
    fixed_rate: RwLock<f64>,
    valuation_time: RwLock<f64>,
}

impl SwapPricer {
    /// Creates a swap starting at the market anchor.
    pub fn new(
        name: impl Into<String>,
        discount: &CurveHandle,
        projection: &CurveHandle,
        years: u32,
        notional: f64,
        fixed_rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            discount: discount.clone(),
            projection: projection.clone(),
            years,
            notional,
            fixed_rate: RwLock::new(fixed_rate),
            valuation_time: RwLock::new(0.0),
        }
    }

    /// Float leg and annuity per unit notional.
    fn legs(&self) -> std::result::Result<(f64, f64), PricingError> {
        let now = *self.valuation_time.read();
        let discount = self.discount.read();
        let projection = self.projection.read();
        let (mut float, mut annuity) = (0.0, 0.0);
        for k in 1..=self.years {
            let end = f64::from(k) - now;
            if end <= 0.0 {
                continue;
            }
            let start = (end - 1.0).max(0.0);
            let df = discount.discount_factor(end)?;
            let forward = projection.discount_factor(start)? / projection.discount_factor(end)? - 1.0;
            float += df * forward;
            annuity += df * (end - start);
        }
        Ok((float, annuity))
    }
}

impl Pricer for SwapPricer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, measure: &Measure) -> bool {
        matches!(measure, Measure::Pv | Measure::BreakEvenSpread)
    }

    fn evaluate(&self, measure: &Measure) -> std::result::Result<f64, PricingError> {
        let (float, annuity) = self.legs()?;
        match measure {
            Measure::Pv => Ok(self.notional * (float - *self.fixed_rate.read() * annuity)),
            Measure::BreakEvenSpread if annuity > 0.0 => Ok(float / annuity),
            Measure::BreakEvenSpread => Err(PricingError::NumericalInstability(format!(
                "{} has no remaining fixed periods",
                self.name
            ))),
            other => Err(PricingError::UnsupportedMeasure {
                pricer: self.name.clone(),
                measure: other.to_string(),
            }),
        }
    }

    fn market_dependencies(&self) -> MarketDependencies {
        MarketDependencies::new()
            .with(&self.discount)
            .with(&self.projection)
    }

    fn maturity(&self) -> Option<f64> {
        Some(f64::from(self.years) - *self.valuation_time.read())
    }

    fn valuation_time(&self) -> f64 {
        *self.valuation_time.read()
    }

    fn set_valuation_time(&self, time: f64) -> std::result::Result<(), PricingError> {
        *self.valuation_time.write() = time;
        Ok(())
    }

    fn term(&self, name: &str) -> Option<f64> {
        (name == "fixed_rate").then(|| *self.fixed_rate.read())
    }

    fn set_term(&self, name: &str, value: f64) -> std::result::Result<(), PricingError> {
        if name != "fixed_rate" {
            return Err(PricingError::UnsupportedOperation {
                pricer: self.name.clone(),
                operation: format!("term change '{}'", name),
            });
        }
        *self.fixed_rate.write() = value;
        Ok(())
    }
}

/// Quarterly-paying CDS protection buyer.
///
/// Leg values are cached between evaluations; the engine resets the pricer
/// whenever the market moves and a default event also drops the cache.
#[derive(Debug)]
pub struct CdsPricer {
    name: String,
    credit: CurveHandle,
    recovery: CurveHandle,
    discount: CurveHandle,
    years: u32,
    notional: f64,
    spread: RwLock<f64>,
    valuation_time: RwLock<f64>,
    legs: RwLock<Option<CdsLegs>>,
}

#[derive(Debug, Clone, Copy)]
struct CdsLegs {
    risky_annuity: f64,
    protection: f64,
    expected_loss: f64,
}

impl CdsPricer {
    const PAYMENTS_PER_YEAR: u32 = 4;

    /// Creates a CDS on `credit` with recovery read from `recovery`.
    pub fn new(
        name: impl Into<String>,
        credit: &CurveHandle,
        recovery: &CurveHandle,
        discount: &CurveHandle,
        years: u32,
        notional: f64,
        spread: f64,
    ) -> Self {
        Self {
            name: name.into(),
            credit: credit.clone(),
            recovery: recovery.clone(),
            discount: discount.clone(),
            years,
            notional,
            spread: RwLock::new(spread),
            valuation_time: RwLock::new(0.0),
            legs: RwLock::new(None),
        }
    }

    fn legs(&self) -> std::result::Result<CdsLegs, PricingError> {
        if let Some(legs) = *self.legs.read() {
            return Ok(legs);
        }
        let now = *self.valuation_time.read();
        let maturity = f64::from(self.years) - now;
        let credit = self.credit.read();
        let discount = self.discount.read();
        let loss = 1.0 - self.recovery.read().value(maturity.max(0.0))?;

        let dt = 1.0 / f64::from(Self::PAYMENTS_PER_YEAR);
        let mut legs = CdsLegs {
            risky_annuity: 0.0,
            protection: 0.0,
            expected_loss: 0.0,
        };
        let mut survival_start = 1.0;
        for k in 1..=self.years * Self::PAYMENTS_PER_YEAR {
            let end = f64::from(k) * dt - now;
            if end <= 0.0 {
                continue;
            }
            let df = discount.discount_factor(end)?;
            let survival = credit.survival_probability(end)?;
            legs.risky_annuity += dt.min(end) * df * survival;
            legs.protection += loss * df * (survival_start - survival);
            survival_start = survival;
        }
        legs.expected_loss = loss * (1.0 - survival_start);
        *self.legs.write() = Some(legs);
        Ok(legs)
    }
}

impl Pricer for CdsPricer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, measure: &Measure) -> bool {
        matches!(
            measure,
            Measure::Pv
                | Measure::FeePv
                | Measure::ProtectionPv
                | Measure::ExpectedLoss
                | Measure::BreakEvenSpread
        )
    }

    fn evaluate(&self, measure: &Measure) -> std::result::Result<f64, PricingError> {
        let legs = self.legs()?;
        let fee = *self.spread.read() * legs.risky_annuity;
        match measure {
            Measure::Pv => Ok(self.notional * (legs.protection - fee)),
            Measure::FeePv => Ok(self.notional * fee),
            Measure::ProtectionPv => Ok(self.notional * legs.protection),
            Measure::ExpectedLoss => Ok(self.notional * legs.expected_loss),
            Measure::BreakEvenSpread if legs.risky_annuity > 0.0 => {
                Ok(legs.protection / legs.risky_annuity)
            }
            Measure::BreakEvenSpread => Err(PricingError::NumericalInstability(format!(
                "{} has no risky annuity left",
                self.name
            ))),
            other => Err(PricingError::UnsupportedMeasure {
                pricer: self.name.clone(),
                measure: other.to_string(),
            }),
        }
    }

    fn reset(&self) {
        *self.legs.write() = None;
    }

    fn market_dependencies(&self) -> MarketDependencies {
        MarketDependencies::new()
            .with(&self.credit)
            .with(&self.recovery)
            .with(&self.discount)
    }

    fn maturity(&self) -> Option<f64> {
        Some(f64::from(self.years) - *self.valuation_time.read())
    }

    fn set_default_changed(&self, changed: bool) {
        if changed {
            debug!(pricer = %self.name, "default status changed, dropping cached legs");
            self.reset();
        }
    }

    fn valuation_time(&self) -> f64 {
        *self.valuation_time.read()
    }

    fn set_valuation_time(&self, time: f64) -> std::result::Result<(), PricingError> {
        *self.valuation_time.write() = time;
        self.reset();
        Ok(())
    }

    fn term(&self, name: &str) -> Option<f64> {
        (name == "spread").then(|| *self.spread.read())
    }

    fn set_term(&self, name: &str, value: f64) -> std::result::Result<(), PricingError> {
        if name != "spread" {
            return Err(PricingError::UnsupportedOperation {
                pricer: self.name.clone(),
                operation: format!("term change '{}'", name),
            });
        }
        *self.spread.write() = value;
        Ok(())
    }
}

/// Prices the `OIS-*` and `CDS-*` hedge instruments at par.
#[derive(Debug, Clone)]
pub struct ParHedgeFactory {
    market: DemoMarket,
}

impl ParHedgeFactory {
    /// Factory over `market`.
    pub fn new(market: &DemoMarket) -> Self {
        Self {
            market: market.clone(),
        }
    }
}

impl HedgePricerFactory for ParHedgeFactory {
    fn hedge_pricer(&self, instrument: &HedgeInstrument) -> Option<Arc<dyn Pricer>> {
        let years = instrument.maturity.round().max(1.0) as u32;
        let pricer: Arc<dyn Pricer> = if instrument.id.starts_with("OIS-") {
            let swap = SwapPricer::new(&instrument.id, &self.market.ois, &self.market.ois, years, 1.0, 0.0);
            let par = swap.evaluate(&Measure::BreakEvenSpread).ok()?;
            swap.set_term("fixed_rate", par).ok()?;
            Arc::new(swap)
        } else if instrument.id.starts_with("CDS-") {
            let cds = CdsPricer::new(
                &instrument.id,
                &self.market.credit,
                &self.market.recovery,
                &self.market.ois,
                years,
                1.0,
                0.0,
            );
            let par = cds.evaluate(&Measure::BreakEvenSpread).ok()?;
            cds.set_term("spread", par).ok()?;
            Arc::new(cds)
        } else {
            return None;
        };
        Some(pricer)
    }
}
