//! Shared fixtures for the engine integration tests: a small calibrated
//! rates market and a few transparent pricers.

#![allow(dead_code)]

use greeks_core::market_data::curves::calibrators::{SpreadCalibrator, ZeroRateCalibrator};
use greeks_core::market_data::curves::{
    Curve, CurveHandle, CurveKind, CurveState, CurveTenor, HedgeInstrument,
};
use greeks_core::traits::{MarketDependencies, Measure, OrdinateDerivatives, Pricer};
use greeks_core::types::PricingError;
use std::sync::Arc;

/// OIS discount curve and a 3M basis curve built on it.
pub struct Market {
    pub ois: CurveHandle,
    pub basis: CurveHandle,
}

impl Market {
    pub fn curves(&self) -> [&CurveHandle; 2] {
        [&self.ois, &self.basis]
    }

    pub fn snapshot(&self) -> Vec<CurveState> {
        self.curves().iter().map(|c| c.snapshot()).collect()
    }

    pub fn unchanged_since(&self, before: &[CurveState]) -> bool {
        self.curves()
            .iter()
            .zip(before)
            .all(|(c, s)| c.snapshot().same_bits(s))
    }
}

fn rate_tenors(points: &[(&str, f64, f64)]) -> Vec<CurveTenor> {
    points
        .iter()
        .map(|&(name, maturity, quote)| {
            CurveTenor::rate(name, maturity, quote)
                .with_hedge(HedgeInstrument::new(format!("swap-{}", name), maturity))
        })
        .collect()
}

/// Calibrated OIS curve (1Y..10Y) with a 3M basis curve 10bp over it.
pub fn market() -> Market {
    let ois = CurveHandle::new(
        Curve::new(
            "USD-OIS",
            CurveKind::Discount,
            rate_tenors(&[("1Y", 1.0, 0.030), ("2Y", 2.0, 0.032), ("5Y", 5.0, 0.035), ("10Y", 10.0, 0.038)]),
        )
        .unwrap()
        .with_calibrator(Arc::new(ZeroRateCalibrator))
        .fitted()
        .unwrap(),
    );
    let basis = CurveHandle::new(
        Curve::new(
            "USD-3M",
            CurveKind::Basis,
            vec![CurveTenor::spread("2Y", 2.0, 0.001), CurveTenor::spread("5Y", 5.0, 0.0012)],
        )
        .unwrap()
        .with_calibrator(Arc::new(SpreadCalibrator))
        .with_prerequisite(ois.clone())
        .fitted()
        .unwrap(),
    );
    Market { ois, basis }
}

/// Uncalibrated discount curve from `(name, maturity, quote)` points.
pub fn discount_curve(name: &str, points: &[(&str, f64, f64)]) -> CurveHandle {
    CurveHandle::new(Curve::new(name, CurveKind::Discount, rate_tenors(points)).unwrap())
}

/// Fixed-rate annuity: `notional * Σ_{k=1..n} DF(k)`.
#[derive(Debug)]
pub struct AnnuityPricer {
    name: String,
    curve: CurveHandle,
    notional: f64,
    years: u32,
}

impl AnnuityPricer {
    pub fn new(name: &str, curve: &CurveHandle, notional: f64, years: u32) -> Self {
        Self {
            name: name.to_string(),
            curve: curve.clone(),
            notional,
            years,
        }
    }

    /// Present value on the curve as it stands.
    pub fn pv(&self) -> Result<f64, PricingError> {
        let curve = self.curve.read();
        let mut pv = 0.0;
        for year in 1..=self.years {
            let t = f64::from(year);
            pv += (-curve.value(t)? * t).exp();
        }
        Ok(self.notional * pv)
    }
}

impl Pricer for AnnuityPricer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, measure: &Measure) -> bool {
        *measure == Measure::Pv
    }

    fn evaluate(&self, _measure: &Measure) -> Result<f64, PricingError> {
        self.pv()
    }

    fn market_dependencies(&self) -> MarketDependencies {
        MarketDependencies::new().with(&self.curve)
    }

    fn maturity(&self) -> Option<f64> {
        Some(f64::from(self.years))
    }
}

/// `weight * Σ ordinates` of one curve, with exact ordinate derivatives.
#[derive(Debug)]
pub struct OrdinateSumPricer {
    name: String,
    curve: CurveHandle,
    weight: f64,
}

impl OrdinateSumPricer {
    pub fn new(name: &str, curve: &CurveHandle, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            curve: curve.clone(),
            weight,
        }
    }
}

impl Pricer for OrdinateSumPricer {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, measure: &Measure) -> bool {
        *measure == Measure::Pv
    }

    fn evaluate(&self, _measure: &Measure) -> Result<f64, PricingError> {
        let sum: f64 = self.curve.read().ordinates().iter().map(|o| o.value).sum();
        Ok(self.weight * sum)
    }

    fn market_dependencies(&self) -> MarketDependencies {
        MarketDependencies::new().with(&self.curve)
    }

    fn supports_ordinate_derivatives(&self, measure: &Measure) -> bool {
        self.supports(measure)
    }

    fn ordinate_derivatives(
        &self,
        _measure: &Measure,
        curve: &CurveHandle,
    ) -> Result<OrdinateDerivatives, PricingError> {
        let n = curve.read().ordinates().len();
        let weight = if *curve == self.curve { self.weight } else { 0.0 };
        Ok(OrdinateDerivatives {
            gradient: vec![weight; n],
            curvature: Some(vec![0.0; n]),
        })
    }
}

/// Pricer that fails whenever its curve's first ordinate exceeds a cap.
#[derive(Debug)]
pub struct CappedPricer {
    curve: CurveHandle,
    cap: f64,
}

impl CappedPricer {
    pub fn new(curve: &CurveHandle, cap: f64) -> Self {
        Self {
            curve: curve.clone(),
            cap,
        }
    }
}

impl Pricer for CappedPricer {
    fn name(&self) -> &str {
        "capped"
    }

    fn supports(&self, measure: &Measure) -> bool {
        *measure == Measure::Pv
    }

    fn evaluate(&self, _measure: &Measure) -> Result<f64, PricingError> {
        let first = self.curve.read().ordinates()[0].value;
        if first > self.cap {
            return Err(PricingError::ModelFailure(format!("ordinate {} above cap {}", first, self.cap)));
        }
        Ok(first)
    }

    fn market_dependencies(&self) -> MarketDependencies {
        MarketDependencies::new().with(&self.curve)
    }
}

pub fn shared(pricer: impl Pricer + 'static) -> Arc<dyn Pricer> {
    Arc::new(pricer)
}
