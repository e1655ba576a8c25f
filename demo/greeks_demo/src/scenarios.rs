//! Preset stress scenarios over the demo market.

use crate::error::{DemoError, Result};
use crate::market::CREDIT_NAME;
use greeks_engine::scenarios::{
    CurveQuoteShift, DateRollShift, DefaultEventShift, Scenario, TermChangeShift,
};

/// Names of the preset scenarios, in display order.
pub const PRESETS: [&str; 7] = [
    "rates-up",
    "steepener",
    "credit-widening",
    "recovery-down",
    "acme-default",
    "roll-1y",
    "coupon-reset",
];

/// Builds the named preset.
pub fn preset(name: &str) -> Result<Scenario> {
    let scenario = match name {
        "rates-up" => Scenario::new(name)
            .with_description("OIS +25bp parallel")
            .with_shift(CurveQuoteShift::rates("ois+25", 0.0025).on_curves("USD-OIS")),
        "steepener" => Scenario::new(name)
            .with_description("Front end -10bp, long end +15bp")
            .with_shift(CurveQuoteShift::rates("front", -0.0010).on_tenors(["1Y", "2Y", "3Y"]))
            .with_shift(CurveQuoteShift::rates("back", 0.0015).on_tenors(["10Y", "15Y", "20Y", "30Y"])),
        "credit-widening" => Scenario::new(name)
            .with_description("Credit spreads +50% relative")
            .with_shift(CurveQuoteShift::credit("spreads*1.5", 0.5).relative()),
        "recovery-down" => Scenario::new(name)
            .with_description("Recovery -10 points")
            .with_shift(CurveQuoteShift::recovery("recovery-10", -0.10)),
        "acme-default" => Scenario::new(name)
            .with_description("Credit event on ACME in three months, rates rally 10bp")
            .with_shift(DefaultEventShift::new("default", CREDIT_NAME, 0.25))
            .with_shift(CurveQuoteShift::rates("rally", -0.0010)),
        "roll-1y" => Scenario::new(name)
            .with_description("Valuation date rolled forward one year")
            .with_shift(DateRollShift::new("roll", 1.0)),
        "coupon-reset" => Scenario::new(name)
            .with_description("Swap coupons reset to 3%")
            .with_shift(TermChangeShift::new("coupon", "fixed_rate", 0.03)),
        other => return Err(DemoError::UnknownScenario(other.to_string())),
    };
    Ok(scenario)
}

/// Every preset.
pub fn all_presets() -> Result<Vec<Scenario>> {
    PRESETS.iter().map(|name| preset(name)).collect()
}
