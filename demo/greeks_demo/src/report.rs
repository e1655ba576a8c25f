//! Text and JSON rendering of sensitivity tables and scenario results.

use crate::config::OutputFormat;
use crate::error::Result;
use greeks_engine::results::{AggregationKey, ResultAggregator, ResultTable, ScenarioResult};
use std::fmt::Write;

/// Renders a sensitivity table.
pub fn sensitivities(table: &ResultTable, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(table)?),
        OutputFormat::Table => Ok(sensitivity_text(table)),
    }
}

/// Renders scenario results.
pub fn scenarios(results: &[ScenarioResult], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
        OutputFormat::Table => Ok(scenario_text(results)),
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn sensitivity_text(table: &ResultTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<10} {:<6} {:<10} {:>16} {:>14} {:>6} {:>16}",
        "category", "element", "tenor", "pricer", "delta", "gamma", "hedge", "hedge notional"
    );
    for row in table {
        let _ = writeln!(
            out,
            "{:<12} {:<10} {:<6} {:<10} {:>16.2} {:>14} {:>6} {:>16}",
            row.category,
            row.element,
            row.tenor,
            row.pricer,
            row.delta,
            optional(row.gamma),
            row.hedge_tenor.as_deref().unwrap_or("-"),
            optional(row.hedge_notional),
        );
    }

    let aggregator = ResultAggregator::new(table);
    let _ = writeln!(out);
    let _ = writeln!(out, "delta by {}:", AggregationKey::Element.name());
    for (element, total) in aggregator.delta_totals(AggregationKey::Element) {
        let _ = writeln!(out, "  {:<10} {:>16.2}", element, total);
    }
    if let Some(largest) = aggregator.largest_delta() {
        let _ = writeln!(
            out,
            "largest: {} {}/{} {:.2}",
            largest.pricer, largest.element, largest.tenor, largest.delta
        );
    }
    out
}

fn scenario_text(results: &[ScenarioResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:>18} {:>18} {:>16} {:>9}",
        "scenario", "base", "shifted", "pnl", "pnl %"
    );
    for result in results {
        let total = result.total();
        let _ = writeln!(
            out,
            "{:<16} {:>18.2} {:>18.2} {:>16.2} {:>8.2}%",
            result.scenario,
            total.base,
            total.shifted,
            total.pnl,
            total.pnl_pct * 100.0
        );
        if let Some(worst) = result.worst() {
            let _ = writeln!(out, "  worst: {} {:.2}", worst.pricer, worst.pnl);
        }
    }
    out
}
