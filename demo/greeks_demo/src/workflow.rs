//! Demo workflows: a sensitivity run and a batch of scenarios over the
//! synthetic book.

use crate::config::DemoConfig;
use crate::error::Result;
use crate::market::{DemoMarket, ParHedgeFactory};
use greeks_engine::evaluator::PricerEvaluator;
use greeks_engine::results::{ResultTable, ScenarioResult};
use greeks_engine::scenarios::{Scenario, ScenarioComposer};
use greeks_engine::sensitivity::SensitivityCalculator;
use std::time::Instant;
use tracing::info;

/// Computes the book's sensitivities under `config.sensitivity`.
pub fn sensitivities(config: &DemoConfig, market: &DemoMarket) -> Result<ResultTable> {
    let book = market.book(config.swaps, config.cds);
    let (pricers, measures): (Vec<_>, Vec<_>) = book.into_iter().unzip();
    let calculator = SensitivityCalculator::new(config.sensitivity.clone());

    let start = Instant::now();
    let table = if config.sensitivity.calc_hedge {
        calculator.compute_with_hedges(&pricers, &measures, &ParHedgeFactory::new(market))?
    } else {
        calculator.compute(&pricers, &measures)?
    };
    info!(
        rows = table.len(),
        pricers = pricers.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sensitivities computed"
    );
    Ok(table)
}

/// Runs `scenarios` one after another against the book.
pub fn scenarios(
    config: &DemoConfig,
    market: &DemoMarket,
    scenarios: &mut [Scenario],
) -> Result<Vec<ScenarioResult>> {
    let evaluators = market
        .book(config.swaps, config.cds)
        .into_iter()
        .map(|(pricer, measure)| PricerEvaluator::new(pricer, measure))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let composer = ScenarioComposer::new(config.sensitivity.parallel.clone());

    let start = Instant::now();
    let results = composer.run_all(scenarios, &evaluators)?;
    info!(
        scenarios = results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "scenarios complete"
    );
    Ok(results)
}
