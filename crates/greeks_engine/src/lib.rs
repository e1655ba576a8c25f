//! # greeks_engine: Bump-and-Reprice Sensitivity Engine (L2)
//!
//! Computes first- and second-order sensitivities of arbitrary pricers to
//! the market quotes of the curves they depend on, and runs compound
//! scenarios over the same market.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                greeks_engine (L2)                   │
//! ├─────────────────────────────────────────────────────┤
//! │  graph/       - Curve dependency graph, topo order  │
//! │  selection/   - Uniform / Parallel / ByTenor units  │
//! │  bump/        - Transactional bump, refit, restore  │
//! │  evaluator/   - Pricer + measure adapter, batches   │
//! │  parallel/    - Rayon utilities                     │
//! │  sensitivity/ - Delta, gamma, hedges, semi-analytic │
//! │  scenarios/   - Scenario composer and shifts        │
//! │  results/     - Result table, aggregation, P&L      │
//! └─────────────────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                 greeks_core (L1)                    │
//! │  Curves, tenors, calibrators, Pricer trait          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Curves are mutated in place while a selection is bumped and come back
//! bit-for-bit identical afterwards, including when a refit or a pricer
//! fails.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use greeks_core::market_data::curves::{Curve, CurveHandle, CurveKind, CurveTenor};
//! use greeks_core::traits::{MarketDependencies, Measure, Pricer};
//! use greeks_core::types::PricingError;
//! use greeks_engine::config::{BumpType, SensitivityConfig};
//! use greeks_engine::sensitivity::SensitivityCalculator;
//!
//! #[derive(Debug)]
//! struct Annuity {
//!     curve: CurveHandle,
//! }
//!
//! impl Pricer for Annuity {
//!     fn name(&self) -> &str {
//!         "annuity"
//!     }
//!     fn supports(&self, measure: &Measure) -> bool {
//!         *measure == Measure::Pv
//!     }
//!     fn evaluate(&self, _measure: &Measure) -> Result<f64, PricingError> {
//!         let curve = self.curve.read();
//!         let mut pv = 0.0;
//!         for year in 1..=5 {
//!             let t = year as f64;
//!             pv += (-curve.value(t)? * t).exp();
//!         }
//!         Ok(pv)
//!     }
//!     fn market_dependencies(&self) -> MarketDependencies {
//!         MarketDependencies::new().with(&self.curve)
//!     }
//! }
//!
//! let curve = CurveHandle::new(
//!     Curve::new(
//!         "USD-OIS",
//!         CurveKind::Discount,
//!         vec![CurveTenor::rate("1Y", 1.0, 0.01), CurveTenor::rate("5Y", 5.0, 0.02)],
//!     )
//!     .unwrap(),
//! );
//! let annuity: Arc<dyn Pricer> = Arc::new(Annuity { curve });
//!
//! let config = SensitivityConfig::new().with_bump_type(BumpType::Parallel);
//! let table = SensitivityCalculator::new(config)
//!     .compute(&[annuity], &[Measure::Pv])
//!     .unwrap();
//! assert_eq!(table.len(), 1);
//! assert!(table.rows()[0].delta < 0.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod bump;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod parallel;
pub mod results;
pub mod scenarios;
pub mod selection;
pub mod sensitivity;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use bump::{BumpResult, BumpTransaction};
pub use config::{BumpFlags, BumpType, HedgeTenor, SensitivityConfig, SensitivityMethod};
pub use error::{ConfigError, Result, SensitivityError};
pub use evaluator::PricerEvaluator;
pub use graph::DependencyGraph;
pub use parallel::ParallelConfig;
pub use results::{ResultAggregator, ResultRow, ResultTable, ScenarioResult};
pub use scenarios::{Scenario, ScenarioComposer, ScenarioShift};
pub use selection::{TenorFilter, TenorSelection};
pub use sensitivity::{HedgePricerFactory, SensitivityCalculator};
