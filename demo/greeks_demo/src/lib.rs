//! # Greeks Demo
//!
//! Runs the bump-and-reprice engine over a synthetic USD rates and credit
//! market: per-tenor deltas, gammas and hedge notionals for a book of swaps
//! and CDS, plus a set of preset stress scenarios.
//!
//! ## Features
//!
//! - **Sensitivities**: Uniform, Parallel or ByTenor bumps, finite difference or semi-analytic
//! - **Hedges**: par OIS swaps and par CDS as hedge instruments
//! - **Scenarios**: rate, credit and recovery shifts, default events, date rolls, coupon resets
//!
//! Configuration comes from `greeks_demo.toml` with `GREEKS_DEMO_*`
//! environment overrides; the `[sensitivity]` table is the engine's own
//! configuration.

pub mod config;
pub mod error;
pub mod market;
pub mod report;
pub mod scenarios;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DemoConfig, OutputFormat};
    pub use crate::error::{DemoError, Result};
    pub use crate::market::{CdsPricer, DemoMarket, ParHedgeFactory, SwapPricer};
    pub use crate::scenarios::{all_presets, preset, PRESETS};
}
