//! Sensitivity and scenario results.
//!
//! - [`ResultTable`]: ordered rows `{category, element, tenor, pricer, delta,
//!   gamma?, hedge_tenor?, hedge_delta?, hedge_notional?}`, one per
//!   (selection, pricer) pair, in selection order
//! - [`ResultAggregator`]: totals of a table along one column
//! - [`ScenarioResult`]: base and shifted values per pricer

mod aggregator;
mod scenario;
mod table;

pub use aggregator::{AggregationKey, ResultAggregator};
pub use scenario::{ScenarioPnl, ScenarioResult};
pub use table::{ResultRow, ResultTable};
