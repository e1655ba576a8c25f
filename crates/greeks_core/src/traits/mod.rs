//! Capability traits consumed by the sensitivity engine.
//!
//! - [`Pricer`]: opaque valuation function over a [`Measure`]
//! - [`SharedModel`]: cached sub-model referenced by several pricers
//! - [`Calibrator`]: refits a curve from its quotes
//! - [`BumpTarget`]: bitmask selecting curve categories

mod calibration;
mod pricer;
pub mod risk;

pub use calibration::{
    central_difference_jacobian, finite_difference_jacobian, CalibrationInput, Calibrator, QuoteJacobian, JACOBIAN_STEP,
};
pub use pricer::{Measure, MarketDependencies, OrdinateDerivatives, Pricer, SharedModel};
pub use risk::BumpTarget;
