//! Shared types for the market model.
//!
//! - `PricingError`, `CalibrationError`, `InterpolationError`: error enums
//! - `UnknownFlagError`: parse failure for bitmask labels

mod error;
mod flags;

pub use error::{CalibrationError, InterpolationError, PricingError};
pub use flags::{normalise_flag_name, UnknownFlagError};
