//! # greeks_core: Market Model Foundation for Bump-and-Reprice Sensitivities
//!
//! ## Layer 1 (Foundation) Role
//!
//! greeks_core is the bottom layer of the workspace, providing:
//! - Quote-bearing curves and their tenors (`market_data::curves`)
//! - Shareable, lockable curve handles with stable identity (`CurveHandle`)
//! - Reference calibrators that refit ordinates from quotes (`market_data::curves::calibrators`)
//! - Capability traits consumed by the engine: `Pricer`, `Calibrator`, `SharedModel` (`traits`)
//! - The `BumpTarget` bitmask selecting curve categories (`traits::risk`)
//! - Error types: `PricingError`, `CalibrationError`, `InterpolationError` (`types::error`)
//!
//! ## Dependencies
//!
//! Layer 1 has no dependencies on other greeks_* crates, with minimal external dependencies:
//! - num-traits: generic floating point interpolation
//! - parking_lot: non-poisoning `RwLock` behind `CurveHandle`
//! - thiserror: error enums
//! - serde: configuration and result serialisation
//!
//! ## Usage Examples
//!
//! ```rust
//! use greeks_core::market_data::curves::{Curve, CurveHandle, CurveKind, CurveTenor};
//!
//! let curve = Curve::new(
//!     "USD-OIS",
//!     CurveKind::Discount,
//!     vec![CurveTenor::rate("1Y", 1.0, 0.01), CurveTenor::rate("5Y", 5.0, 0.02)],
//! )
//! .unwrap();
//! let handle = CurveHandle::new(curve);
//!
//! let rate = handle.read().value(3.0).unwrap();
//! assert!((rate - 0.015).abs() < 1e-12);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

#[macro_use]
mod macros;

pub mod market_data;
pub mod math;
pub mod traits;
pub mod types;

#[doc(hidden)]
pub use serde as __serde;
