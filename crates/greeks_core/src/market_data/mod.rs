//! Market data structures for sensitivity calculation.
//!
//! This module provides:
//! - [`curves`]: quote-bearing curves, tenors, handles and reference calibrators
//! - [`MarketDataError`]: construction and lookup failures
//!
//! ## Design Principles
//!
//! - **Quotes drive ordinates**: a curve's fitted ordinates are always a
//!   function of its tenor quotes (and its prerequisite curves), re-derived by
//!   [`Curve::refit`](curves::Curve::refit).
//! - **Exact snapshots**: [`CurveState`](curves::CurveState) captures everything a
//!   bump may touch so that a restore is bit-for-bit.
//! - **Shared handles**: curves are owned externally and referenced through
//!   [`CurveHandle`](curves::CurveHandle).

pub mod curves;
mod error;

pub use error::MarketDataError;
