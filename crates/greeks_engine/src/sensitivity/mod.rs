//! Delta, gamma and hedge ratios per tenor selection.
//!
//! ## Finite difference
//!
//! For each selection the affected pricers are evaluated on the base market,
//! under the up bump and under the down bump. With realised widths `w_u`,
//! `w_d` and `w = w_u + w_d`:
//!
//! ```text
//! delta = (V_up - V_down) / w            (raw difference when unscaled)
//! gamma = (V_up - 2 V_base + V_down) / (w / 2)
//! ```
//!
//! A leg that is not requested, or that moves no quote, contributes the
//! base value and zero width.
//!
//! ## Semi-analytic
//!
//! Pricers supplying ordinate derivatives are differentiated through the
//! calibrators' quote Jacobians instead of being repriced.

mod calculator;
mod hedge;
mod semi_analytic;

pub use calculator::{SensitivityCalculator, HEDGE_DELTA_EPSILON};
pub use hedge::{resolve_hedge, HedgeChoice, HedgePricerFactory, MATURITY_MATCH_TOLERANCE};
pub use semi_analytic::{propagate_gradient, propagate_hessian, SemiAnalyticCalculator};
