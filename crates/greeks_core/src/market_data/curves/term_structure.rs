//! Term structure views over fitted curves.

use super::Curve;
use crate::market_data::MarketDataError;

/// Continuously compounded term structure.
///
/// Implementors provide the zero rate; discount factors and forwards follow.
pub trait TermStructure {
    /// Continuously compounded zero rate to `t`.
    fn zero_rate(&self, t: f64) -> Result<f64, MarketDataError>;

    /// Discount factor `exp(-r(t) t)`.
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidTime { time: t });
        }
        Ok((-self.zero_rate(t)? * t).exp())
    }

    /// Continuously compounded forward rate between `t1` and `t2`.
    fn forward_rate(&self, t1: f64, t2: f64) -> Result<f64, MarketDataError> {
        let dt = t2 - t1;
        if dt <= 0.0 {
            return Err(MarketDataError::InvalidTime { time: dt });
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok(-(df2 / df1).ln() / dt)
    }
}

impl TermStructure for Curve {
    fn zero_rate(&self, t: f64) -> Result<f64, MarketDataError> {
        self.value(t)
    }
}

impl Curve {
    /// Survival probability to `t` for a hazard-rate curve.
    ///
    /// Ordinates are read as average hazard rates; a recorded default at or
    /// before `t` gives zero.
    pub fn survival_probability(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidTime { time: t });
        }
        if self.default_time().is_some_and(|d| d <= t) {
            return Ok(0.0);
        }
        Ok((-self.value(t)? * t).exp())
    }
}
