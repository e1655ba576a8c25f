//! Quote points on a curve.

use serde::{Deserialize, Serialize};

/// How a tenor's quote is expressed.
///
/// The convention fixes the natural bounds of the quote; bumps are clipped
/// to these bounds so that, for example, a recovery rate never leaves `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteConvention {
    /// Interest rate (deposit, swap or zero rate).
    Rate,
    /// Spread over another curve or a credit spread.
    Spread,
    /// Price level (FX forward, commodity, stock).
    Price,
    /// Volatility.
    Volatility,
    /// Recovery rate.
    Recovery,
    /// Correlation.
    Correlation,
    /// Spot point, only bumped when explicitly requested.
    Spot,
}

impl QuoteConvention {
    /// Natural `(lower, upper)` bounds of a quote under this convention.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            QuoteConvention::Rate | QuoteConvention::Spread => (f64::NEG_INFINITY, f64::INFINITY),
            QuoteConvention::Price | QuoteConvention::Volatility | QuoteConvention::Spot => {
                (0.0, f64::INFINITY)
            }
            QuoteConvention::Recovery => (0.0, 1.0),
            QuoteConvention::Correlation => (-1.0, 1.0),
        }
    }

    /// Clips `value` into the natural bounds.
    pub fn clip(self, value: f64) -> f64 {
        let (lo, hi) = self.bounds();
        value.max(lo).min(hi)
    }

    /// True for spot quotes.
    pub fn is_spot(self) -> bool {
        matches!(self, QuoteConvention::Spot)
    }
}

/// Descriptor of the instrument that hedges a tenor (e.g. the 5Y par swap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeInstrument {
    /// Instrument identifier understood by the hedge pricer factory.
    pub id: String,
    /// Maturity as a year fraction.
    pub maturity: f64,
}

impl HedgeInstrument {
    /// Creates a hedge descriptor.
    pub fn new(id: impl Into<String>, maturity: f64) -> Self {
        Self {
            id: id.into(),
            maturity,
        }
    }
}

/// A named quote point on a curve.
///
/// Tenor names are unique within their curve and tenors are ordered by
/// maturity; both invariants are enforced by
/// [`Curve::new`](super::Curve::new).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveTenor {
    name: String,
    maturity: f64,
    quote: f64,
    convention: QuoteConvention,
    hedge: Option<HedgeInstrument>,
}

impl CurveTenor {
    /// Creates a tenor.
    pub fn new(
        name: impl Into<String>,
        maturity: f64,
        quote: f64,
        convention: QuoteConvention,
    ) -> Self {
        Self {
            name: name.into(),
            maturity,
            quote,
            convention,
            hedge: None,
        }
    }

    /// Rate-quoted tenor.
    pub fn rate(name: impl Into<String>, maturity: f64, quote: f64) -> Self {
        Self::new(name, maturity, quote, QuoteConvention::Rate)
    }

    /// Spread-quoted tenor.
    pub fn spread(name: impl Into<String>, maturity: f64, quote: f64) -> Self {
        Self::new(name, maturity, quote, QuoteConvention::Spread)
    }

    /// Attaches a hedge instrument.
    pub fn with_hedge(mut self, hedge: HedgeInstrument) -> Self {
        self.hedge = Some(hedge);
        self
    }

    /// Copy of this tenor carrying another quote.
    pub fn with_quote(&self, quote: f64) -> Self {
        Self {
            quote,
            ..self.clone()
        }
    }

    /// Tenor name, e.g. `"5Y"`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maturity as a year fraction.
    #[inline]
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Current quote.
    #[inline]
    pub fn quote(&self) -> f64 {
        self.quote
    }

    /// Quote convention.
    #[inline]
    pub fn convention(&self) -> QuoteConvention {
        self.convention
    }

    /// Hedge instrument descriptor, if any.
    #[inline]
    pub fn hedge(&self) -> Option<&HedgeInstrument> {
        self.hedge.as_ref()
    }

    /// True when `other` denotes the same market point (same name and maturity).
    pub fn same_point(&self, other: &CurveTenor) -> bool {
        self.name == other.name && self.maturity.to_bits() == other.maturity.to_bits()
    }

    pub(crate) fn set_quote(&mut self, quote: f64) {
        self.quote = quote;
    }
}
