//! Risk factor selection.

bitmask! {
    /// Curve categories whose tenors a sensitivity run perturbs.
    ///
    /// Every [`CurveKind`](crate::market_data::curves::CurveKind) maps to one
    /// bit. `INCLUDE_SPOT` is a modifier: it adds spot-quoted tenors of the
    /// selected categories and selects nothing on its own.
    ///
    /// ```
    /// use greeks_core::traits::BumpTarget;
    ///
    /// let targets: BumpTarget = "InterestRates | CreditQuotes".parse().unwrap();
    /// assert!(targets.contains(BumpTarget::CREDIT_QUOTES));
    /// assert!(!targets.contains(BumpTarget::VOLATILITIES));
    /// ```
    pub struct BumpTarget: u32 {
        /// Discount and projection curves.
        const INTEREST_RATES = 1 << 0 => "InterestRates";
        /// Basis curves.
        const INTEREST_RATE_BASIS = 1 << 1 => "InterestRateBasis";
        /// FX curves.
        const FX_RATES = 1 << 2 => "FxRates";
        /// Credit spread curves.
        const CREDIT_QUOTES = 1 << 3 => "CreditQuotes";
        /// Inflation curves.
        const INFLATION_RATES = 1 << 4 => "InflationRates";
        /// Commodity curves.
        const COMMODITY_PRICE = 1 << 5 => "CommodityPrice";
        /// Stock curves.
        const STOCK_PRICE = 1 << 6 => "StockPrice";
        /// Volatility curves and surfaces.
        const VOLATILITIES = 1 << 7 => "Volatilities";
        /// Also bump spot-quoted tenors.
        const INCLUDE_SPOT = 1 << 8 => "IncludeSpot";
        /// Recovery rate curves.
        const RECOVERY_RATES = 1 << 9 => "RecoveryRates";
        /// Correlation curves.
        const CORRELATIONS = 1 << 10 => "Correlations";
    }
}

impl BumpTarget {
    /// The category bits, i.e. everything except modifiers.
    pub fn categories(self) -> BumpTarget {
        self - BumpTarget::INCLUDE_SPOT
    }

    /// True when spot tenors are included.
    pub fn includes_spot(self) -> bool {
        self.contains(BumpTarget::INCLUDE_SPOT)
    }
}
