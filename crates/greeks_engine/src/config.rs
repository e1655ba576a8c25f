//! Configuration for sensitivity runs.
//!
//! # Default Values
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `bump_type` | ByTenor | One selection per tenor |
//! | `targets` | InterestRates | Discount and projection curves |
//! | `flags` | empty | Absolute bumps, dependents refit except credit/correlation |
//! | `up` / `down` | 0.0001 (1bp) | Bump magnitudes in quote units |
//! | `scale_delta` | true | Divide by the realised bump width |
//! | `calc_gamma` / `calc_hedge` | false | Optional columns |
//! | `hedge_tenor` | All | Hedge with the bumped tenor's instrument |
//! | `method` | FiniteDifference | Bump and reprice |
//!
//! Every field has a default, so a TOML file only needs the overrides:
//!
//! ```
//! use greeks_engine::config::{BumpType, SensitivityConfig};
//! use greeks_core::traits::BumpTarget;
//!
//! let config: SensitivityConfig = toml::from_str(r#"
//!     bump_type = "parallel"
//!     targets = ["InterestRates", "CreditQuotes"]
//!     up = 0.0005
//! "#).unwrap();
//! assert_eq!(config.bump_type, BumpType::Parallel);
//! assert!(config.targets.contains(BumpTarget::CREDIT_QUOTES));
//! assert_eq!(config.down, 0.0001);
//! ```

use crate::error::ConfigError;
use crate::parallel::ParallelConfig;
use greeks_core::traits::BumpTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One basis point in quote units.
pub const ONE_BP: f64 = 0.0001;

/// How tenors are grouped into bump units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpType {
    /// Every selected tenor of every curve in one selection.
    Uniform,
    /// One selection per curve.
    Parallel,
    /// One selection per distinct tenor point.
    #[default]
    ByTenor,
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BumpType::Uniform => "uniform",
            BumpType::Parallel => "parallel",
            BumpType::ByTenor => "by_tenor",
        })
    }
}

greeks_core::bitmask! {
    /// Modifiers of how a bump is applied.
    pub struct BumpFlags: u32 {
        /// Amounts are fractions of the tenor's quote.
        const BUMP_RELATIVE = 1 << 0 => "BumpRelative";
        /// Negate the amount (the down leg).
        const BUMP_DOWN = 1 << 1 => "BumpDown";
        /// Shift the bumped curve's ordinates directly instead of refitting it.
        const BUMP_IN_PLACE = 1 << 2 => "BumpInPlace";
        /// Refit credit curves depending on a bumped curve.
        const RECALIBRATE_SURVIVAL = 1 << 3 => "RecalibrateSurvival";
        /// Refit correlation curves depending on a bumped curve.
        const REMAP_CORRELATIONS = 1 << 4 => "RemapCorrelations";
        /// Drop the hedge when the matching tenor misses the pricer's maturity.
        const NO_HEDGE_ON_TENOR_MISMATCH = 1 << 5 => "NoHedgeOnTenorMismatch";
    }
}

/// Which tenor's hedge instrument is used for hedge ratios.
///
/// A closed set of rules; free text other than the keywords is a tenor name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HedgeTenor {
    /// The bumped tenor itself (single-tenor selections only).
    #[default]
    All,
    /// A tenor with this name.
    Named(String),
    /// The tenor nearest the pricer's maturity.
    Maturity,
    /// The bumped tenor nearest the pricer's maturity.
    Matching,
}

impl FromStr for HedgeTenor {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "" | "all" => HedgeTenor::All,
            "maturity" => HedgeTenor::Maturity,
            "matching" => HedgeTenor::Matching,
            _ => HedgeTenor::Named(trimmed.to_string()),
        })
    }
}

impl From<String> for HedgeTenor {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(tenor) => tenor,
            Err(never) => match never {},
        }
    }
}

impl From<HedgeTenor> for String {
    fn from(tenor: HedgeTenor) -> Self {
        tenor.to_string()
    }
}

impl fmt::Display for HedgeTenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HedgeTenor::All => f.write_str("all"),
            HedgeTenor::Named(name) => f.write_str(name),
            HedgeTenor::Maturity => f.write_str("maturity"),
            HedgeTenor::Matching => f.write_str("matching"),
        }
    }
}

/// How sensitivities are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMethod {
    /// Bump quotes, refit, reprice.
    #[default]
    FiniteDifference,
    /// Chain rule over pricer-supplied ordinate derivatives.
    SemiAnalytic,
}

/// Configuration of a sensitivity run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Grouping of tenors into selections.
    pub bump_type: BumpType,
    /// Curve categories to bump.
    pub targets: BumpTarget,
    /// Bump modifiers.
    pub flags: BumpFlags,
    /// Up bump magnitude; 0 skips the up leg.
    pub up: f64,
    /// Down bump magnitude; 0 skips the down leg.
    pub down: f64,
    /// Divide by the realised bump width.
    pub scale_delta: bool,
    /// Compute gamma.
    pub calc_gamma: bool,
    /// Compute hedge delta and notional.
    pub calc_hedge: bool,
    /// Hedge tenor rule.
    pub hedge_tenor: HedgeTenor,
    /// Restrict to these curve names.
    pub curve_filter: Option<BTreeSet<String>>,
    /// Restrict to these tenor names.
    pub tenor_filter: Option<BTreeSet<String>>,
    /// Skip pricers lacking the measure instead of failing.
    pub allow_missing: bool,
    /// Computation method.
    pub method: SensitivityMethod,
    /// Category label overriding the curve kind in result rows.
    pub category: Option<String>,
    /// Parallel evaluation settings.
    pub parallel: ParallelConfig,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            bump_type: BumpType::default(),
            targets: BumpTarget::INTEREST_RATES,
            flags: BumpFlags::empty(),
            up: ONE_BP,
            down: ONE_BP,
            scale_delta: true,
            calc_gamma: false,
            calc_hedge: false,
            hedge_tenor: HedgeTenor::default(),
            curve_filter: None,
            tenor_filter: None,
            allow_missing: false,
            method: SensitivityMethod::default(),
            category: None,
            parallel: ParallelConfig::default(),
        }
    }
}

impl SensitivityConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bump type.
    pub fn with_bump_type(mut self, bump_type: BumpType) -> Self {
        self.bump_type = bump_type;
        self
    }

    /// Sets the bump targets.
    pub fn with_targets(mut self, targets: BumpTarget) -> Self {
        self.targets = targets;
        self
    }

    /// Sets the bump flags.
    pub fn with_flags(mut self, flags: BumpFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets both bump magnitudes.
    pub fn with_bumps(mut self, up: f64, down: f64) -> Self {
        self.up = up;
        self.down = down;
        self
    }

    /// Enables or disables delta scaling.
    pub fn with_scale_delta(mut self, scale: bool) -> Self {
        self.scale_delta = scale;
        self
    }

    /// Enables or disables gamma.
    pub fn with_gamma(mut self, calc_gamma: bool) -> Self {
        self.calc_gamma = calc_gamma;
        self
    }

    /// Enables hedge ratios with the given hedge tenor rule.
    pub fn with_hedge(mut self, hedge_tenor: HedgeTenor) -> Self {
        self.calc_hedge = true;
        self.hedge_tenor = hedge_tenor;
        self
    }

    /// Restricts the run to the named curves.
    pub fn with_curve_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.curve_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the run to the named tenors.
    pub fn with_tenor_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tenor_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Skips pricers that lack the requested measure.
    pub fn with_allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    /// Sets the computation method.
    pub fn with_method(mut self, method: SensitivityMethod) -> Self {
        self.method = method;
        self
    }

    /// Overrides the category label of result rows.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the parallel evaluation settings.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// True when bumps are relative to the quote.
    pub fn is_relative(&self) -> bool {
        self.flags.contains(BumpFlags::BUMP_RELATIVE)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (side, value) in [("up", self.up), ("down", self.down)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidBumpSize { side, value });
            }
        }
        if self.targets.categories().is_empty() {
            return Err(ConfigError::EmptyTargets(self.targets.to_string()));
        }
        if self.flags.contains(BumpFlags::BUMP_DOWN) {
            return Err(ConfigError::Invalid(
                "BumpDown is set by the engine for the down leg; use `down` instead".to_string(),
            ));
        }
        if self.is_relative() && self.targets.contains(BumpTarget::INTEREST_RATE_BASIS) {
            return Err(ConfigError::UnsupportedBump {
                bump: "relative".to_string(),
                target: BumpTarget::INTEREST_RATE_BASIS.to_string(),
            });
        }
        if self.method == SensitivityMethod::SemiAnalytic {
            if self.is_relative() {
                return Err(ConfigError::UnsupportedBump {
                    bump: "relative".to_string(),
                    target: "semi-analytic sensitivities".to_string(),
                });
            }
            if self.calc_hedge {
                return Err(ConfigError::Invalid(
                    "hedge ratios require finite-difference sensitivities".to_string(),
                ));
            }
        }
        if self.parallel.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "parallel.batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
