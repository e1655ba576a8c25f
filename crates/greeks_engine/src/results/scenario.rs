use serde::{Deserialize, Serialize};

/// Base and shifted value of one pricer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPnl {
    /// Pricer label, or `total`.
    pub pricer: String,
    /// Value before the scenario.
    pub base: f64,
    /// Value under the scenario.
    pub shifted: f64,
    /// `shifted - base`.
    pub pnl: f64,
    /// P&L as a fraction of `|base|`; zero for a zero base.
    pub pnl_pct: f64,
}

impl ScenarioPnl {
    /// Creates a P&L entry.
    pub fn new(pricer: impl Into<String>, base: f64, shifted: f64) -> Self {
        let pnl = shifted - base;
        let pnl_pct = if base != 0.0 { pnl / base.abs() } else { 0.0 };
        Self {
            pricer: pricer.into(),
            base,
            shifted,
            pnl,
            pnl_pct,
        }
    }

    /// True for a negative P&L.
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }

    /// True for a positive P&L.
    pub fn is_gain(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name.
    pub scenario: String,
    /// One entry per pricer, in input order.
    pub pnls: Vec<ScenarioPnl>,
}

impl ScenarioResult {
    /// Empty result.
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            pnls: Vec::new(),
        }
    }

    /// Appends a pricer's P&L.
    pub fn push(&mut self, pnl: ScenarioPnl) {
        self.pnls.push(pnl);
    }

    /// Entry of one pricer.
    pub fn pnl_of(&self, pricer: &str) -> Option<&ScenarioPnl> {
        self.pnls.iter().find(|p| p.pricer == pricer)
    }

    /// Sum over all pricers.
    pub fn total(&self) -> ScenarioPnl {
        let base = self.pnls.iter().map(|p| p.base).sum();
        let shifted = self.pnls.iter().map(|p| p.shifted).sum();
        ScenarioPnl::new("total", base, shifted)
    }

    /// Entry with the lowest P&L.
    pub fn worst(&self) -> Option<&ScenarioPnl> {
        self.pnls.iter().min_by(|a, b| {
            a.pnl
                .partial_cmp(&b.pnl)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}
