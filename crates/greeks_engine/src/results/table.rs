use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sensitivity of one pricer to one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Curve category of the selection (or the configured override).
    pub category: String,
    /// Owning curve, or `all` for uniform bumps.
    pub element: String,
    /// Tenor name, or `all` for whole-curve bumps.
    pub tenor: String,
    /// Pricer label.
    pub pricer: String,
    /// First-order sensitivity.
    pub delta: f64,
    /// Second-order sensitivity, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    /// Tenor whose hedge instrument was used; empty when none matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedge_tenor: Option<String>,
    /// Sensitivity of the hedge instrument to the same bump.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedge_delta: Option<f64>,
    /// Hedge quantity offsetting `delta`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedge_notional: Option<f64>,
}

impl ResultRow {
    /// Row with delta only.
    pub fn new(
        category: impl Into<String>,
        element: impl Into<String>,
        tenor: impl Into<String>,
        pricer: impl Into<String>,
        delta: f64,
    ) -> Self {
        Self {
            category: category.into(),
            element: element.into(),
            tenor: tenor.into(),
            pricer: pricer.into(),
            delta,
            gamma: None,
            hedge_tenor: None,
            hedge_delta: None,
            hedge_notional: None,
        }
    }

    /// Adds a gamma.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Adds hedge columns.
    pub fn with_hedge(mut self, tenor: impl Into<String>, delta: f64, notional: f64) -> Self {
        self.hedge_tenor = Some(tenor.into());
        self.hedge_delta = Some(delta);
        self.hedge_notional = Some(notional);
        self
    }
}

/// Ordered sensitivity rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row.
    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Iterator over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one pricer.
    pub fn for_pricer<'a>(&'a self, pricer: &'a str) -> impl Iterator<Item = &'a ResultRow> {
        self.rows.iter().filter(move |r| r.pricer == pricer)
    }

    /// The row for an (element, tenor, pricer) triple.
    pub fn find(&self, element: &str, tenor: &str, pricer: &str) -> Option<&ResultRow> {
        self.rows
            .iter()
            .find(|r| r.element == element && r.tenor == tenor && r.pricer == pricer)
    }

    /// Distinct pricer labels in first-appearance order.
    pub fn pricers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.pricer.as_str())
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// Moves the rows of `other` to the end of this table.
    pub fn extend(&mut self, other: ResultTable) {
        self.rows.extend(other.rows);
    }

    /// Consumes the table.
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }
}

impl FromIterator<ResultRow> for ResultTable {
    fn from_iter<I: IntoIterator<Item = ResultRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResultTable {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
