use super::{ResultRow, ResultTable};

/// Column a table is totalled along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum AggregationKey {
    /// One total per pricer.
    #[default]
    Pricer,
    /// One total per curve (element).
    Element,
    /// One total per category.
    Category,
    /// One total per tenor label.
    Tenor,
}

impl AggregationKey {
    /// Name of the column.
    pub fn name(&self) -> &'static str {
        match self {
            AggregationKey::Pricer => "pricer",
            AggregationKey::Element => "element",
            AggregationKey::Category => "category",
            AggregationKey::Tenor => "tenor",
        }
    }

    fn of<'a>(&self, row: &'a ResultRow) -> &'a str {
        match self {
            AggregationKey::Pricer => &row.pricer,
            AggregationKey::Element => &row.element,
            AggregationKey::Category => &row.category,
            AggregationKey::Tenor => &row.tenor,
        }
    }
}

/// Totals over the rows of a [`ResultTable`].
///
/// Totals keep the first-appearance order of their keys so that reports
/// follow the table's selection order.
#[derive(Clone, Debug)]
pub struct ResultAggregator<'a> {
    table: &'a ResultTable,
}

impl<'a> ResultAggregator<'a> {
    /// Aggregator over `table`.
    pub fn new(table: &'a ResultTable) -> Self {
        Self { table }
    }

    /// Delta totals per key.
    pub fn delta_totals(&self, key: AggregationKey) -> Vec<(String, f64)> {
        self.totals(key, |row| Some(row.delta))
    }

    /// Gamma totals per key; rows without gamma count as zero.
    pub fn gamma_totals(&self, key: AggregationKey) -> Vec<(String, f64)> {
        self.totals(key, |row| row.gamma)
    }

    /// Hedge notional totals per key; rows without a hedge count as zero.
    pub fn hedge_notional_totals(&self, key: AggregationKey) -> Vec<(String, f64)> {
        self.totals(key, |row| row.hedge_notional)
    }

    /// Sum of every delta.
    pub fn total_delta(&self) -> f64 {
        self.table.iter().map(|r| r.delta).sum()
    }

    /// Sum of every gamma.
    pub fn total_gamma(&self) -> f64 {
        self.table.iter().filter_map(|r| r.gamma).sum()
    }

    /// Row with the largest absolute delta.
    pub fn largest_delta(&self) -> Option<&'a ResultRow> {
        self.table.iter().max_by(|a, b| {
            a.delta
                .abs()
                .partial_cmp(&b.delta.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    fn totals<F>(&self, key: AggregationKey, value: F) -> Vec<(String, f64)>
    where
        F: Fn(&ResultRow) -> Option<f64>,
    {
        let mut totals: Vec<(String, f64)> = Vec::new();
        for row in self.table {
            let label = key.of(row);
            let amount = value(row).unwrap_or(0.0);
            match totals.iter_mut().find(|(k, _)| k == label) {
                Some((_, total)) => *total += amount,
                None => totals.push((label.to_string(), amount)),
            }
        }
        totals
    }
}
