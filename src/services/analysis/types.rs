use serde::Serialize;
use smallvec::SmallVec;

use crate::services::ranges::ParseDiagnostics;

pub const TOP_VALUES: usize = 3;

/// Statistics over the non-missing values of a numeric column. `None` means
/// undefined (no values, or fewer than two for `std`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    #[serde(rename = "unique")]
    pub unique_count: usize,
    /// Most frequent values first; ties keep input order.
    #[serde(rename = "top")]
    pub top_values: SmallVec<[(String, usize); TOP_VALUES]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
}

impl ColumnSummary {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnSummary::Numeric(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReport {
    pub name: String,
    pub summary: ColumnSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub row_count: usize,
    pub columns: Vec<ColumnReport>,
    pub diagnostics: ParseDiagnostics,
}

impl Report {
    pub fn numeric(&self) -> impl Iterator<Item = (&str, &NumericSummary)> {
        self.columns.iter().filter_map(|c| match &c.summary {
            ColumnSummary::Numeric(s) => Some((c.name.as_str(), s)),
            ColumnSummary::Categorical(_) => None,
        })
    }

    pub fn categorical(&self) -> impl Iterator<Item = (&str, &CategoricalSummary)> {
        self.columns.iter().filter_map(|c| match &c.summary {
            ColumnSummary::Categorical(s) => Some((c.name.as_str(), s)),
            ColumnSummary::Numeric(_) => None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.summary)
    }
}
