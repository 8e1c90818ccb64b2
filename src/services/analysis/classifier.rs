use std::collections::HashSet;

use crate::config::{Config, EmptyColumnPolicy};
use crate::models::{Column, ColumnKind, Table};
use crate::services::ranges::ParseDiagnostics;

use super::types::*;
use super::utils::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Numeric,
    Categorical,
}

/// Decides numeric vs categorical per column and summarizes it.
#[derive(Debug, Clone)]
pub struct ColumnClassifier {
    excluded: HashSet<String>,
    top_n: usize,
    empty_columns: EmptyColumnPolicy,
}

impl ColumnClassifier {
    pub fn new(config: &Config) -> Self {
        let excluded = config
            .range_columns
            .iter()
            .chain(config.id_columns.iter())
            .cloned()
            .collect();
        Self {
            excluded,
            top_n: config.top_n,
            empty_columns: config.empty_columns,
        }
    }

    /// Summaries for every non-range, non-id column, in table order.
    pub fn classify(&self, table: &Table) -> Vec<ColumnReport> {
        table
            .columns()
            .iter()
            .filter(|c| !self.excluded.contains(&c.name))
            .map(|column| ColumnReport {
                name: column.name.clone(),
                summary: self.analyze_column(column),
            })
            .collect()
    }

    pub fn report(&self, table: &Table, diagnostics: ParseDiagnostics) -> Report {
        let start = std::time::Instant::now();
        let columns = self.classify(table);
        let numeric = columns.iter().filter(|c| c.summary.is_numeric()).count();
        tracing::info!(
            "Classified {} columns ({} numeric, {} categorical) in {:?}",
            columns.len(),
            numeric,
            columns.len() - numeric,
            start.elapsed()
        );
        Report {
            row_count: table.row_count(),
            columns,
            diagnostics,
        }
    }

    pub fn analyze_column(&self, column: &Column) -> ColumnSummary {
        match self.detect_column_type(column) {
            ColumnType::Numeric => {
                let mut acc = NumericAccumulator::default();
                column
                    .cells
                    .iter()
                    .filter_map(cell_number)
                    .for_each(|n| acc.add(n.as_f64()));
                ColumnSummary::Numeric(acc.finish())
            }
            ColumnType::Categorical => {
                let mut counter = FrequencyCounter::default();
                column
                    .cells
                    .iter()
                    .filter_map(cell_label)
                    .for_each(|v| counter.add(v));
                ColumnSummary::Categorical(counter.finish(self.top_n))
            }
        }
    }

    fn detect_column_type(&self, column: &Column) -> ColumnType {
        if column.kind == ColumnKind::Derived {
            return ColumnType::Numeric;
        }

        let mut present = column.cells.iter().filter(|c| !c.is_missing()).peekable();
        if present.peek().is_none() {
            return match self.empty_columns {
                EmptyColumnPolicy::Categorical => ColumnType::Categorical,
                EmptyColumnPolicy::Numeric => ColumnType::Numeric,
            };
        }

        if present.all(|c| cell_number(c).is_some()) {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, Number};
    use crate::services::ranges::{derive_range_columns, RangeParser};

    fn text(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Cell::Missing
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect()
    }

    fn numeric(summary: &ColumnSummary) -> &NumericSummary {
        match summary {
            ColumnSummary::Numeric(s) => s,
            other => panic!("expected numeric, got {:?}", other),
        }
    }

    fn categorical(summary: &ColumnSummary) -> &CategoricalSummary {
        match summary {
            ColumnSummary::Categorical(s) => s,
            other => panic!("expected categorical, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_column() {
        let mut table = Table::new(4);
        table.push_column("n", ColumnKind::Raw, text(&["10", "20", "", "30"]));
        let report = ColumnClassifier::new(&Config::default()).classify(&table);

        let s = numeric(&report[0].summary);
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, Some(20.0));
        assert_eq!(s.min, Some(10.0));
        assert_eq!(s.max, Some(30.0));
        assert!((s.std.unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_column() {
        let mut table = Table::new(3);
        table.push_column(
            "publisher_platforms",
            ColumnKind::Raw,
            text(&["facebook", "facebook", "instagram"]),
        );
        let report = ColumnClassifier::new(&Config::default()).classify(&table);

        let s = categorical(&report[0].summary);
        assert_eq!(s.unique_count, 2);
        assert_eq!(
            s.top_values.to_vec(),
            vec![("facebook".to_string(), 2), ("instagram".to_string(), 1)]
        );
    }

    #[test]
    fn test_one_non_number_makes_column_categorical() {
        let mut table = Table::new(3);
        table.push_column("mixed", ColumnKind::Raw, text(&["1", "2", "two"]));
        let report = ColumnClassifier::new(&Config::default()).classify(&table);
        assert_eq!(categorical(&report[0].summary).unique_count, 3);
    }

    #[test]
    fn test_empty_column_policy() {
        let mut table = Table::new(2);
        table.push_column("empty", ColumnKind::Raw, text(&["", ""]));

        let report = ColumnClassifier::new(&Config::default()).classify(&table);
        let s = categorical(&report[0].summary);
        assert_eq!(s.unique_count, 0);
        assert!(s.top_values.is_empty());

        let config = Config {
            empty_columns: EmptyColumnPolicy::Numeric,
            ..Config::default()
        };
        let report = ColumnClassifier::new(&config).classify(&table);
        let s = numeric(&report[0].summary);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, None);
        assert_eq!(s.std, None);
    }

    #[test]
    fn test_range_and_id_columns_are_excluded() {
        let mut table = Table::new(2);
        table.push_column("id", ColumnKind::Raw, text(&["a1", "a2"]));
        table.push_column("impressions", ColumnKind::Raw, text(&["[1000, 5000]", "NaN"]));
        table.push_column("page", ColumnKind::Raw, text(&["x", "y"]));
        let config = Config {
            id_columns: vec!["id".to_string()],
            ..Config::default()
        };
        let parser = RangeParser::new(&config);
        let diagnostics = derive_range_columns(&mut table, &parser, &config.range_columns);

        let classifier = ColumnClassifier::new(&config);
        let report = classifier.report(&table, diagnostics);
        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["page", "impressions_lower", "impressions_upper"]);

        let lower = numeric(report.get("impressions_lower").unwrap());
        assert_eq!(lower.count, 1);
        assert_eq!(lower.mean, Some(1000.0));
        assert_eq!(report.row_count, 2);
    }

    #[test]
    fn test_all_missing_derived_column_stays_numeric() {
        let mut table = Table::new(2);
        table.push_column(
            "spend_lower",
            ColumnKind::Derived,
            vec![Cell::Missing, Cell::from(None::<Number>)],
        );
        let report = ColumnClassifier::new(&Config::default()).classify(&table);
        assert_eq!(numeric(&report[0].summary).count, 0);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let mut table = Table::new(3);
        table.push_column("a", ColumnKind::Raw, text(&["1", "2.5", ""]));
        table.push_column("b", ColumnKind::Raw, text(&["x", "y", "x"]));
        let classifier = ColumnClassifier::new(&Config::default());
        assert_eq!(classifier.classify(&table), classifier.classify(&table));
    }

    #[test]
    fn test_summary_invariants() {
        let mut table = Table::new(6);
        table.push_column(
            "n",
            ColumnKind::Raw,
            text(&["0.1", "0.1", "0.1", "1e6", "-3", "7"]),
        );
        table.push_column(
            "c",
            ColumnKind::Raw,
            text(&["a", "b", "c", "d", "a", "b"]),
        );
        let report = ColumnClassifier::new(&Config::default()).classify(&table);

        let n = numeric(&report[0].summary);
        let mean = n.mean.unwrap();
        assert!(n.min.unwrap() <= mean && mean <= n.max.unwrap());
        assert!(n.std.unwrap() >= 0.0);

        let c = categorical(&report[1].summary);
        assert!(c.top_values.len() <= 3);
        assert!(c.unique_count >= c.top_values.len());
        assert!(c.top_values.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
