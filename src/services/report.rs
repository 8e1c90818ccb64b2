//! Text and JSON renderings of a [`Report`].

use std::fmt::Write as _;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::AppError;
use crate::services::analysis::Report;

const NAME_WIDTH: usize = 35;

fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "NaN".to_string(),
    }
}

/// Single-quotes a label, or double-quotes it when it holds an apostrophe.
fn quote(value: &str) -> String {
    if value.contains('\'') && !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value.replace('\'', "\\'"))
    }
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Rows: {}", report.row_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "Numeric columns:");
    let _ = writeln!(out, "----------------");
    let numeric: Vec<_> = report.numeric().collect();
    if numeric.is_empty() {
        let _ = writeln!(out, "(none)");
    } else {
        let _ = writeln!(
            out,
            "{:<width$} {:>8} {:>14} {:>14} {:>14} {:>14}",
            "column",
            "count",
            "mean",
            "std",
            "min",
            "max",
            width = NAME_WIDTH
        );
        for (name, s) in numeric {
            let _ = writeln!(
                out,
                "{:<width$} {:>8} {:>14} {:>14} {:>14} {:>14}",
                name,
                s.count,
                fmt_stat(s.mean),
                fmt_stat(s.std),
                fmt_stat(s.min),
                fmt_stat(s.max),
                width = NAME_WIDTH
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Categorical columns:");
    let _ = writeln!(out, "--------------------");
    let categorical: Vec<_> = report.categorical().collect();
    if categorical.is_empty() {
        let _ = writeln!(out, "(none)");
    }
    for (name, s) in categorical {
        let _ = writeln!(out, "{}", name);
        let _ = writeln!(out, "  • unique = {}", s.unique_count);
        let _ = writeln!(out, "  • top values:");
        for (value, count) in &s.top_values {
            let _ = writeln!(out, "      {}  (n={})", quote(value), count);
        }
        let _ = writeln!(out);
    }

    let malformed: Vec<_> = report
        .diagnostics
        .columns
        .iter()
        .filter(|c| c.malformed > 0)
        .collect();
    if !malformed.is_empty() {
        let _ = writeln!(
            out,
            "Unparsable range values ({} treated as missing):",
            report.diagnostics.total_malformed()
        );
        for c in malformed {
            let _ = writeln!(out, "  {:<width$} {}", c.column, c.malformed, width = NAME_WIDTH);
        }
    }

    out
}

struct NumericSection<'a>(&'a Report);

impl Serialize for NumericSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, summary) in self.0.numeric() {
            map.serialize_entry(name, summary)?;
        }
        map.end()
    }
}

struct CategoricalSection<'a>(&'a Report);

impl Serialize for CategoricalSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, summary) in self.0.categorical() {
            map.serialize_entry(name, summary)?;
        }
        map.end()
    }
}

struct ParseErrorSection<'a>(&'a Report);

impl Serialize for ParseErrorSection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for c in &self.0.diagnostics.columns {
            map.serialize_entry(&c.column, &c.malformed)?;
        }
        map.end()
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("rows", &self.row_count)?;
        map.serialize_entry("numeric", &NumericSection(self))?;
        map.serialize_entry("categorical", &CategoricalSection(self))?;
        map.serialize_entry("parse_errors", &ParseErrorSection(self))?;
        map.end()
    }
}

pub fn render_json(report: &Report) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(report)?)
}
