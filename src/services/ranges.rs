//! Splitting range-encoded columns into numeric `_lower` / `_upper` columns.
//!
//! Cells look like `[1000, 5000]`, `(1000, 5000)` or, as the ad archive
//! exports them, `{'lower_bound': '1000', 'upper_bound': '5000'}`. Only these
//! shapes are accepted; anything else is reported as a [`RangeParseError`]
//! and becomes a missing value.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::error::RangeParseError;
use crate::models::{Cell, ColumnKind, Number, Table};

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());
static SEQUENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\[(?P<list>[^\[\]]*)\]|\((?P<tuple>[^()]*)\))$").unwrap());
static MAPPING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{(?P<body>[^{}]*)\}$").unwrap());

const LOWER_KEY: &str = "lower_bound";
const UPPER_KEY: &str = "upper_bound";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeValue {
    Range { lower: Number, upper: Number },
    Missing,
}

impl RangeValue {
    pub fn lower(&self) -> Option<Number> {
        match self {
            RangeValue::Range { lower, .. } => Some(*lower),
            RangeValue::Missing => None,
        }
    }

    pub fn upper(&self) -> Option<Number> {
        match self {
            RangeValue::Range { upper, .. } => Some(*upper),
            RangeValue::Missing => None,
        }
    }
}

/// Parses a bare numeric literal, keeping integer form when there is one.
/// Non-finite values (`inf`, `nan`) are not numbers here.
pub fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if INT_RE.is_match(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Int(i));
        }
    }
    if FLOAT_RE.is_match(s) {
        return s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Number::Float);
    }
    None
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Splits on commas, tolerating one trailing comma as Python literals do.
fn split_elements(body: &str) -> Vec<&str> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() > 1 && parts.last().map_or(false, |p| p.is_empty()) {
        parts.pop();
    }
    parts
}

fn parse_element(raw: &str) -> Result<Number, RangeParseError> {
    parse_number(unquote(raw)).ok_or_else(|| RangeParseError::NotANumber(raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct RangeParser {
    missing_sentinels: Vec<String>,
}

impl Default for RangeParser {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl RangeParser {
    pub fn new(config: &Config) -> Self {
        Self {
            missing_sentinels: config.missing_sentinels.clone(),
        }
    }

    fn is_missing(&self, raw: &str) -> bool {
        raw.is_empty() || self.missing_sentinels.iter().any(|s| s == raw)
    }

    /// Total version of [`RangeParser::try_parse`]: malformed input is `Missing`.
    pub fn parse(&self, raw: &str) -> RangeValue {
        self.try_parse(raw).unwrap_or(RangeValue::Missing)
    }

    pub fn try_parse(&self, raw: &str) -> Result<RangeValue, RangeParseError> {
        let raw = raw.trim();
        if self.is_missing(raw) {
            return Ok(RangeValue::Missing);
        }

        if let Some(caps) = SEQUENCE_RE.captures(raw) {
            let body = caps
                .name("list")
                .or_else(|| caps.name("tuple"))
                .map_or("", |m| m.as_str());
            return Self::parse_sequence(body);
        }
        if let Some(caps) = MAPPING_RE.captures(raw) {
            return Self::parse_mapping(&caps["body"]);
        }
        Err(RangeParseError::Syntax(raw.to_string()))
    }

    fn parse_sequence(body: &str) -> Result<RangeValue, RangeParseError> {
        let parts = split_elements(body);
        if parts.len() != 2 {
            return Err(RangeParseError::Arity(parts.len()));
        }
        Ok(RangeValue::Range {
            lower: parse_element(parts[0])?,
            upper: parse_element(parts[1])?,
        })
    }

    fn parse_mapping(body: &str) -> Result<RangeValue, RangeParseError> {
        let mut lower = None;
        let mut upper = None;

        for entry in split_elements(body) {
            let (key, value) = entry
                .split_once(':')
                .ok_or_else(|| RangeParseError::Syntax(entry.to_string()))?;
            let key = key.trim();
            let unquoted = unquote(key);
            if unquoted.len() == key.len() {
                // keys must be string literals
                return Err(RangeParseError::Syntax(key.to_string()));
            }
            let slot = match unquoted {
                LOWER_KEY => &mut lower,
                UPPER_KEY => &mut upper,
                other => return Err(RangeParseError::UnknownKey(other.to_string())),
            };
            if slot.is_some() {
                return Err(RangeParseError::DuplicateKey(unquoted.to_string()));
            }
            *slot = Some(parse_element(value)?);
        }

        match (lower, upper) {
            (Some(lower), Some(upper)) => Ok(RangeValue::Range { lower, upper }),
            (None, _) => Err(RangeParseError::MissingKey(LOWER_KEY)),
            (_, None) => Err(RangeParseError::MissingKey(UPPER_KEY)),
        }
    }
}

/// Outcome of splitting one range column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeColumnDiagnostics {
    pub column: String,
    pub parsed: usize,
    pub missing: usize,
    pub malformed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseDiagnostics {
    pub columns: Vec<RangeColumnDiagnostics>,
    /// Configured range columns that were not in the input.
    pub absent: Vec<String>,
}

impl ParseDiagnostics {
    pub fn total_malformed(&self) -> usize {
        self.columns.iter().map(|c| c.malformed).sum()
    }
}

pub fn lower_name(column: &str) -> String {
    format!("{}_lower", column)
}

pub fn upper_name(column: &str) -> String {
    format!("{}_upper", column)
}

/// Appends `<name>_lower` and `<name>_upper` for every range column present
/// in `table`. The source columns are left untouched.
pub fn derive_range_columns(
    table: &mut Table,
    parser: &RangeParser,
    range_columns: &[String],
) -> ParseDiagnostics {
    let mut diagnostics = ParseDiagnostics::default();

    for name in range_columns {
        let Some(column) = table.column(name) else {
            tracing::warn!("Range column {} not found in input, skipping", name);
            diagnostics.absent.push(name.clone());
            continue;
        };

        let mut stats = RangeColumnDiagnostics {
            column: name.clone(),
            ..Default::default()
        };
        let mut lowers = Vec::with_capacity(column.cells.len());
        let mut uppers = Vec::with_capacity(column.cells.len());

        for (row, cell) in column.cells.iter().enumerate() {
            let value = match cell {
                Cell::Missing => RangeValue::Missing,
                Cell::Text(raw) => match parser.try_parse(raw) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::debug!("Row {}: malformed {} value: {}", row + 1, name, e);
                        stats.malformed += 1;
                        RangeValue::Missing
                    }
                },
                // Already numeric: a degenerate range.
                Cell::Number(n) => RangeValue::Range { lower: *n, upper: *n },
            };
            match value {
                RangeValue::Range { .. } => stats.parsed += 1,
                RangeValue::Missing => stats.missing += 1,
            }
            lowers.push(Cell::from(value.lower()));
            uppers.push(Cell::from(value.upper()));
        }

        if stats.malformed > 0 {
            tracing::warn!(
                "{} of {} values in {} could not be parsed and were treated as missing",
                stats.malformed,
                column.cells.len(),
                name
            );
        }

        table.push_column(lower_name(name), ColumnKind::Derived, lowers);
        table.push_column(upper_name(name), ColumnKind::Derived, uppers);
        diagnostics.columns.push(stats);
    }

    diagnostics
}
