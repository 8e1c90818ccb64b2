//! Histogram and grouped boxplot data, rendered as text charts.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{Column, Table};
use crate::services::analysis::utils::{cell_label, cell_number};

const BAR_WIDTH: usize = 50;
const SKETCH_WIDTH: usize = 40;
const WHISKER_IQR: f64 = 1.5;

static LIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(?P<body>.*)\]$").unwrap());
static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'(?P<single>[^']*)'|"(?P<double>[^"]*)""#).unwrap());
static SEPARATORS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s,]*$").unwrap());

fn find_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column, AppError> {
    table
        .column(name)
        .ok_or_else(|| AppError::UnknownColumn(name.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub log_scale: bool,
    pub bins: Vec<Bin>,
    /// Non-missing cells that were not numbers.
    pub skipped: usize,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Equal-width bins between the column's min and max. The last bin is closed
/// on the right; a constant column gets a unit-wide range around its value.
pub fn histogram(
    table: &Table,
    column_name: &str,
    bins: usize,
    log_scale: bool,
) -> Result<Histogram, AppError> {
    if bins == 0 {
        return Err(AppError::InvalidInput("bins must be at least 1".to_string()));
    }
    let column = find_column(table, column_name)?;

    let mut values = Vec::new();
    let mut skipped = 0;
    for cell in column.cells.iter().filter(|c| !c.is_missing()) {
        match cell_number(cell) {
            Some(n) => values.push(n.as_f64()),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!("{} non-numeric values in {} left out of the histogram", skipped, column_name);
    }

    let mut result = Histogram {
        column: column_name.to_string(),
        log_scale,
        bins: Vec::new(),
        skipped,
    };
    let Some((min, max)) = min_max(&values) else {
        return Ok(result);
    };
    let (lo, hi) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (hi - lo) / bins as f64;

    result.bins = (0..bins)
        .map(|i| Bin {
            start: lo + width * i as f64,
            end: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        result.bins[idx].count += 1;
    }
    Ok(result)
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}

/// Group labels held in a cell. `['facebook', 'instagram']` yields both
/// labels; anything that is not a list of quoted strings is one label.
pub fn group_labels(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let Some(caps) = LIST_RE.captures(trimmed) else {
        return vec![trimmed.to_string()];
    };
    let body = &caps["body"];
    let leftover = QUOTED_RE.replace_all(body, "");
    if !SEPARATORS_RE.is_match(&leftover) {
        return vec![trimmed.to_string()];
    }
    QUOTED_RE
        .captures_iter(body)
        .filter_map(|c| c.name("single").or_else(|| c.name("double")))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub group: String,
    pub count: usize,
    pub whisker_low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_high: f64,
    pub outliers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlot {
    pub column: String,
    pub group_by: String,
    /// Sorted by group label.
    pub groups: Vec<BoxStats>,
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

fn box_stats(group: String, mut values: Vec<f64>) -> BoxStats {
    values.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&values, 0.25);
    let median = quantile(&values, 0.5);
    let q3 = quantile(&values, 0.75);
    let iqr = q3 - q1;
    let low_fence = q1 - WHISKER_IQR * iqr;
    let high_fence = q3 + WHISKER_IQR * iqr;

    let inside: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v >= low_fence && *v <= high_fence)
        .collect();
    // whiskers never end inside the box
    let whisker_low = inside.first().copied().unwrap_or(q1).min(q1);
    let whisker_high = inside.last().copied().unwrap_or(q3).max(q3);

    BoxStats {
        group,
        count: values.len(),
        whisker_low,
        q1,
        median,
        q3,
        whisker_high,
        outliers: values.len() - inside.len(),
    }
}

/// Values of `column_name` split by the labels in `group_by`, one box per label.
/// Rows missing either side are skipped.
pub fn boxplot(table: &Table, column_name: &str, group_by: &str) -> Result<BoxPlot, AppError> {
    let values = find_column(table, column_name)?;
    let groups = find_column(table, group_by)?;

    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (value, group) in values.cells.iter().zip(&groups.cells) {
        let (Some(v), Some(label)) = (cell_number(value), cell_label(group)) else {
            continue;
        };
        for g in group_labels(&label) {
            grouped.entry(g).or_default().push(v.as_f64());
        }
    }
    tracing::debug!("Boxplot of {} by {}: {} groups", column_name, group_by, grouped.len());

    Ok(BoxPlot {
        column: column_name.to_string(),
        group_by: group_by.to_string(),
        groups: grouped
            .into_iter()
            .map(|(group, values)| box_stats(group, values))
            .collect(),
    })
}

pub fn render_histogram(hist: &Histogram) -> String {
    let mut out = String::new();
    let scale = if hist.log_scale { ", log scale" } else { "" };
    let _ = writeln!(out, "Histogram of {} ({} values{})", hist.column, hist.total(), scale);
    if hist.bins.is_empty() {
        let _ = writeln!(out, "(no data)");
        return out;
    }

    let bar = |count: usize| -> f64 {
        if hist.log_scale {
            (1.0 + count as f64).ln()
        } else {
            count as f64
        }
    };
    let max_count = hist.bins.iter().map(|b| b.count).max().unwrap_or(0);
    let max_bar = bar(max_count);
    for b in &hist.bins {
        let len = if max_bar > 0.0 {
            (bar(b.count) / max_bar * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "[{:>14.2}, {:>14.2}) {:>7} {}",
            b.start,
            b.end,
            b.count,
            "#".repeat(len)
        );
    }
    out
}

fn sketch(s: &BoxStats, lo: f64, hi: f64) -> String {
    let span = hi - lo;
    let pos = |v: f64| -> usize {
        if span <= 0.0 {
            SKETCH_WIDTH / 2
        } else {
            (((v - lo) / span) * (SKETCH_WIDTH - 1) as f64).round() as usize
        }
    };
    let mut line = vec![' '; SKETCH_WIDTH];
    let (wl, q1, med, q3, wh) = (
        pos(s.whisker_low),
        pos(s.q1),
        pos(s.median),
        pos(s.q3),
        pos(s.whisker_high),
    );
    for c in line.iter_mut().take(wh + 1).skip(wl) {
        *c = '-';
    }
    for c in line.iter_mut().take(q3 + 1).skip(q1) {
        *c = '=';
    }
    line[wl] = '|';
    line[wh] = '|';
    line[q1] = '[';
    line[q3] = ']';
    line[med] = 'M';
    line.into_iter().collect()
}

pub fn render_boxplot(plot: &BoxPlot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Boxplot of {} by {}", plot.column, plot.group_by);
    if plot.groups.is_empty() {
        let _ = writeln!(out, "(no data)");
        return out;
    }

    let lo = plot.groups.iter().map(|g| g.whisker_low).fold(f64::INFINITY, f64::min);
    let hi = plot.groups.iter().map(|g| g.whisker_high).fold(f64::NEG_INFINITY, f64::max);
    let _ = writeln!(
        out,
        "{:<20} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>8}  {}",
        "group", "n", "low", "q1", "median", "q3", "high", "outliers", "shape"
    );
    for g in &plot.groups {
        let _ = writeln!(
            out,
            "{:<20} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>8}  {}",
            g.group,
            g.count,
            g.whisker_low,
            g.q1,
            g.median,
            g.q3,
            g.whisker_high,
            g.outliers,
            sketch(g, lo, hi)
        );
    }
    out
}
