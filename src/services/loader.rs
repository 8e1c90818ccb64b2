use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Cell, ColumnKind, Table};

const UTF8_BOM: &str = "\u{feff}";

/// Reads a CSV file into a [`Table`] of raw text cells.
pub fn load_csv(path: &Path, config: &Config) -> Result<Table, AppError> {
    tracing::info!("Loading CSV from {}", path.display());
    let file = File::open(path).map_err(|e| {
        tracing::error!("Failed to open {}: {}", path.display(), e);
        AppError::io(path, e)
    })?;
    load_csv_from_reader(file, config).map_err(|e| match e {
        AppError::CsvError(err) if err.is_io_error() => match err.into_kind() {
            csv::ErrorKind::Io(io) => AppError::io(path, io),
            other => AppError::InvalidInput(format!("{:?}", other)),
        },
        other => other,
    })
}

pub fn load_csv_from_reader<R: Read>(reader: R, config: &Config) -> Result<Table, AppError> {
    let start = std::time::Instant::now();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::None)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = if idx == 0 { h.trim_start_matches(UTF8_BOM) } else { h };
            h.to_string()
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::InvalidInput("CSV has no header row".to_string()));
    }

    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    let mut row_count = 0;

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > headers.len() {
            tracing::debug!(
                "Row {} has {} fields, expected {}; ignoring the extra ones",
                idx + 1,
                record.len(),
                headers.len()
            );
        }
        for (col_idx, cells) in columns.iter_mut().enumerate() {
            let cell = match record.get(col_idx) {
                Some(raw) if !config.is_missing(raw) => Cell::Text(raw.to_string()),
                _ => Cell::Missing,
            };
            cells.push(cell);
        }
        row_count += 1;
    }

    let mut table = Table::new(row_count);
    for (name, cells) in headers.into_iter().zip(columns) {
        table.push_column(name, ColumnKind::Raw, cells);
    }

    tracing::info!(
        "Loaded {} rows x {} columns in {:?}",
        table.row_count(),
        table.columns().len(),
        start.elapsed()
    );
    tracing::debug!("Columns: {:?}", table.column_names());
    Ok(table)
}
