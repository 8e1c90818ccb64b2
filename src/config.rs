use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

fn default_range_columns() -> Vec<String> {
    ["estimated_audience_size", "impressions", "spend"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// Same markers pandas treats as NA when reading a CSV.
fn default_missing_sentinels() -> Vec<String> {
    [
        "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
        "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
        "n/a", "nan", "null",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_top_n() -> usize {
    3
}

fn default_histogram_bins() -> usize {
    30
}

/// How to summarize a column that has no non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyColumnPolicy {
    #[default]
    Categorical,
    Numeric,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Columns holding `[lower, upper]` literals, split into `_lower`/`_upper`.
    pub range_columns: Vec<String>,
    /// Columns left out of the summary entirely.
    pub id_columns: Vec<String>,
    pub missing_sentinels: Vec<String>,
    pub top_n: usize,
    pub empty_columns: EmptyColumnPolicy,
    pub histogram_bins: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            range_columns: default_range_columns(),
            id_columns: Vec::new(),
            missing_sentinels: default_missing_sentinels(),
            top_n: default_top_n(),
            empty_columns: EmptyColumnPolicy::default(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_n == 0 {
            return Err(AppError::ConfigError("top_n must be at least 1".to_string()));
        }
        if self.histogram_bins == 0 {
            return Err(AppError::ConfigError(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if let Some(col) = self.range_columns.iter().find(|c| self.id_columns.contains(c)) {
            return Err(AppError::ConfigError(format!(
                "column {} is both a range column and an id column",
                col
            )));
        }
        Ok(())
    }

    pub fn is_missing(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        trimmed.is_empty() || self.missing_sentinels.iter().any(|s| s == trimmed)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config, AppError> {
    match path {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            Config::from_file(path)
        }
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.range_columns,
            vec!["estimated_audience_size", "impressions", "spend"]
        );
        assert_eq!(config.top_n, 3);
        assert_eq!(config.empty_columns, EmptyColumnPolicy::Categorical);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"top_n": 5, "empty_columns": "numeric"}"#).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.empty_columns, EmptyColumnPolicy::Numeric);
        assert_eq!(config.range_columns.len(), 3);
    }

    #[test]
    fn test_rejects_unknown_fields_and_bad_values() {
        assert!(matches!(
            Config::from_json(r#"{"topn": 5}"#),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"top_n": 0}"#),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"id_columns": ["spend"]}"#),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_is_missing() {
        let config = Config::default();
        assert!(config.is_missing(""));
        assert!(config.is_missing("   "));
        assert!(config.is_missing("NaN"));
        assert!(config.is_missing(" null "));
        assert!(!config.is_missing("0"));
        assert!(!config.is_missing("facebook"));
    }
}
