pub mod classifier;
pub mod types;
pub mod utils;

pub use classifier::ColumnClassifier;
pub use types::{CategoricalSummary, ColumnReport, ColumnSummary, NumericSummary, Report};
