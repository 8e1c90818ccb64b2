use std::collections::HashMap;

use smallvec::SmallVec;

use crate::models::{Cell, Number};
use crate::services::ranges::parse_number;

use super::types::{CategoricalSummary, NumericSummary};

/// Numeric reading of a cell, if it has one.
pub fn cell_number(cell: &Cell) -> Option<Number> {
    match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_number(s),
        Cell::Missing => None,
    }
}

/// Text used when counting a cell as a category.
pub fn cell_label(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Text(s) => Some(s.clone()),
        Cell::Number(n) => Some(n.to_string()),
        Cell::Missing => None,
    }
}

/// Running count/mean/variance/min/max (Welford's update).
#[derive(Debug, Clone, Default)]
pub struct NumericAccumulator {
    count: usize,
    mean: f64,
    m2: f64,
    min_max: Option<(f64, f64)>,
}

impl NumericAccumulator {
    pub fn add(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min_max = match self.min_max {
            None => Some((x, x)),
            Some((min, max)) => Some((min.min(x), max.max(x))),
        };
    }

    pub fn finish(&self) -> NumericSummary {
        let Some((min, max)) = self.min_max else {
            return NumericSummary {
                count: 0,
                mean: None,
                std: None,
                min: None,
                max: None,
            };
        };
        let std = if self.count < 2 {
            None
        } else {
            Some((self.m2.max(0.0) / (self.count - 1) as f64).sqrt())
        };
        NumericSummary {
            count: self.count,
            // rounding can push the running mean a hair outside [min, max]
            mean: Some(self.mean.clamp(min, max)),
            std,
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Distinct-value counter that remembers first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    index: HashMap<String, usize>,
    counts: Vec<(String, usize)>,
}

impl FrequencyCounter {
    pub fn add(&mut self, value: String) {
        match self.index.get(&value) {
            Some(&idx) => self.counts[idx].1 += 1,
            None => {
                self.index.insert(value.clone(), self.counts.len());
                self.counts.push((value, 1));
            }
        }
    }

    pub fn finish(mut self, top_n: usize) -> CategoricalSummary {
        let unique_count = self.counts.len();
        // stable sort, so ties stay in first-seen order
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top_values: SmallVec<[(String, usize); super::types::TOP_VALUES]> =
            self.counts.into_iter().take(top_n).collect();
        CategoricalSummary {
            unique_count,
            top_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_matches_closed_form() {
        let mut acc = NumericAccumulator::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(x);
        }
        let s = acc.finish();
        assert_eq!(s.count, 8);
        assert!((s.mean.unwrap() - 5.0).abs() < 1e-12);
        // sample variance = 32 / 7
        assert!((s.std.unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.min, Some(2.0));
        assert_eq!(s.max, Some(9.0));
    }

    #[test]
    fn test_accumulator_degenerate_cases() {
        let empty = NumericAccumulator::default().finish();
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_none() && empty.std.is_none() && empty.min.is_none());

        let mut one = NumericAccumulator::default();
        one.add(0.1);
        let s = one.finish();
        assert_eq!(s.mean, Some(0.1));
        assert_eq!(s.std, None);
    }

    #[test]
    fn test_counter_orders_by_frequency_then_first_seen() {
        let mut counter = FrequencyCounter::default();
        for v in ["b", "a", "c", "a", "d", "c", "e"] {
            counter.add(v.to_string());
        }
        let s = counter.finish(3);
        assert_eq!(s.unique_count, 5);
        assert_eq!(
            s.top_values.to_vec(),
            vec![("a".to_string(), 2), ("c".to_string(), 2), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_cell_number() {
        assert_eq!(cell_number(&Cell::Text(" 12 ".into())), Some(Number::Int(12)));
        assert_eq!(cell_number(&Cell::Text("x".into())), None);
        assert_eq!(cell_number(&Cell::Missing), None);
        assert_eq!(
            cell_number(&Cell::Number(Number::Float(1.5))),
            Some(Number::Float(1.5))
        );
    }
}
