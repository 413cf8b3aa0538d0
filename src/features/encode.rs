//! One-hot encoding of categorical regressors.
//!
//! Missing labels become the sentinel category `Unknown`. Levels are ordered
//! (numeric labels numerically, then text labels lexicographically) and the
//! first level is dropped as the baseline, so `k` levels give `k - 1` columns
//! named `<source>_<level>`. Baseline and unseen labels encode as all zeros.

use std::cmp::Ordering;

use serde::Serialize;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Replace missing labels with `Unknown`.
pub fn fill_unknown(values: &[Option<String>]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.clone().unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
        .collect()
}

/// The learned k-1 encoding of one categorical regressor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoricalEncoding {
    pub source: String,
    pub baseline: String,
    /// Non-baseline levels, in column order.
    pub levels: Vec<String>,
}

impl CategoricalEncoding {
    /// Learn levels from filled labels. Returns `None` for an empty column.
    pub fn learn(source: &str, labels: &[String]) -> Option<Self> {
        let mut levels: Vec<String> = labels.to_vec();
        levels.sort_by(|a, b| compare_labels(a, b));
        levels.dedup();

        let mut levels = levels.into_iter();
        let baseline = levels.next()?;
        Some(Self {
            source: source.to_string(),
            baseline,
            levels: levels.collect(),
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.levels
            .iter()
            .map(|level| format!("{}_{}", self.source, level))
            .collect()
    }

    /// Indicator values for one label, one per non-baseline level.
    pub fn encode(&self, label: &str) -> Vec<f64> {
        self.levels
            .iter()
            .map(|level| if level == label { 1.0 } else { 0.0 })
            .collect()
    }

    /// Encode a whole column into `(name, values)` pairs.
    pub fn encode_column(&self, labels: &[String]) -> Vec<(String, Vec<f64>)> {
        self.column_names()
            .into_iter()
            .zip(&self.levels)
            .map(|(name, level)| {
                let values = labels.iter().map(|l| if l == level { 1.0 } else { 0.0 }).collect();
                (name, values)
            })
            .collect()
    }
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drops_exactly_one_baseline_level() {
        let enc = CategoricalEncoding::learn("WD", &labels(&["N", "S", "E", "N", "W"])).unwrap();
        assert_eq!(enc.baseline, "E");
        assert_eq!(enc.levels, labels(&["N", "S", "W"]));
        assert_eq!(enc.column_names(), labels(&["WD_N", "WD_S", "WD_W"]));
        assert_eq!(enc.encode("E"), vec![0.0, 0.0, 0.0]);
        assert_eq!(enc.encode("S"), vec![0.0, 1.0, 0.0]);
        assert_eq!(enc.encode("NNE"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn numeric_codes_sort_numerically_before_unknown() {
        let filled = fill_unknown(&[Some("10".to_string()), None, Some("2".to_string()), Some("1".to_string())]);
        let enc = CategoricalEncoding::learn("WD", &filled).unwrap();
        assert_eq!(enc.baseline, "1");
        assert_eq!(enc.levels, labels(&["2", "10", UNKNOWN_CATEGORY]));
    }

    #[test]
    fn single_level_yields_no_columns() {
        let enc = CategoricalEncoding::learn("WD", &labels(&["N", "N"])).unwrap();
        assert!(enc.column_names().is_empty());
        assert!(CategoricalEncoding::learn("WD", &[]).is_none());
    }

    #[test]
    fn encode_column_matches_row_encoding() {
        let col = labels(&["A", "B", "C", "B"]);
        let enc = CategoricalEncoding::learn("X", &col).unwrap();
        let encoded = enc.encode_column(&col);
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[0], ("X_B".to_string(), vec![0.0, 1.0, 0.0, 1.0]));
        assert_eq!(encoded[1], ("X_C".to_string(), vec![0.0, 0.0, 1.0, 0.0]));
    }
}
