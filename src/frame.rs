//! Tabular Frame (C1): an in-memory columnar table with typed numeric
//! columns, nullable-fill semantics, and rolling aggregates.
//!
//! The frame never exposes raw column storage beyond this narrow API —
//! callers outside this module only ever see `get`/`len`/the scalar
//! reductions below, never a bare `HashMap` of columns.

use std::collections::BTreeMap;

/// An ordered sequence of samples, each a mapping from column name to
/// numeric value, plus an optional timestamp column (seconds, monotonic).
#[derive(Debug, Clone, Default)]
pub struct TabularFrame {
    columns: BTreeMap<String, Vec<f64>>,
    len: usize,
    timestamps: Option<Vec<f64>>,
}

impl TabularFrame {
    /// Build a frame from named columns. All columns must share the same
    /// length; mismatched columns are trimmed or zero-padded to the
    /// longest one so the frame-length invariant always holds — never
    /// panics on ragged input.
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = (String, Vec<f64>)>) -> Self {
        let columns: BTreeMap<String, Vec<f64>> = columns.into_iter().collect();
        let len = columns.values().map(Vec::len).max().unwrap_or(0);
        let columns = columns
            .into_iter()
            .map(|(name, mut col)| {
                col.resize(len, 0.0);
                (name, col)
            })
            .collect();
        Self {
            columns,
            len,
            timestamps: None,
        }
    }

    /// An empty frame of the given length with no columns.
    #[must_use]
    pub fn empty(len: usize) -> Self {
        Self {
            columns: BTreeMap::new(),
            len,
            timestamps: None,
        }
    }

    /// Attach a timestamp column (seconds). Padded/trimmed to frame length.
    #[must_use]
    pub fn with_timestamps(mut self, mut timestamps: Vec<f64>) -> Self {
        timestamps.resize(self.len, 0.0);
        self.timestamps = Some(timestamps);
        self
    }

    #[must_use]
    pub fn timestamps(&self) -> Option<&[f64]> {
        self.timestamps.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn has_column(&self, col: &str) -> bool {
        self.columns.contains_key(col)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Returns the column if present; a zero-filled sequence of the
    /// frame's length otherwise. Never fails.
    #[must_use]
    pub fn get(&self, col: &str) -> Vec<f64> {
        self.columns
            .get(col)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.len])
    }

    /// First difference, leading element 0.
    #[must_use]
    pub fn diff(&self, col: &str) -> Vec<f64> {
        let values = self.get(col);
        let mut out = vec![0.0; values.len()];
        for i in 1..values.len() {
            out[i] = values[i] - values[i - 1];
        }
        out
    }

    /// Trailing-window standard deviation; entries before the window
    /// fills are 0, not NaN.
    #[must_use]
    pub fn rolling_std(&self, col: &str, window: usize) -> Vec<f64> {
        let values = self.get(col);
        let mut out = vec![0.0; values.len()];
        if window == 0 {
            return out;
        }
        for i in 0..values.len() {
            if i + 1 < window {
                continue;
            }
            let slice = &values[i + 1 - window..=i];
            out[i] = std_of(slice);
        }
        out
    }

    #[must_use]
    pub fn mean(&self, col: &str) -> f64 {
        mean_of(&self.get(col))
    }

    #[must_use]
    pub fn max(&self, col: &str) -> f64 {
        let filtered: Vec<f64> = self.get(col).into_iter().filter(|v| v.is_finite()).collect();
        if filtered.is_empty() {
            0.0
        } else {
            filtered.into_iter().fold(f64::NEG_INFINITY, f64::max)
        }
    }

    #[must_use]
    pub fn min(&self, col: &str) -> f64 {
        let values = self.get(col);
        let filtered: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if filtered.is_empty() {
            0.0
        } else {
            filtered.into_iter().fold(f64::INFINITY, f64::min)
        }
    }

    #[must_use]
    pub fn var(&self, col: &str) -> f64 {
        var_of(&self.get(col))
    }

    #[must_use]
    pub fn std(&self, col: &str) -> f64 {
        self.var(col).sqrt()
    }

    /// Count of samples where `predicate(index, row_accessor)` holds.
    /// `row_accessor` yields the value of a named column at that row
    /// (zero if the column is absent).
    pub fn count_where(&self, predicate: impl Fn(usize) -> bool) -> usize {
        (0..self.len).filter(|&i| predicate(i)).count()
    }

    /// Row value for `col` at `idx`, 0.0 if out of range or absent.
    #[must_use]
    pub fn value_at(&self, col: &str, idx: usize) -> f64 {
        self.columns
            .get(col)
            .and_then(|c| c.get(idx))
            .copied()
            .unwrap_or(0.0)
    }

    /// Build a new frame retaining only the given rows, in order. Used by
    /// the attribution explainer to construct a sampled sub-frame.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let sub: Vec<f64> = indices.iter().map(|&i| col.get(i).copied().unwrap_or(0.0)).collect();
                (name.clone(), sub)
            })
            .collect();
        Self {
            columns,
            len: indices.len(),
            timestamps: self.timestamps.as_ref().map(|ts| {
                indices.iter().map(|&i| ts.get(i).copied().unwrap_or(0.0)).collect()
            }),
        }
    }
}

fn mean_of(values: &[f64]) -> f64 {
    let filtered: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if filtered.is_empty() {
        0.0
    } else {
        filtered.iter().sum::<f64>() / filtered.len() as f64
    }
}

fn var_of(values: &[f64]) -> f64 {
    let filtered: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if filtered.len() < 2 {
        return 0.0;
    }
    let mean = filtered.iter().sum::<f64>() / filtered.len() as f64;
    filtered.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / filtered.len() as f64
}

fn std_of(values: &[f64]) -> f64 {
    var_of(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_column_is_zero_filled() {
        let f = TabularFrame::new([("altitude".to_string(), vec![1.0, 2.0, 3.0])]);
        assert_eq!(f.get("speed"), vec![0.0, 0.0, 0.0]);
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn diff_leading_zero() {
        let f = TabularFrame::new([("altitude".to_string(), vec![10.0, 12.0, 9.0])]);
        assert_eq!(f.diff("altitude"), vec![0.0, 2.0, -3.0]);
    }

    #[test]
    fn rolling_std_zero_before_window_fills() {
        let f = TabularFrame::new([("x".to_string(), vec![1.0, 1.0, 1.0, 5.0, 5.0])]);
        let r = f.rolling_std("x", 3);
        assert_eq!(r[0], 0.0);
        assert_eq!(r[1], 0.0);
        assert!(r[2] < f64::EPSILON);
        assert!(r[4] > 0.0);
    }

    #[test]
    fn reductions_skip_non_finite() {
        let f = TabularFrame::new([("x".to_string(), vec![1.0, f64::NAN, 3.0])]);
        assert!((f.mean("x") - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ragged_columns_are_padded_to_longest() {
        let f = TabularFrame::new([
            ("a".to_string(), vec![1.0, 2.0, 3.0]),
            ("b".to_string(), vec![1.0]),
        ]);
        assert_eq!(f.len(), 3);
        assert_eq!(f.get("b"), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn select_rows_builds_subframe() {
        let f = TabularFrame::new([("a".to_string(), vec![10.0, 20.0, 30.0, 40.0])]);
        let sub = f.select_rows(&[1, 3]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.get("a"), vec![20.0, 40.0]);
    }
}
