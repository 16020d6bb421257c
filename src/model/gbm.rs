//! A small gradient-boosted tree-ensemble binary classifier.
//!
//! The surrounding corpus has no bundled gradient-boosting crate, so the
//! ensemble itself — regression trees boosted against the binomial
//! log-loss gradient — is hand-rolled here in the same spirit as the
//! corpus's other hand-rolled numeric cores (weighted scoring tables,
//! online accumulators): plain arithmetic over `Vec<f64>`, no unsafe, no
//! external math dependency beyond `rayon` for the per-node split search.
//!
//! Each tree stores a value at *every* node, not just leaves, so a
//! prediction's per-feature contribution can be read off as the sum of
//! value deltas along its root-to-leaf path (the Saabas decomposition) —
//! this is what `contributions` exposes for the attribution explainer.

use rayon::prelude::*;

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        value: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn value(&self) -> f64 {
        match self {
            Self::Leaf { value } | Self::Split { value, .. } => *value,
        }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Self::Leaf { value } => *value,
            Self::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    /// Accumulate the value-delta crossed at each split into `contrib`,
    /// indexed by feature.
    fn contribute(&self, row: &[f64], contrib: &mut [f64]) {
        if let Self::Split {
            feature,
            threshold,
            value,
            left,
            right,
        } = self
        {
            let child = if row[*feature] <= *threshold {
                left.as_ref()
            } else {
                right.as_ref()
            };
            contrib[*feature] += child.value() - value;
            child.contribute(row, contrib);
        }
    }
}

fn mean(values: &[f64], idx: &[usize]) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    idx.iter().map(|&i| values[i]).sum::<f64>() / idx.len() as f64
}

fn sse(values: &[f64], idx: &[usize], m: f64) -> f64 {
    idx.iter().map(|&i| (values[i] - m).powi(2)).sum()
}

/// Best (feature, threshold) split for `idx` rows minimizing the sum of
/// left/right squared error, searched in parallel across features.
fn best_split(
    rows: &[Vec<f64>],
    residuals: &[f64],
    idx: &[usize],
    n_features: usize,
) -> Option<(usize, f64, Vec<usize>, Vec<usize>)> {
    let candidates: Vec<(usize, f64, f64, Vec<usize>, Vec<usize>)> = (0..n_features)
        .into_par_iter()
        .filter_map(|feature| {
            let mut sorted = idx.to_vec();
            sorted.sort_by(|&a, &b| rows[a][feature].partial_cmp(&rows[b][feature]).unwrap());
            let mut best: Option<(f64, f64, Vec<usize>, Vec<usize>)> = None;
            let mut seen = std::collections::HashSet::new();
            for w in 1..sorted.len() {
                let lo = rows[sorted[w - 1]][feature];
                let hi = rows[sorted[w]][feature];
                if (hi - lo).abs() < 1e-12 {
                    continue;
                }
                let threshold_bits = ((lo + hi) / 2.0).to_bits();
                if !seen.insert(threshold_bits) {
                    continue;
                }
                let threshold = (lo + hi) / 2.0;
                let left: Vec<usize> = idx
                    .iter()
                    .copied()
                    .filter(|&i| rows[i][feature] <= threshold)
                    .collect();
                let right: Vec<usize> = idx
                    .iter()
                    .copied()
                    .filter(|&i| rows[i][feature] > threshold)
                    .collect();
                if left.is_empty() || right.is_empty() {
                    continue;
                }
                let lm = mean(residuals, &left);
                let rm = mean(residuals, &right);
                let cost = sse(residuals, &left, lm) + sse(residuals, &right, rm);
                if best.as_ref().is_none_or(|(best_cost, ..)| cost < *best_cost) {
                    best = Some((cost, threshold, left, right));
                }
            }
            best.map(|(cost, threshold, left, right)| (feature, threshold, cost, left, right))
        })
        .collect();

    candidates
        .into_iter()
        .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap())
        .map(|(feature, threshold, _, left, right)| (feature, threshold, left, right))
}

fn build_tree(
    rows: &[Vec<f64>],
    residuals: &[f64],
    idx: Vec<usize>,
    n_features: usize,
    depth: usize,
    max_depth: usize,
) -> TreeNode {
    let value = mean(residuals, &idx);
    if depth >= max_depth || idx.len() < 4 {
        return TreeNode::Leaf { value };
    }
    match best_split(rows, residuals, &idx, n_features) {
        Some((feature, threshold, left, right)) => TreeNode::Split {
            feature,
            threshold,
            value,
            left: Box::new(build_tree(rows, residuals, left, n_features, depth + 1, max_depth)),
            right: Box::new(build_tree(rows, residuals, right, n_features, depth + 1, max_depth)),
        },
        None => TreeNode::Leaf { value },
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A fitted ensemble: a base score (log-odds of the base rate) plus a
/// sequence of shrinkage-scaled regression trees.
#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<TreeNode>,
    n_features: usize,
}

impl GradientBoostedClassifier {
    /// Fit on a row-major feature matrix and 0/1 labels.
    #[must_use]
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[f64],
        n_features: usize,
        n_estimators: usize,
        max_depth: usize,
        learning_rate: f64,
    ) -> Self {
        let n = rows.len();
        let p0 = (labels.iter().sum::<f64>() / n.max(1) as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (p0 / (1.0 - p0)).ln();
        let mut f_values = vec![base_score; n];
        let mut trees = Vec::with_capacity(n_estimators);
        let all_idx: Vec<usize> = (0..n).collect();

        for _ in 0..n_estimators {
            let residuals: Vec<f64> = (0..n).map(|i| labels[i] - sigmoid(f_values[i])).collect();
            let tree = build_tree(rows, &residuals, all_idx.clone(), n_features, 0, max_depth);
            for (i, row) in rows.iter().enumerate() {
                f_values[i] += learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Self {
            base_score,
            learning_rate,
            trees,
            n_features,
        }
    }

    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let f = self.base_score
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>();
        sigmoid(f)
    }

    #[must_use]
    pub fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_proba(r)).collect()
    }

    /// Per-feature contribution to the predicted log-odds for one row,
    /// summed across all trees (Saabas decomposition), in feature order.
    #[must_use]
    pub fn contributions(&self, row: &[f64]) -> Vec<f64> {
        let mut contrib = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.contribute(row, &mut contrib);
        }
        for c in &mut contrib {
            *c *= self.learning_rate;
        }
        contrib
    }
}
