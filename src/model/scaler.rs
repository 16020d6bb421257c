//! Feature scaler fitted alongside each class's classifier, mirroring a
//! standard-score scaler: zero mean, unit variance per column, in the
//! class's fixed feature order.

#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a row-major matrix (`rows[i][j]` = sample i, feature j).
    #[must_use]
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; n_features];
        for row in rows {
            for j in 0..n_features {
                means[j] += row[j];
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut variances = vec![0.0; n_features];
        for row in rows {
            for j in 0..n_features {
                let d = row[j] - means[j];
                variances[j] += d * d;
            }
        }
        let stds: Vec<f64> = variances
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std < 1e-9 {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Self { means, stds }
    }

    #[must_use]
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(j, v)| (v - self.means.get(j).copied().unwrap_or(0.0)) / self.stds.get(j).copied().unwrap_or(1.0))
            .collect()
    }

    #[must_use]
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_transform_zero_means_unit_ish_variance() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&rows, 2);
        let transformed = scaler.transform(&rows);
        let mean0: f64 = transformed.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        assert!(mean0.abs() < 1e-9);
    }

    #[test]
    fn constant_column_does_not_divide_by_zero() {
        let rows = vec![vec![5.0], vec![5.0], vec![5.0]];
        let scaler = StandardScaler::fit(&rows, 1);
        let transformed = scaler.transform(&rows);
        assert_eq!(transformed[0][0], 0.0);
    }
}
