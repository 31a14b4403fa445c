//! Standard (zero-mean, unit-variance) feature scaling.
//!
//! Fitted on the training partition only; the same fitted transform is
//! applied to validation, test, and serving-time vectors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("cannot fit a scaler on an empty matrix")]
    EmptyInput,
    #[error("row has {got} values but scaler was fitted on {expected} features")]
    WidthMismatch { got: usize, expected: usize },
}

/// Per-feature means and standard deviations from the training set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and (population) standard deviations on `rows`.
    /// Zero-variance features get a standard deviation of 1 so their scaled
    /// value is exactly zero instead of NaN.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ScalerError> {
        let Some(first) = rows.first() else {
            return Err(ScalerError::EmptyInput);
        };
        let dim = first.len();
        let n = rows.len() as f64;
        let mut means = vec![0.0; dim];
        for row in rows {
            for (mean, &v) in means.iter_mut().zip(row.iter()) {
                *mean += v;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }
        let mut stds = vec![0.0; dim];
        for row in rows {
            for ((std, &mean), &v) in stds.iter_mut().zip(means.iter()).zip(row.iter()) {
                let d = v - mean;
                *std += d * d;
            }
        }
        for std in &mut stds {
            *std = (*std / n).sqrt();
            if !std.is_finite() || *std <= 0.0 {
                *std = 1.0;
            }
        }
        Ok(Self { means, stds })
    }

    /// Number of features this scaler was fitted on.
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Scale a single row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        if row.len() != self.means.len() {
            return Err(ScalerError::WidthMismatch {
                got: row.len(),
                expected: self.means.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(&v, (&mean, &std))| (v - mean) / std)
            .collect())
    }

    /// Scale a whole matrix.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ScalerError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
