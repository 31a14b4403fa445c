use serde::{Deserialize, Serialize};

use crate::ml::sigmoid;

/// Binary logistic regression over scaled features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRegModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of values per feature vector.
    pub feature_len: usize,
    /// One weight per feature.
    pub weights: Vec<f64>,
    /// Intercept.
    pub bias: f64,
}

impl LogRegModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_len == 0 {
            return Err("Model must expect at least one feature".to_string());
        }
        if self.weights.len() != self.feature_len {
            return Err(format!(
                "Model has {} weights but expects {} features",
                self.weights.len(),
                self.feature_len
            ));
        }
        Ok(())
    }

    /// Raw log-odds score for a feature vector.
    pub fn raw_score(&self, features: &[f64]) -> f64 {
        let mut sum = self.bias;
        for (w, &v) in self.weights.iter().zip(features.iter()) {
            sum += w * v;
        }
        sum
    }

    /// Probability of class 1 for a feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.raw_score(features))
    }
}
