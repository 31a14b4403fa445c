use serde::{Deserialize, Serialize};

use crate::ml::sigmoid;

/// Single-node decision tree used as a weak learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stump {
    /// Feature index used for the split.
    pub feature_index: u16,
    /// Threshold in feature units.
    pub threshold: f64,
    /// Contribution for `feature <= threshold`.
    pub left_value: f64,
    /// Contribution for `feature > threshold`.
    pub right_value: f64,
}

impl Stump {
    /// Predict the stump contribution for a feature vector.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let idx = self.feature_index as usize;
        let value = features.get(idx).copied().unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Gradient-boosted decision stump model for binary classification.
///
/// Boosting works on the log-odds scale: `init_raw` is the training-set
/// prior log-odds and each round adds `learning_rate * stump(x)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of values per feature vector.
    pub feature_len: usize,
    /// Learning rate applied to each stump contribution.
    pub learning_rate: f64,
    /// Prior log-odds before any boosting round.
    pub init_raw: f64,
    /// One stump per boosting round, truncated at the best validation round.
    pub stumps: Vec<Stump>,
}

impl GbdtModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_len == 0 {
            return Err("Model must expect at least one feature".to_string());
        }
        for (round_idx, stump) in self.stumps.iter().enumerate() {
            if (stump.feature_index as usize) >= self.feature_len {
                return Err(format!(
                    "Round {round_idx} splits on feature {} but model has {} features",
                    stump.feature_index, self.feature_len
                ));
            }
        }
        Ok(())
    }

    /// Raw log-odds score for a feature vector.
    pub fn raw_score(&self, features: &[f64]) -> f64 {
        let mut raw = self.init_raw;
        for stump in &self.stumps {
            raw += self.learning_rate * stump.predict(features);
        }
        raw
    }

    /// Probability of class 1 for a feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.raw_score(features))
    }
}
