//! Classifier candidates and evaluation metrics.
//!
//! Both candidates expose the same two operations the pipeline depends on:
//! fit on a training partition (tuned against a validation partition) and
//! produce a class-1 probability for a feature vector. Everything here is
//! deterministic under a fixed seed.

use serde::{Deserialize, Serialize};

pub mod gbdt;
pub mod logreg;
pub mod metrics;

/// In-memory dataset used for training and evaluation. Labels are binary:
/// 0 = no default, 1 = default.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Number of values in each feature vector.
    pub feature_len: usize,
    /// Feature matrix, row-major, already scaled.
    pub x: Vec<Vec<f64>>,
    /// Labels aligned with `x`.
    pub y: Vec<u8>,
}

impl TrainDataset {
    /// Validate the structural invariants trainers rely on.
    pub fn validate(&self) -> Result<(), String> {
        if self.x.is_empty() {
            return Err("Empty dataset".to_string());
        }
        if self.x.len() != self.y.len() {
            return Err("Mismatched X/Y lengths".to_string());
        }
        for row in &self.x {
            if row.len() != self.feature_len {
                return Err(format!(
                    "Row has {} features but dataset declares {}",
                    row.len(),
                    self.feature_len
                ));
            }
        }
        Ok(())
    }
}

/// Logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A trained classifier candidate, persisted as `model.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Gbdt(gbdt::GbdtModel),
    Logreg(logreg::LogRegModel),
}

impl ModelArtifact {
    /// Candidate name used in reports and selection logs.
    pub fn name(&self) -> &'static str {
        match self {
            ModelArtifact::Gbdt(_) => "gbdt",
            ModelArtifact::Logreg(_) => "logreg",
        }
    }

    /// Expected feature vector length.
    pub fn feature_len(&self) -> usize {
        match self {
            ModelArtifact::Gbdt(model) => model.feature_len,
            ModelArtifact::Logreg(model) => model.feature_len,
        }
    }

    /// Probability of class 1 (default) for a scaled feature vector.
    pub fn predict_bad_probability(&self, features: &[f64]) -> f64 {
        match self {
            ModelArtifact::Gbdt(model) => model.predict_proba(features),
            ModelArtifact::Logreg(model) => model.predict_proba(features),
        }
    }

    /// Validate structural invariants of the wrapped model.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelArtifact::Gbdt(model) => model.validate(),
            ModelArtifact::Logreg(model) => model.validate(),
        }
    }
}
