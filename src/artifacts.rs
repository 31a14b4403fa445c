//! Persisted model artifact bundle.
//!
//! A training run publishes four JSON files — model, scaler, feature names,
//! impute values — that together describe one feature space. The scoring
//! service loads them once at startup and treats them as immutable. A bundle
//! is staged in a sibling directory and swapped into place so a reader never
//! observes a partially-written set.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::ml::ModelArtifact;
use crate::scaler::StandardScaler;

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const IMPUTE_VALUES_FILE: &str = "impute_values.json";

const REQUIRED_FILES: [&str; 4] = [
    MODEL_FILE,
    SCALER_FILE,
    FEATURE_NAMES_FILE,
    IMPUTE_VALUES_FILE,
];

/// Errors while loading or publishing an artifact bundle.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(
        "artifacts missing in {dir}: {files}\n\
         Generate them with `credit-risk-train --data-dir data --artifacts {dir}` \
         or create synthetic ones via `credit-risk-synthetic --artifacts {dir}`."
    )]
    Missing { dir: String, files: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid artifact {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("inconsistent artifact bundle: {0}")]
    Inconsistent(String),
}

/// Everything needed to reproduce inference: {model, scaler, feature name
/// ordering, impute values}. Loaded once, never mutated.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub model: ModelArtifact,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
    pub impute_values: BTreeMap<String, f64>,
}

impl ArtifactBundle {
    /// Check that the four artifacts refer to the same feature space.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(ArtifactError::Inconsistent(
                "feature name list is empty".to_string(),
            ));
        }
        if self.scaler.len() != n {
            return Err(ArtifactError::Inconsistent(format!(
                "scaler covers {} features but the feature list has {n}",
                self.scaler.len()
            )));
        }
        if self.model.feature_len() != n {
            return Err(ArtifactError::Inconsistent(format!(
                "model expects {} features but the feature list has {n}",
                self.model.feature_len()
            )));
        }
        self.model.validate().map_err(ArtifactError::Inconsistent)?;
        for name in &self.feature_names {
            if !self.impute_values.contains_key(name) {
                return Err(ArtifactError::Inconsistent(format!(
                    "impute value table is missing feature `{name}`"
                )));
            }
        }
        Ok(())
    }

    /// Load a bundle from `dir`, failing fast with the full list of missing
    /// files so the operator can regenerate them in one pass.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let missing: Vec<&str> = REQUIRED_FILES
            .iter()
            .copied()
            .filter(|name| !dir.join(name).exists())
            .collect();
        if !missing.is_empty() {
            return Err(ArtifactError::Missing {
                dir: dir.display().to_string(),
                files: missing.join(", "),
            });
        }
        let bundle = Self {
            model: read_json(&dir.join(MODEL_FILE))?,
            scaler: read_json(&dir.join(SCALER_FILE))?,
            feature_names: read_json(&dir.join(FEATURE_NAMES_FILE))?,
            impute_values: read_json(&dir.join(IMPUTE_VALUES_FILE))?,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Publish the bundle atomically: write every file into a staging
    /// directory, then swap it into place. An existing bundle is replaced
    /// wholesale, never mutated file by file.
    pub fn publish(&self, dir: &Path) -> Result<(), ArtifactError> {
        self.validate()?;
        let staging = staging_path(dir);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|source| io_error(&staging, source))?;
        }
        fs::create_dir_all(&staging).map_err(|source| io_error(&staging, source))?;

        write_json(&staging.join(MODEL_FILE), &self.model)?;
        write_json(&staging.join(SCALER_FILE), &self.scaler)?;
        write_json(&staging.join(FEATURE_NAMES_FILE), &self.feature_names)?;
        write_json(&staging.join(IMPUTE_VALUES_FILE), &self.impute_values)?;

        let retired = retired_path(dir);
        if retired.exists() {
            fs::remove_dir_all(&retired).map_err(|source| io_error(&retired, source))?;
        }
        if dir.exists() {
            fs::rename(dir, &retired).map_err(|source| io_error(dir, source))?;
        }
        fs::rename(&staging, dir).map_err(|source| io_error(&staging, source))?;
        if retired.exists() {
            fs::remove_dir_all(&retired).map_err(|source| io_error(&retired, source))?;
        }
        info!(
            dir = %dir.display(),
            model = self.model.name(),
            features = self.feature_names.len(),
            "artifact bundle published"
        );
        Ok(())
    }
}

fn staging_path(dir: &Path) -> PathBuf {
    sibling(dir, ".staging")
}

fn retired_path(dir: &Path) -> PathBuf {
    sibling(dir, ".old")
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifacts".to_string());
    dir.with_file_name(format!("{name}{suffix}"))
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| io_error(path, source))?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| io_error(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::logreg::LogRegModel;
    use tempfile::tempdir;

    fn bundle() -> ArtifactBundle {
        let feature_names = vec!["Income".to_string(), "DerogCnt".to_string()];
        let impute_values = feature_names
            .iter()
            .map(|name| (name.clone(), 1.5))
            .collect();
        ArtifactBundle {
            model: ModelArtifact::Logreg(LogRegModel {
                model_version: 1,
                feature_len: 2,
                weights: vec![0.3, -0.2],
                bias: 0.1,
            }),
            scaler: StandardScaler {
                means: vec![0.0, 0.0],
                stds: vec![1.0, 1.0],
            },
            feature_names,
            impute_values,
        }
    }

    #[test]
    fn publish_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("artifacts");
        let original = bundle();
        original.publish(&target).unwrap();
        let loaded = ArtifactBundle::load(&target).unwrap();
        assert_eq!(loaded.feature_names, original.feature_names);
        assert_eq!(loaded.impute_values, original.impute_values);
        assert_eq!(loaded.scaler.means, original.scaler.means);
        assert_eq!(loaded.model.name(), "logreg");
        // No staging or retired directory survives a publish.
        assert!(!dir.path().join("artifacts.staging").exists());
        assert!(!dir.path().join("artifacts.old").exists());
    }

    #[test]
    fn republish_replaces_the_previous_bundle() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("artifacts");
        bundle().publish(&target).unwrap();
        let mut updated = bundle();
        updated.impute_values.insert("Income".to_string(), 9.0);
        updated.publish(&target).unwrap();
        let loaded = ArtifactBundle::load(&target).unwrap();
        assert_eq!(loaded.impute_values["Income"], 9.0);
    }

    #[test]
    fn missing_files_are_all_named_with_remediation() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("artifacts");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join(MODEL_FILE), "{}").unwrap();
        let err = ArtifactBundle::load(&target).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(SCALER_FILE));
        assert!(message.contains(FEATURE_NAMES_FILE));
        assert!(message.contains(IMPUTE_VALUES_FILE));
        assert!(!message.contains("model.json,"));
        assert!(message.contains("credit-risk-train"));
        assert!(message.contains("credit-risk-synthetic"));
    }

    #[test]
    fn incomplete_impute_table_is_rejected() {
        let mut broken = bundle();
        broken.impute_values.remove("DerogCnt");
        assert!(matches!(
            broken.validate(),
            Err(ArtifactError::Inconsistent(_))
        ));
    }
}
