//! Offline training run: partitions in, published artifact bundle out.
//!
//! Feature cells are coerced to numbers with the same cleaning rule serving
//! uses; cells that stay unparseable are filled with the training-set mean
//! (one fill policy for the whole system — see DESIGN.md). The scaler is
//! fitted on the training partition only, both candidates are trained with
//! validation-based tuning, and the candidate with the highest test ROC-AUC
//! is published. Ties keep the earlier candidate in the fixed order
//! gbdt → logreg.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::artifacts::{ArtifactBundle, ArtifactError};
use crate::features::clean_numeric_text;
use crate::ml::metrics::{
    ConfusionMatrix, PerClassStats, accuracy, precision_recall_by_class, roc_auc,
};
use crate::ml::{ModelArtifact, TrainDataset, gbdt, logreg};
use crate::scaler::{ScalerError, StandardScaler};
use crate::split::{LABEL_COLUMN, Partitions, SplitError};
use crate::table::Table;

/// Identifier column excluded from the feature set.
pub const ID_COLUMN: &str = "CustomerID";
/// Probability threshold used when reporting accuracy/confusion on test.
pub const REPORT_THRESHOLD: f64 = 0.5;

/// Configuration for one training run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub gbdt: gbdt::TrainOptions,
    pub logreg: logreg::TrainOptions,
}

impl TrainConfig {
    pub fn new(data_dir: PathBuf, artifact_dir: PathBuf) -> Self {
        Self {
            data_dir,
            artifact_dir,
            gbdt: gbdt::TrainOptions::default(),
            logreg: logreg::TrainOptions::default(),
        }
    }
}

/// Errors raised during a training run. Offline batch job; every failure is
/// loud and fatal.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Partitions(#[from] SplitError),
    #[error("partition is missing the `{0}` column")]
    MissingColumn(String),
    #[error("row {row} has unusable label `{value}`; expected 0 or 1")]
    BadLabel { row: usize, value: String },
    #[error("model training failed: {0}")]
    Ml(String),
    #[error(transparent)]
    Scaler(#[from] ScalerError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Test-set evaluation for one candidate.
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub name: &'static str,
    pub test_auc: f64,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: [PerClassStats; 2],
}

/// Result of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Name of the published candidate.
    pub selected: &'static str,
    /// Reports in candidate order (gbdt, logreg).
    pub reports: Vec<CandidateReport>,
    pub feature_names: Vec<String>,
}

/// One partition decomposed into features and labels, still unscaled.
#[derive(Debug)]
struct RawPartition {
    x: Vec<Vec<Option<f64>>>,
    y: Vec<u8>,
}

/// Train both candidates on the partitions under `config.data_dir`, select
/// by test AUC, and publish the winner's bundle to `config.artifact_dir`.
pub fn train_and_publish(config: &TrainConfig) -> Result<TrainOutcome, TrainError> {
    let partitions = Partitions::read(&config.data_dir)?;
    let feature_names = feature_names(&partitions.train)?;
    info!(
        train = partitions.train.n_rows(),
        val = partitions.val.n_rows(),
        test = partitions.test.n_rows(),
        features = feature_names.len(),
        "partitions loaded"
    );

    let train_raw = decompose(&partitions.train, &feature_names)?;
    let val_raw = decompose(&partitions.val, &feature_names)?;
    let test_raw = decompose(&partitions.test, &feature_names)?;

    // Impute values come from the training partition alone; validation and
    // test reuse them so no information leaks across the split.
    let impute_values = feature_means(&train_raw.x, &feature_names);
    let impute_row: Vec<f64> = feature_names
        .iter()
        .map(|name| impute_values[name])
        .collect();
    let train_x = fill_missing(train_raw.x, &impute_row);
    let val_x = fill_missing(val_raw.x, &impute_row);
    let test_x = fill_missing(test_raw.x, &impute_row);

    let scaler = StandardScaler::fit(&train_x)?;
    let train_set = scaled_dataset(&scaler, train_x, train_raw.y, feature_names.len())?;
    let val_set = scaled_dataset(&scaler, val_x, val_raw.y, feature_names.len())?;
    let test_set = scaled_dataset(&scaler, test_x, test_raw.y, feature_names.len())?;

    info!("training gbdt candidate");
    let gbdt_model = gbdt::train_gbdt(&train_set, &val_set, &config.gbdt).map_err(TrainError::Ml)?;
    info!("training logreg candidate");
    let logreg_model =
        logreg::train_logreg(&train_set, &val_set, &config.logreg).map_err(TrainError::Ml)?;

    let candidates = [
        ModelArtifact::Gbdt(gbdt_model),
        ModelArtifact::Logreg(logreg_model),
    ];
    let reports: Vec<CandidateReport> = candidates
        .iter()
        .map(|model| evaluate(model, &test_set))
        .collect();

    // Highest test AUC wins; a tie keeps the earlier candidate.
    let mut winner = 0usize;
    for (idx, report) in reports.iter().enumerate().skip(1) {
        if report.test_auc > reports[winner].test_auc {
            winner = idx;
        }
    }
    let selected = candidates[winner].clone();
    info!(
        selected = selected.name(),
        test_auc = reports[winner].test_auc,
        "candidate selected"
    );

    let bundle = ArtifactBundle {
        model: selected,
        scaler,
        feature_names: feature_names.clone(),
        impute_values,
    };
    bundle.publish(&config.artifact_dir)?;

    Ok(TrainOutcome {
        selected: bundle.model.name(),
        reports,
        feature_names,
    })
}

/// Training column order minus the identifier and the label.
fn feature_names(train: &Table) -> Result<Vec<String>, TrainError> {
    if train.column_index(LABEL_COLUMN).is_none() {
        return Err(TrainError::MissingColumn(LABEL_COLUMN.to_string()));
    }
    Ok(train
        .columns()
        .iter()
        .filter(|name| name.as_str() != ID_COLUMN && name.as_str() != LABEL_COLUMN)
        .cloned()
        .collect())
}

fn decompose(table: &Table, feature_names: &[String]) -> Result<RawPartition, TrainError> {
    let label_idx = table
        .column_index(LABEL_COLUMN)
        .ok_or_else(|| TrainError::MissingColumn(LABEL_COLUMN.to_string()))?;
    let feature_indices: Vec<Option<usize>> = feature_names
        .iter()
        .map(|name| table.column_index(name))
        .collect();

    let mut x = Vec::with_capacity(table.n_rows());
    let mut y = Vec::with_capacity(table.n_rows());
    for (row_idx, row) in table.rows().iter().enumerate() {
        let label_cell = row[label_idx].as_deref().unwrap_or("");
        let label = match clean_numeric_text(label_cell) {
            Some(v) if v == 0.0 => 0u8,
            Some(v) if v == 1.0 => 1u8,
            _ => {
                return Err(TrainError::BadLabel {
                    row: row_idx,
                    value: label_cell.to_string(),
                });
            }
        };
        let features = feature_indices
            .iter()
            .map(|idx| {
                idx.and_then(|i| row[i].as_deref())
                    .and_then(clean_numeric_text)
            })
            .collect();
        x.push(features);
        y.push(label);
    }
    Ok(RawPartition { x, y })
}

/// Per-feature means over the present values; features with no usable value
/// at all fall back to 0.
fn feature_means(x: &[Vec<Option<f64>>], feature_names: &[String]) -> BTreeMap<String, f64> {
    let mut sums = vec![0.0f64; feature_names.len()];
    let mut counts = vec![0u64; feature_names.len()];
    for row in x {
        for (j, cell) in row.iter().enumerate() {
            if let Some(v) = cell {
                sums[j] += v;
                counts[j] += 1;
            }
        }
    }
    feature_names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let mean = if counts[j] == 0 {
                0.0
            } else {
                sums[j] / counts[j] as f64
            };
            (name.clone(), mean)
        })
        .collect()
}

fn fill_missing(x: Vec<Vec<Option<f64>>>, impute_row: &[f64]) -> Vec<Vec<f64>> {
    x.into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(j, cell)| cell.unwrap_or(impute_row[j]))
                .collect()
        })
        .collect()
}

fn scaled_dataset(
    scaler: &StandardScaler,
    x: Vec<Vec<f64>>,
    y: Vec<u8>,
    feature_len: usize,
) -> Result<TrainDataset, TrainError> {
    Ok(TrainDataset {
        feature_len,
        x: scaler.transform(&x)?,
        y,
    })
}

fn evaluate(model: &ModelArtifact, test: &TrainDataset) -> CandidateReport {
    let probabilities: Vec<f64> = test
        .x
        .iter()
        .map(|row| model.predict_bad_probability(row))
        .collect();
    let mut confusion = ConfusionMatrix::default();
    for (&truth, &p) in test.y.iter().zip(probabilities.iter()) {
        let predicted = if p >= REPORT_THRESHOLD { 1 } else { 0 };
        confusion.add(truth, predicted);
    }
    CandidateReport {
        name: model.name(),
        test_auc: roc_auc(&test.y, &probabilities),
        accuracy: accuracy(&confusion),
        per_class: precision_recall_by_class(&confusion),
        confusion,
    }
}
