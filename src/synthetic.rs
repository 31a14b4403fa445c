//! Synthetic artifact generation for when the real datasets are unavailable.
//!
//! Produces a seeded, reproducible bundle over the default field-map feature
//! space so the scoring service can start for UI and integration testing.
//! Never use these artifacts for real credit decisions.

use std::collections::BTreeMap;
use std::path::Path;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::info;

use crate::artifacts::{ArtifactBundle, ArtifactError};
use crate::features::FieldMap;
use crate::ml::{ModelArtifact, TrainDataset, logreg, sigmoid};
use crate::scaler::StandardScaler;

/// Options for synthetic bundle generation.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    pub rows: usize,
    pub seed: u64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            rows: 500,
            seed: 42,
        }
    }
}

/// Errors from synthetic generation.
#[derive(Debug, thiserror::Error)]
pub enum SyntheticError {
    #[error("need at least 10 rows to fit a synthetic model, got {0}")]
    TooFewRows(usize),
    #[error("synthetic model training failed: {0}")]
    Ml(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Build a synthetic bundle over the default field-map feature names.
pub fn generate_bundle(options: &SyntheticOptions) -> Result<ArtifactBundle, SyntheticError> {
    if options.rows < 10 {
        return Err(SyntheticError::TooFewRows(options.rows));
    }
    let feature_names = FieldMap::default().feature_names();
    let mut rng = StdRng::seed_from_u64(options.seed);

    let mut x: Vec<Vec<f64>> = Vec::with_capacity(options.rows);
    for _ in 0..options.rows {
        let row = feature_names
            .iter()
            .map(|name| sample_feature(name, &mut rng))
            .collect();
        x.push(row);
    }

    // Default probability rises with the obvious risk proxies and falls
    // with income, mirroring the shape of the real data.
    let index = |name: &str| {
        feature_names
            .iter()
            .position(|n| n == name)
            .unwrap_or_default()
    };
    let risk_columns = [
        (0.02, index("TL75UtilCnt")),
        (0.02, index("TL50UtilCnt")),
        (0.01, index("TLDel60Cnt")),
        (0.03, index("TLBadCnt24")),
        (0.02, index("DerogCnt")),
        (0.000002, index("TLMaxSum")),
        (-0.000001, index("Income")),
    ];
    let y: Vec<u8> = x
        .iter()
        .map(|row| {
            let score: f64 = risk_columns
                .iter()
                .map(|&(weight, idx)| weight * row[idx])
                .sum();
            u8::from(rng.random::<f64>() < sigmoid(score))
        })
        .collect();

    let impute_values: BTreeMap<String, f64> = feature_names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let mean = x.iter().map(|row| row[j]).sum::<f64>() / x.len() as f64;
            (name.clone(), mean)
        })
        .collect();

    let scaler = StandardScaler::fit(&x).map_err(|err| SyntheticError::Ml(err.to_string()))?;
    let scaled = scaler
        .transform(&x)
        .map_err(|err| SyntheticError::Ml(err.to_string()))?;

    // Every fifth row becomes the validation set for best-epoch selection.
    let mut train_x = Vec::new();
    let mut train_y = Vec::new();
    let mut val_x = Vec::new();
    let mut val_y = Vec::new();
    for (i, (row, &label)) in scaled.into_iter().zip(y.iter()).enumerate() {
        if i % 5 == 0 {
            val_x.push(row);
            val_y.push(label);
        } else {
            train_x.push(row);
            train_y.push(label);
        }
    }
    let feature_len = feature_names.len();
    let train = TrainDataset {
        feature_len,
        x: train_x,
        y: train_y,
    };
    let val = TrainDataset {
        feature_len,
        x: val_x,
        y: val_y,
    };
    let model = logreg::train_logreg(
        &train,
        &val,
        &logreg::TrainOptions {
            epochs: 30,
            seed: options.seed,
            ..logreg::TrainOptions::default()
        },
    )
    .map_err(SyntheticError::Ml)?;

    Ok(ArtifactBundle {
        model: ModelArtifact::Logreg(model),
        scaler,
        feature_names,
        impute_values,
    })
}

/// Generate a synthetic bundle and publish it to `artifact_dir`.
pub fn generate_and_publish(
    artifact_dir: &Path,
    options: &SyntheticOptions,
) -> Result<ArtifactBundle, SyntheticError> {
    let bundle = generate_bundle(options)?;
    bundle.publish(artifact_dir)?;
    info!(
        dir = %artifact_dir.display(),
        rows = options.rows,
        seed = options.seed,
        "synthetic artifacts created"
    );
    Ok(bundle)
}

/// Sample one value for a named feature with a plausible scale: percentages
/// and utilization counts stay in [0, 100], balances are log-normal-ish, and
/// everything else is a small count.
fn sample_feature(name: &str, rng: &mut StdRng) -> f64 {
    if name.contains("Pct") || name.contains("Util") {
        (40.0 + 20.0 * standard_normal(rng)).clamp(0.0, 100.0)
    } else if name.contains("Income") {
        (10.0 + 0.4 * standard_normal(rng)).exp() / 1e5
    } else if name.contains("Sum") || name.contains("Max") {
        (8.0 + 0.6 * standard_normal(rng)).exp()
    } else {
        poisson(2.0, rng)
    }
}

/// Box-Muller standard normal.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Knuth's Poisson sampler; fine for small lambda.
fn poisson(lambda: f64, rng: &mut StdRng) -> f64 {
    let limit = (-lambda).exp();
    let mut count = 0u32;
    let mut product: f64 = rng.random();
    while product > limit {
        count += 1;
        product *= rng.random::<f64>();
    }
    f64::from(count)
}
