use tracing::debug;

use super::model::{GbdtModel, Stump};
use crate::ml::{TrainDataset, sigmoid};

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Maximum number of boosting rounds.
    pub rounds: usize,
    /// Learning rate applied per round.
    pub learning_rate: f64,
    /// Number of bins used for split search.
    pub bins: usize,
    /// Stop when validation log-loss has not improved for this many rounds.
    pub early_stopping_rounds: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            rounds: 500,
            learning_rate: 0.05,
            bins: 32,
            early_stopping_rounds: 50,
        }
    }
}

/// Train a binary stump-GBDT model with logistic-loss gradient boosting.
///
/// Validation log-loss is tracked every round; the returned model is
/// truncated at the best round so the persisted artifact never overfits
/// past it.
pub fn train_gbdt(
    train: &TrainDataset,
    val: &TrainDataset,
    options: &TrainOptions,
) -> Result<GbdtModel, String> {
    train.validate()?;
    val.validate()?;
    if val.feature_len != train.feature_len {
        return Err("Validation feature length differs from training".to_string());
    }
    if options.rounds == 0 {
        return Err("Need at least one boosting round".to_string());
    }

    let n = train.x.len();
    let d = train.feature_len;
    let (mins, maxs) = compute_feature_min_max(&train.x, d);
    let binned = bin_features(&train.x, &mins, &maxs, options.bins);

    let positive_rate = train.y.iter().map(|&y| y as usize).sum::<usize>() as f64 / n as f64;
    let prior = positive_rate.clamp(1e-6, 1.0 - 1e-6);
    let init_raw = (prior / (1.0 - prior)).ln();

    let mut raw = vec![init_raw; n];
    let mut val_raw = vec![init_raw; val.x.len()];
    let mut stumps: Vec<Stump> = Vec::with_capacity(options.rounds);

    let mut best_loss = log_loss(&val.y, &val_raw);
    let mut best_round = 0usize;

    for round in 0..options.rounds {
        let residuals: Vec<f64> = train
            .y
            .iter()
            .zip(raw.iter())
            .map(|(&y, &r)| f64::from(y) - sigmoid(r))
            .collect();

        let stump = fit_best_stump(&binned, &train.x, &mins, &maxs, options.bins, &residuals);
        for (raw_i, row) in raw.iter_mut().zip(train.x.iter()) {
            *raw_i += options.learning_rate * stump.predict(row);
        }
        for (raw_i, row) in val_raw.iter_mut().zip(val.x.iter()) {
            *raw_i += options.learning_rate * stump.predict(row);
        }
        stumps.push(stump);

        let loss = log_loss(&val.y, &val_raw);
        if loss < best_loss {
            best_loss = loss;
            best_round = stumps.len();
        }
        if stumps.len() - best_round >= options.early_stopping_rounds {
            debug!(round, best_round, best_loss, "early stopping triggered");
            break;
        }
    }

    stumps.truncate(best_round);
    let model = GbdtModel {
        model_version: 1,
        feature_len: d,
        learning_rate: options.learning_rate,
        init_raw,
        stumps,
    };
    model.validate()?;
    Ok(model)
}

/// Mean binary cross-entropy of raw log-odds scores against labels.
fn log_loss(y: &[u8], raw: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for (&label, &r) in y.iter().zip(raw.iter()) {
        let p = sigmoid(r).clamp(1e-12, 1.0 - 1e-12);
        total -= if label == 1 { p.ln() } else { (1.0 - p).ln() };
    }
    total / y.len() as f64
}

fn compute_feature_min_max(x: &[Vec<f64>], feature_len: usize) -> (Vec<f64>, Vec<f64>) {
    let mut mins = vec![f64::INFINITY; feature_len];
    let mut maxs = vec![f64::NEG_INFINITY; feature_len];
    for row in x {
        for (j, &v) in row.iter().take(feature_len).enumerate() {
            if v.is_finite() {
                mins[j] = mins[j].min(v);
                maxs[j] = maxs[j].max(v);
            }
        }
    }
    for j in 0..feature_len {
        if !mins[j].is_finite() || !maxs[j].is_finite() {
            mins[j] = 0.0;
            maxs[j] = 0.0;
        }
        if mins[j] == maxs[j] {
            maxs[j] = mins[j] + 1.0;
        }
    }
    (mins, maxs)
}

fn bin_features(x: &[Vec<f64>], mins: &[f64], maxs: &[f64], bins: usize) -> Vec<Vec<u8>> {
    let bins = bins.clamp(2, 256) as f64;
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(x.len());
    for row in x {
        let mut binned = Vec::with_capacity(mins.len());
        for (j, &min) in mins.iter().enumerate() {
            let max = maxs[j];
            let v = row.get(j).copied().unwrap_or(0.0);
            let t = if max > min {
                ((v - min) / (max - min)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let b = (t * (bins - 1.0)).round() as u8;
            binned.push(b);
        }
        out.push(binned);
    }
    out
}

fn fit_best_stump(
    binned: &[Vec<u8>],
    x: &[Vec<f64>],
    mins: &[f64],
    maxs: &[f64],
    bins: usize,
    residuals: &[f64],
) -> Stump {
    let n_features = mins.len();
    let bins = bins.clamp(2, 256);

    let mut best = BestSplit::default();
    for feature_idx in 0..n_features {
        let split = best_split_for_feature(binned, residuals, feature_idx, bins);
        if split.score < best.score {
            best = split;
        }
    }

    let feature_idx = best.feature_index;
    let threshold = threshold_for_bin(mins[feature_idx], maxs[feature_idx], best.split_bin, bins);
    let (left_value, right_value) = leaf_means_for_threshold(x, residuals, feature_idx, threshold);
    Stump {
        feature_index: feature_idx as u16,
        threshold,
        left_value,
        right_value,
    }
}

#[derive(Debug, Clone)]
struct BestSplit {
    score: f64,
    feature_index: usize,
    split_bin: usize,
}

impl Default for BestSplit {
    fn default() -> Self {
        Self {
            score: f64::INFINITY,
            feature_index: 0,
            split_bin: 0,
        }
    }
}

fn best_split_for_feature(
    binned: &[Vec<u8>],
    residuals: &[f64],
    feature_idx: usize,
    bins: usize,
) -> BestSplit {
    let mut counts = vec![0u32; bins];
    let mut sums = vec![0f64; bins];
    let mut sums_sq = vec![0f64; bins];
    for (i, row) in binned.iter().enumerate() {
        let b = row.get(feature_idx).copied().unwrap_or(0) as usize;
        let r = residuals[i];
        counts[b] += 1;
        sums[b] += r;
        sums_sq[b] += r * r;
    }
    let total_count: u32 = counts.iter().sum();
    if total_count == 0 {
        return BestSplit::default();
    }
    let total_sum: f64 = sums.iter().sum();
    let total_sum_sq: f64 = sums_sq.iter().sum();

    let mut best_score = f64::INFINITY;
    let mut best_bin = 0usize;

    let mut left_count = 0u32;
    let mut left_sum = 0f64;
    let mut left_sum_sq = 0f64;

    for split_bin in 0..(bins - 1) {
        left_count += counts[split_bin];
        left_sum += sums[split_bin];
        left_sum_sq += sums_sq[split_bin];
        let right_count = total_count - left_count;
        if left_count == 0 || right_count == 0 {
            continue;
        }
        let right_sum = total_sum - left_sum;
        let right_sum_sq = total_sum_sq - left_sum_sq;
        let left_sse = left_sum_sq - (left_sum * left_sum) / f64::from(left_count);
        let right_sse = right_sum_sq - (right_sum * right_sum) / f64::from(right_count);
        let score = left_sse + right_sse;
        if score < best_score {
            best_score = score;
            best_bin = split_bin;
        }
    }

    BestSplit {
        score: best_score,
        feature_index: feature_idx,
        split_bin: best_bin,
    }
}

fn threshold_for_bin(min: f64, max: f64, split_bin: usize, bins: usize) -> f64 {
    let t = ((split_bin + 1) as f64) / bins as f64;
    min + t * (max - min)
}

fn leaf_means_for_threshold(
    x: &[Vec<f64>],
    residuals: &[f64],
    feature_idx: usize,
    threshold: f64,
) -> (f64, f64) {
    let mut left_sum = 0.0f64;
    let mut left_count = 0u32;
    let mut right_sum = 0.0f64;
    let mut right_count = 0u32;
    for (i, row) in x.iter().enumerate() {
        let v = row.get(feature_idx).copied().unwrap_or(0.0);
        if v <= threshold {
            left_sum += residuals[i];
            left_count += 1;
        } else {
            right_sum += residuals[i];
            right_count += 1;
        }
    }
    let left_mean = if left_count == 0 {
        0.0
    } else {
        left_sum / f64::from(left_count)
    };
    let right_mean = if right_count == 0 {
        0.0
    } else {
        right_sum / f64::from(right_count)
    };
    (left_mean, right_mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_dataset(n_per_class: usize, offset: f64) -> TrainDataset {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n_per_class {
            let jitter = (i % 7) as f64 * 0.01;
            x.push(vec![-1.0 - jitter, 0.0]);
            y.push(0);
            x.push(vec![1.0 + offset + jitter, 0.0]);
            y.push(1);
        }
        TrainDataset {
            feature_len: 2,
            x,
            y,
        }
    }

    #[test]
    fn learns_a_separable_threshold() {
        let train = separable_dataset(40, 0.0);
        let val = separable_dataset(10, 0.1);
        let options = TrainOptions {
            rounds: 50,
            learning_rate: 0.2,
            bins: 16,
            early_stopping_rounds: 10,
        };
        let model = train_gbdt(&train, &val, &options).unwrap();
        assert!(model.predict_proba(&[1.5, 0.0]) > 0.8);
        assert!(model.predict_proba(&[-1.5, 0.0]) < 0.2);
    }

    #[test]
    fn training_is_deterministic() {
        let train = separable_dataset(20, 0.0);
        let val = separable_dataset(5, 0.1);
        let options = TrainOptions::default();
        let a = train_gbdt(&train, &val, &options).unwrap();
        let b = train_gbdt(&train, &val, &options).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn unhelpful_validation_truncates_to_the_prior() {
        let train = separable_dataset(30, 0.0);
        // Validation labels contradict the training signal, so every round
        // makes validation loss worse and the best round stays at zero.
        let mut val = separable_dataset(8, 0.1);
        for label in &mut val.y {
            *label = 1 - *label;
        }
        let options = TrainOptions {
            rounds: 400,
            learning_rate: 0.2,
            bins: 16,
            early_stopping_rounds: 5,
        };
        let model = train_gbdt(&train, &val, &options).unwrap();
        assert!(model.stumps.is_empty());
    }

    #[test]
    fn rejects_mismatched_validation_width() {
        let train = separable_dataset(10, 0.0);
        let val = TrainDataset {
            feature_len: 3,
            x: vec![vec![0.0; 3]],
            y: vec![0],
        };
        assert!(train_gbdt(&train, &val, &TrainOptions::default()).is_err());
    }
}
