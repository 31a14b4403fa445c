use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::debug;

use super::model::LogRegModel;
use crate::ml::metrics::roc_auc;
use crate::ml::{TrainDataset, sigmoid};

/// Training options for the logistic-regression candidate.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub batch_size: usize,
    pub seed: u64,
    /// Reweight examples inversely to class frequency.
    pub balance_classes: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 50,
            learning_rate: 0.1,
            l2: 1e-4,
            batch_size: 128,
            seed: 42,
            balance_classes: true,
        }
    }
}

/// Train a binary logistic regression with mini-batch gradient descent.
///
/// After each epoch the validation AUC is measured; the weights from the
/// best epoch are the ones returned.
pub fn train_logreg(
    train: &TrainDataset,
    val: &TrainDataset,
    options: &TrainOptions,
) -> Result<LogRegModel, String> {
    train.validate()?;
    val.validate()?;
    if val.feature_len != train.feature_len {
        return Err("Validation feature length differs from training".to_string());
    }
    let dim = train.feature_len;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut weights = vec![0.0f64; dim];
    let mut bias = 0.0f64;

    let class_weights = if options.balance_classes {
        let positives = train.y.iter().filter(|&&y| y == 1).count() as f64;
        let negatives = train.y.len() as f64 - positives;
        let total = train.y.len() as f64;
        [
            if negatives == 0.0 {
                0.0
            } else {
                total / (2.0 * negatives)
            },
            if positives == 0.0 {
                0.0
            } else {
                total / (2.0 * positives)
            },
        ]
    } else {
        [1.0, 1.0]
    };

    let mut indices: Vec<usize> = (0..train.x.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);

    let mut best_weights = weights.clone();
    let mut best_bias = bias;
    let mut best_auc = f64::NEG_INFINITY;

    for epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = vec![0.0f64; dim];
            let mut grad_b = 0.0f64;
            let mut batch_weight = 0.0f64;
            for &idx in chunk {
                let x = &train.x[idx];
                let y = train.y[idx];
                let weight = class_weights[y as usize];
                if weight == 0.0 {
                    continue;
                }
                let mut raw = bias;
                for (w, &v) in weights.iter().zip(x.iter()) {
                    raw += w * v;
                }
                let diff = (sigmoid(raw) - f64::from(y)) * weight;
                for (g, &v) in grad_w.iter_mut().zip(x.iter()) {
                    *g += diff * v;
                }
                grad_b += diff;
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                *w -= lr * (g * inv + l2 * *w);
            }
            bias -= lr * grad_b * inv;
        }

        let scores: Vec<f64> = val
            .x
            .iter()
            .map(|row| {
                let mut raw = bias;
                for (w, &v) in weights.iter().zip(row.iter()) {
                    raw += w * v;
                }
                raw
            })
            .collect();
        let auc = roc_auc(&val.y, &scores);
        if auc > best_auc {
            best_auc = auc;
            best_weights.clone_from(&weights);
            best_bias = bias;
            debug!(epoch, auc, "new best validation epoch");
        }
    }

    let model = LogRegModel {
        model_version: 1,
        feature_len: dim,
        weights: best_weights,
        bias: best_bias,
    };
    model.validate()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_dataset(n_per_class: usize) -> TrainDataset {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n_per_class {
            let jitter = (i % 5) as f64 * 0.05;
            x.push(vec![-1.0 - jitter]);
            y.push(0);
            x.push(vec![1.0 + jitter]);
            y.push(1);
        }
        TrainDataset {
            feature_len: 1,
            x,
            y,
        }
    }

    #[test]
    fn learns_a_separable_boundary() {
        let train = separable_dataset(50);
        let val = separable_dataset(10);
        let model = train_logreg(&train, &val, &TrainOptions::default()).unwrap();
        assert!(model.predict_proba(&[2.0]) > 0.8);
        assert!(model.predict_proba(&[-2.0]) < 0.2);
    }

    #[test]
    fn training_is_deterministic_given_a_seed() {
        let train = separable_dataset(20);
        let val = separable_dataset(5);
        let options = TrainOptions::default();
        let a = train_logreg(&train, &val, &options).unwrap();
        let b = train_logreg(&train, &val, &options).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }

    #[test]
    fn rejects_empty_training_set() {
        let empty = TrainDataset {
            feature_len: 1,
            x: Vec::new(),
            y: Vec::new(),
        };
        let val = separable_dataset(3);
        assert!(train_logreg(&empty, &val, &TrainOptions::default()).is_err());
    }
}
