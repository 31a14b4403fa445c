//! Evaluation metrics for binary classifiers.

/// Confusion matrix for a binary classifier (class 1 = default/bad credit).
#[derive(Debug, Clone, Default)]
pub struct ConfusionMatrix {
    pub true_negative: u32,
    pub false_positive: u32,
    pub false_negative: u32,
    pub true_positive: u32,
}

impl ConfusionMatrix {
    /// Record one truth/prediction pair.
    pub fn add(&mut self, truth: u8, predicted: u8) {
        match (truth, predicted) {
            (0, 0) => self.true_negative = self.true_negative.saturating_add(1),
            (0, _) => self.false_positive = self.false_positive.saturating_add(1),
            (_, 0) => self.false_negative = self.false_negative.saturating_add(1),
            _ => self.true_positive = self.true_positive.saturating_add(1),
        }
    }

    pub fn total(&self) -> u32 {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Precision/recall statistics for a single class.
#[derive(Debug, Clone)]
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    f64::from(cm.true_negative + cm.true_positive) / f64::from(total)
}

/// Per-class precision and recall, indexed `[class 0, class 1]`.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> [PerClassStats; 2] {
    let stats = |tp: u32, fp: u32, fn_: u32| {
        let tp_f = f64::from(tp);
        let precision = if tp + fp == 0 {
            0.0
        } else {
            tp_f / f64::from(tp + fp)
        };
        let recall = if tp + fn_ == 0 {
            0.0
        } else {
            tp_f / f64::from(tp + fn_)
        };
        PerClassStats {
            precision,
            recall,
            support: tp + fn_,
        }
    };
    [
        stats(cm.true_negative, cm.false_negative, cm.false_positive),
        stats(cm.true_positive, cm.false_positive, cm.false_negative),
    ]
}

/// Area under the ROC curve via the rank-sum (Mann-Whitney) formulation,
/// with tied scores assigned their average rank. Returns 0.5 when either
/// class is absent, where the curve is undefined.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> f64 {
    debug_assert_eq!(labels.len(), scores.len());
    let n = labels.len().min(scores.len());
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0f64;
    let mut n_positive = 0u64;
    let mut i = 0usize;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Average 1-based rank for the tie group [i, j].
        let rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                positive_rank_sum += rank;
                n_positive += 1;
            }
        }
        i = j + 1;
    }

    let n_negative = n as u64 - n_positive;
    if n_positive == 0 || n_negative == 0 {
        return 0.5;
    }
    let n_pos = n_positive as f64;
    (positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_negative as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_scores_one() {
        let labels = [0, 0, 1, 1];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores), 1.0);
    }

    #[test]
    fn inverted_ranking_scores_zero() {
        let labels = [1, 1, 0, 0];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores), 0.0);
    }

    #[test]
    fn all_tied_scores_are_chance_level() {
        let labels = [0, 1, 0, 1];
        let scores = [0.5, 0.5, 0.5, 0.5];
        assert_eq!(roc_auc(&labels, &scores), 0.5);
    }

    #[test]
    fn single_class_is_chance_level() {
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.9]), 0.5);
    }

    #[test]
    fn accuracy_and_per_class_stats() {
        let mut cm = ConfusionMatrix::default();
        for (truth, predicted) in [(0, 0), (0, 0), (0, 1), (1, 1), (1, 0)] {
            cm.add(truth, predicted);
        }
        assert_eq!(accuracy(&cm), 3.0 / 5.0);
        let [neg, pos] = precision_recall_by_class(&cm);
        assert_eq!(neg.support, 3);
        assert_eq!(pos.support, 2);
        assert!((pos.precision - 0.5).abs() < 1e-12);
        assert!((pos.recall - 0.5).abs() < 1e-12);
        assert!((neg.recall - 2.0 / 3.0).abs() < 1e-12);
    }
}
