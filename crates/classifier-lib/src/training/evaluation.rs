//! Classification metrics

use crate::models::SpeciesLabel;
use serde::{Deserialize, Serialize};

/// Per-class precision, recall and F1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub species: SpeciesLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Rows whose true label is this class
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_f1: f64,
    /// F1 averaged with each class weighted by its support
    pub weighted_f1: f64,
    pub total: usize,
}

impl ClassificationReport {
    /// Compare true and predicted class indices; ratios with a zero
    /// denominator count as 0
    pub fn new(y_true: &[usize], y_pred: &[usize]) -> Self {
        let total = y_true.len().min(y_pred.len());
        let pairs = || y_true.iter().zip(y_pred);

        let classes: Vec<ClassMetrics> = SpeciesLabel::ALL
            .iter()
            .map(|&species| {
                let k = species.index();
                let tp = pairs().filter(|&(&t, &p)| t == k && p == k).count();
                let predicted = pairs().filter(|&(_, &p)| p == k).count();
                let support = pairs().filter(|&(&t, _)| t == k).count();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    species,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let correct = pairs().filter(|(t, p)| t == p).count();
        let macro_f1 = classes.iter().map(|c| c.f1).sum::<f64>() / classes.len() as f64;
        let weighted_f1 = if total == 0 {
            0.0
        } else {
            classes.iter().map(|c| c.f1 * c.support as f64).sum::<f64>() / total as f64
        };

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_f1,
            weighted_f1,
            total,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
