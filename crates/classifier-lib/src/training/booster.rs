//! Multiclass gradient boosting with exact greedy tree growth
//!
//! Each round fits one regression tree per class to the softmax gradients:
//! - Gradient: g = p - y, hessian: h = max(2p(1 - p), 1e-16)
//! - Split gain: 0.5 * (GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)), kept when above gamma
//! - Leaf weight: w = -G / (H + λ), scaled by the learning rate
//!
//! Trees are written straight into the flat node layout the evaluator reads.

use crate::error::{ClassifierError, Result};
use crate::models::EncodedFeatureVector;
use crate::predictor::{softmax, Objective, RegressionTree, TreeEnsemble, TreeNode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Starting margin for every class
const BASE_SCORE: f32 = 0.5;

const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    /// Boosting rounds; each adds one tree per class
    pub rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    pub min_child_weight: f64,
    /// Minimum gain for a split
    pub gamma: f64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            rounds: 100,
            max_depth: 3,
            learning_rate: 0.3,
            lambda: 1.0,
            min_child_weight: 1.0,
            gamma: 0.0,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(ClassifierError::Configuration(
                "rounds must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ClassifierError::Configuration(format!(
                "learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.lambda < 0.0 || self.min_child_weight < 0.0 || self.gamma < 0.0 {
            return Err(ClassifierError::Configuration(
                "lambda, min child weight and gamma must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Softmax gradient-boosted tree trainer
#[derive(Debug, Clone, Default)]
pub struct GradientBooster {
    params: BoosterParams,
}

impl GradientBooster {
    pub fn new(params: BoosterParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    /// Fit an ensemble on encoded rows and class indices
    pub fn fit(
        &self,
        rows: &[EncodedFeatureVector],
        labels: &[usize],
        num_classes: usize,
    ) -> Result<TreeEnsemble> {
        if rows.is_empty() {
            return Err(ClassifierError::Dataset("no training rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(ClassifierError::Dataset(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(ClassifierError::Dataset(format!(
                "label {} is outside {} classes",
                bad, num_classes
            )));
        }

        let num_features = rows[0].len();
        if let Some(row) = rows.iter().find(|r| r.len() != num_features) {
            return Err(ClassifierError::ShapeMismatch {
                expected: num_features,
                actual: row.len(),
            });
        }

        let mut ensemble =
            TreeEnsemble::new(Objective::MultiSoftprob, num_features, num_classes, BASE_SCORE)?;
        let mut margins = vec![vec![BASE_SCORE; num_classes]; rows.len()];
        let all_rows: Vec<usize> = (0..rows.len()).collect();

        for round in 0..self.params.rounds {
            let probs: Vec<Vec<f32>> = margins.iter().map(|m| softmax(m)).collect();

            for class in 0..num_classes {
                let (grad, hess): (Vec<f64>, Vec<f64>) = probs
                    .iter()
                    .zip(labels)
                    .map(|(p, &label)| {
                        let p = f64::from(p[class]);
                        let y = if label == class { 1.0 } else { 0.0 };
                        (p - y, (2.0 * p * (1.0 - p)).max(MIN_HESSIAN))
                    })
                    .unzip();

                let mut builder = TreeBuilder {
                    rows,
                    grad: &grad,
                    hess: &hess,
                    params: &self.params,
                    nodes: Vec::new(),
                };
                builder.grow(&all_rows, 0);
                let tree = RegressionTree::new(builder.nodes, num_features)?;

                for (row, margin) in rows.iter().zip(margins.iter_mut()) {
                    margin[class] += tree.leaf_value(row.as_slice());
                }
                ensemble.push_tree(tree, class)?;
            }

            if round % 25 == 0 {
                debug!(round, loss = log_loss(&margins, labels), "Boosting round");
            }
        }

        debug!(
            trees = ensemble.num_trees(),
            loss = log_loss(&margins, labels),
            "Boosting finished"
        );
        Ok(ensemble)
    }
}

/// Mean multiclass cross-entropy
fn log_loss(margins: &[Vec<f32>], labels: &[usize]) -> f64 {
    let total: f64 = margins
        .iter()
        .zip(labels)
        .map(|(m, &label)| -f64::from(softmax(m)[label].max(1e-15)).ln())
        .sum();
    total / labels.len() as f64
}

struct Split {
    feature: usize,
    threshold: f32,
    gain: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [EncodedFeatureVector],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoosterParams,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    fn value(&self, row: usize, feature: usize) -> f32 {
        self.rows[row].as_slice()[feature]
    }

    /// Grow the subtree for `members` and return its node id
    ///
    /// A node is pushed before its children, so child ids are always
    /// greater than their parent's.
    fn grow(&mut self, members: &[usize], depth: usize) -> usize {
        let g_sum: f64 = members.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = members.iter().map(|&i| self.hess[i]).sum();
        let weight = -g_sum / (h_sum + self.params.lambda);

        let id = self.nodes.len();
        self.nodes.push(TreeNode::leaf(
            (weight * self.params.learning_rate) as f32,
            weight as f32,
            h_sum as f32,
        ));

        if depth >= self.params.max_depth || members.len() < 2 || h_sum < self.params.min_child_weight {
            return id;
        }

        let split = match self.best_split(members, g_sum, h_sum) {
            Some(split) if split.gain > self.params.gamma => split,
            _ => return id,
        };

        let (left, right): (Vec<usize>, Vec<usize>) = members
            .iter()
            .partition(|&&i| self.value(i, split.feature) < split.threshold);
        if left.is_empty() || right.is_empty() {
            return id;
        }

        let left_id = self.grow(&left, depth + 1);
        let right_id = self.grow(&right, depth + 1);

        let mut node = TreeNode::split(split.feature as u32, split.threshold, left_id, right_id);
        node.base_weight = weight as f32;
        node.loss_change = split.gain as f32;
        node.sum_hessian = h_sum as f32;
        self.nodes[id] = node;
        id
    }

    fn best_split(&self, members: &[usize], g_total: f64, h_total: f64) -> Option<Split> {
        let lambda = self.params.lambda;
        let parent_score = g_total * g_total / (h_total + lambda);
        let num_features = self.rows[members[0]].len();
        let mut best: Option<Split> = None;

        for feature in 0..num_features {
            let mut sorted = members.to_vec();
            sorted.sort_by(|&a, &b| {
                self.value(a, feature)
                    .partial_cmp(&self.value(b, feature))
                    .unwrap_or(Ordering::Equal)
            });

            let (mut g_left, mut h_left) = (0.0, 0.0);
            for pair in sorted.windows(2) {
                let (current, next) = (pair[0], pair[1]);
                g_left += self.grad[current];
                h_left += self.hess[current];

                let (low, high) = (self.value(current, feature), self.value(next, feature));
                if high - low <= f32::EPSILON * low.abs().max(1.0) {
                    continue;
                }

                let g_right = g_total - g_left;
                let h_right = h_total - h_left;
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }

                let gain = 0.5
                    * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                        - parent_score);
                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: low + (high - low) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}
