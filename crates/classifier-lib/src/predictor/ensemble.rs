//! Gradient-boosted tree ensembles in the XGBoost JSON model layout
//!
//! Trees are stored as flat node arrays. Leaves carry their value in the
//! split-condition slot, matching what `XGBClassifier.save_model("*.json")`
//! writes, so models trained on either side load on the other.

use super::Classifier;
use crate::error::{ClassifierError, Result};
use crate::models::EncodedFeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// XGBoost release whose JSON layout is written
const XGBOOST_FORMAT_VERSION: [u32; 3] = [2, 0, 3];

/// Learner attribute holding the feature schema fingerprint
pub const SCHEMA_FINGERPRINT_ATTR: &str = "feature_schema_fingerprint";

/// Learner attribute holding the feature schema version
pub const SCHEMA_VERSION_ATTR: &str = "feature_schema_version";

/// Root parent marker used by XGBoost
const ROOT_PARENT: i32 = i32::MAX;

/// Learning objectives the evaluator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    MultiSoftprob,
    MultiSoftmax,
    BinaryLogistic,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultiSoftprob => "multi:softprob",
            Self::MultiSoftmax => "multi:softmax",
            Self::BinaryLogistic => "binary:logistic",
        }
    }

    fn is_multiclass(&self) -> bool {
        !matches!(self, Self::BinaryLogistic)
    }
}

impl FromStr for Objective {
    type Err = ClassifierError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "multi:softprob" => Ok(Self::MultiSoftprob),
            "multi:softmax" => Ok(Self::MultiSoftmax),
            "binary:logistic" => Ok(Self::BinaryLogistic),
            other => Err(ClassifierError::Artifact(format!(
                "unsupported objective '{}'",
                other
            ))),
        }
    }
}

/// One node of a regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub parent: i32,
    pub feature: u32,
    /// Split threshold for internal nodes, output value for leaves
    pub condition: f32,
    pub default_left: bool,
    pub base_weight: f32,
    pub loss_change: f32,
    pub sum_hessian: f32,
}

impl TreeNode {
    pub fn leaf(value: f32, base_weight: f32, sum_hessian: f32) -> Self {
        Self {
            left: -1,
            right: -1,
            parent: ROOT_PARENT,
            feature: 0,
            condition: value,
            default_left: false,
            base_weight,
            loss_change: 0.0,
            sum_hessian,
        }
    }

    pub fn split(feature: u32, threshold: f32, left: usize, right: usize) -> Self {
        Self {
            left: left as i32,
            right: right as i32,
            parent: ROOT_PARENT,
            feature,
            condition: threshold,
            default_left: true,
            base_weight: 0.0,
            loss_change: 0.0,
            sum_hessian: 0.0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left < 0
    }
}

/// A single regression tree over encoded features
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Build a tree, checking that every child index points forward into the
    /// node array and every split feature is within `num_features`
    pub fn new(mut nodes: Vec<TreeNode>, num_features: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ClassifierError::Artifact("tree has no nodes".to_string()));
        }

        for id in 0..nodes.len() {
            let node = &nodes[id];
            if node.is_leaf() {
                continue;
            }
            for child in [node.left, node.right] {
                if child < 0 || child as usize <= id || child as usize >= nodes.len() {
                    return Err(ClassifierError::Artifact(format!(
                        "node {} has invalid child {}",
                        id, child
                    )));
                }
            }
            if node.feature as usize >= num_features {
                return Err(ClassifierError::Artifact(format!(
                    "node {} splits on feature {} but the model has {} features",
                    id, node.feature, num_features
                )));
            }
        }

        nodes[0].parent = ROOT_PARENT;
        for id in 0..nodes.len() {
            if !nodes[id].is_leaf() {
                let (left, right) = (nodes[id].left as usize, nodes[id].right as usize);
                nodes[left].parent = id as i32;
                nodes[right].parent = id as i32;
            }
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Walk from the root to a leaf; NaN follows the default branch
    pub fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut id = 0usize;
        loop {
            let node = &self.nodes[id];
            if node.is_leaf() {
                return node.condition;
            }
            let value = features[node.feature as usize];
            let go_left = if value.is_nan() {
                node.default_left
            } else {
                value < node.condition
            };
            id = if go_left { node.left } else { node.right } as usize;
        }
    }
}

/// Boosted tree ensemble with one output group per class
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<RegressionTree>,
    tree_groups: Vec<usize>,
    objective: Objective,
    num_features: usize,
    num_groups: usize,
    /// One intercept per output group
    base_score: Vec<f32>,
    feature_names: Vec<String>,
    feature_types: Vec<String>,
    attributes: BTreeMap<String, String>,
}

impl TreeEnsemble {
    /// Create an empty ensemble; `num_classes` must be at least 2
    pub fn new(objective: Objective, num_features: usize, num_classes: usize, base_score: f32) -> Result<Self> {
        if num_features == 0 {
            return Err(ClassifierError::Artifact("model has no input features".to_string()));
        }
        let num_groups = match objective {
            Objective::BinaryLogistic if num_classes == 2 => 1,
            _ if objective.is_multiclass() && num_classes >= 2 => num_classes,
            _ => {
                return Err(ClassifierError::Artifact(format!(
                    "objective {} cannot produce {} classes",
                    objective.as_str(),
                    num_classes
                )))
            }
        };
        Ok(Self {
            trees: Vec::new(),
            tree_groups: Vec::new(),
            objective,
            num_features,
            num_groups,
            base_score: vec![base_score; num_groups],
            feature_names: Vec::new(),
            feature_types: Vec::new(),
            attributes: BTreeMap::new(),
        })
    }

    /// Replace the intercepts; one value is broadcast to every output group
    pub fn with_base_scores(mut self, scores: Vec<f32>) -> Result<Self> {
        self.base_score = match scores.len() {
            1 => vec![scores[0]; self.num_groups],
            n if n == self.num_groups => scores,
            n => {
                return Err(ClassifierError::Artifact(format!(
                    "model has {} base scores for {} output groups",
                    n, self.num_groups
                )))
            }
        };
        Ok(self)
    }

    pub fn push_tree(&mut self, tree: RegressionTree, group: usize) -> Result<()> {
        if group >= self.num_groups {
            return Err(ClassifierError::Artifact(format!(
                "tree assigned to output group {} of {}",
                group, self.num_groups
            )));
        }
        self.trees.push(tree);
        self.tree_groups.push(group);
        Ok(())
    }

    pub fn with_feature_names(mut self, names: Vec<String>, types: Vec<String>) -> Result<Self> {
        if !names.is_empty() && names.len() != self.num_features {
            return Err(ClassifierError::Artifact(format!(
                "model lists {} feature names for {} features",
                names.len(),
                self.num_features
            )));
        }
        self.feature_names = names;
        self.feature_types = types;
        Ok(self)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_classes(&self) -> usize {
        if self.objective.is_multiclass() {
            self.num_groups
        } else {
            2
        }
    }

    fn base_margin(&self, score: f32) -> f32 {
        match self.objective {
            Objective::BinaryLogistic => {
                let p = score.clamp(1e-6, 1.0 - 1e-6);
                (p / (1.0 - p)).ln()
            }
            _ => score,
        }
    }

    /// Raw per-group scores for one row
    pub fn margins(&self, features: &[f32]) -> Vec<f32> {
        let mut margins: Vec<f32> = self.base_score.iter().map(|&s| self.base_margin(s)).collect();
        for (tree, &group) in self.trees.iter().zip(&self.tree_groups) {
            margins[group] += tree.leaf_value(features);
        }
        margins
    }

    /// Class probabilities for one row
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let margins = self.margins(features);
        if self.objective.is_multiclass() {
            softmax(&margins)
        } else {
            let p = 1.0 / (1.0 + (-margins[0]).exp());
            vec![1.0 - p, p]
        }
    }

    /// Most likely class for one row; ties resolve to the lowest index
    pub fn predict_class(&self, features: &[f32]) -> usize {
        let margins = self.margins(features);
        if self.objective.is_multiclass() {
            argmax(&margins)
        } else {
            usize::from(margins[0] > 0.0)
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let document: ModelDocument = serde_json::from_slice(bytes)
            .map_err(|e| ClassifierError::Artifact(format!("invalid model JSON: {}", e)))?;
        Self::from_document(document)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.to_document())
            .map_err(|e| ClassifierError::Artifact(format!("failed to serialize model: {}", e)))
    }

    /// Persist as XGBoost-compatible JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClassifierError::Artifact(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let bytes = self.to_json_vec()?;
        std::fs::write(path, bytes)
            .map_err(|e| ClassifierError::Artifact(format!("failed to write {}: {}", path.display(), e)))
    }

    fn from_document(document: ModelDocument) -> Result<Self> {
        let learner = document.learner;
        let objective: Objective = learner.objective.name.parse()?;

        let model = match (learner.gradient_booster.name.as_str(), learner.gradient_booster.model) {
            ("gbtree", Some(model)) => model,
            (name, _) => {
                return Err(ClassifierError::Artifact(format!(
                    "unsupported booster '{}'",
                    name
                )))
            }
        };

        let params = &learner.learner_model_param;
        let num_features: usize = parse_param("num_feature", &params.num_feature)?;
        let declared_classes: usize = parse_param("num_class", &params.num_class)?;
        let base_scores = parse_base_score(&params.base_score)?;
        let num_classes = if objective.is_multiclass() { declared_classes } else { 2 };

        if model.trees.len() != model.tree_info.len() {
            return Err(ClassifierError::Artifact(format!(
                "model has {} trees but {} tree_info entries",
                model.trees.len(),
                model.tree_info.len()
            )));
        }

        let mut ensemble = Self::new(objective, num_features, num_classes, base_scores[0])?
            .with_base_scores(base_scores)?
            .with_feature_names(learner.feature_names, learner.feature_types)?;
        ensemble.attributes = learner.attributes;

        for (tree, group) in model.trees.into_iter().zip(model.tree_info) {
            ensemble.push_tree(tree.into_tree(num_features)?, group)?;
        }
        Ok(ensemble)
    }

    fn to_document(&self) -> ModelDocument {
        let trees = self
            .trees
            .iter()
            .enumerate()
            .map(|(id, tree)| TreeDocument::from_tree(id, tree, self.num_features))
            .collect();

        let declared_classes = if self.objective.is_multiclass() { self.num_groups } else { 0 };
        let mut objective_params = serde_json::Map::new();
        let param_key = if self.objective.is_multiclass() {
            objective_params.insert(
                "softmax_multiclass_param".to_string(),
                serde_json::json!({ "num_class": declared_classes.to_string() }),
            );
            None
        } else {
            Some("reg_loss_param")
        };
        if let Some(key) = param_key {
            objective_params.insert(
                key.to_string(),
                serde_json::json!({ "scale_pos_weight": "1" }),
            );
        }

        ModelDocument {
            learner: LearnerDocument {
                attributes: self.attributes.clone(),
                feature_names: self.feature_names.clone(),
                feature_types: self.feature_types.clone(),
                gradient_booster: BoosterDocument {
                    name: "gbtree".to_string(),
                    model: Some(GbTreeDocument {
                        gbtree_model_param: GbTreeModelParam {
                            num_parallel_tree: "1".to_string(),
                            num_trees: self.trees.len().to_string(),
                        },
                        trees,
                        tree_info: self.tree_groups.clone(),
                    }),
                },
                learner_model_param: LearnerModelParam {
                    base_score: format_base_score(&self.base_score),
                    boost_from_average: Some("1".to_string()),
                    num_class: declared_classes.to_string(),
                    num_feature: self.num_features.to_string(),
                    num_target: Some("1".to_string()),
                },
                objective: ObjectiveDocument {
                    name: self.objective.as_str().to_string(),
                    params: objective_params,
                },
            },
            version: XGBOOST_FORMAT_VERSION.to_vec(),
        }
    }
}

impl Classifier for TreeEnsemble {
    fn predict(&self, features: &EncodedFeatureVector) -> Result<usize> {
        if features.len() != self.num_features {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.num_features,
                actual: features.len(),
            });
        }
        Ok(self.predict_class(features.as_slice()))
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_classes(&self) -> Option<usize> {
        Some(TreeEnsemble::num_classes(self))
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn schema_fingerprint(&self) -> Option<&str> {
        self.attribute(SCHEMA_FINGERPRINT_ATTR)
    }
}

pub(crate) fn softmax(margins: &[f32]) -> Vec<f32> {
    let max = margins.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn stat(values: &[f32], i: usize) -> f32 {
    values.get(i).copied().unwrap_or(0.0)
}

fn parse_param<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ClassifierError::Artifact(format!("invalid model parameter {}='{}'", name, value))
    })
}

/// Accepts a bare number or a bracketed list with one entry per group
fn parse_base_score(value: &str) -> Result<Vec<f32>> {
    let inner = value.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|entry| parse_param("base_score", entry))
        .collect()
}

/// Equal intercepts collapse to the single-entry form
fn format_base_score(scores: &[f32]) -> String {
    let distinct = match scores.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s == first) => std::slice::from_ref(first),
        _ => scores,
    };
    let entries: Vec<String> = distinct.iter().map(|s| format!("{:E}", s)).collect();
    format!("[{}]", entries.join(","))
}

// Serialized layout

#[derive(Debug, Serialize, Deserialize)]
struct ModelDocument {
    learner: LearnerDocument,
    version: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LearnerDocument {
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    feature_types: Vec<String>,
    gradient_booster: BoosterDocument,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveDocument,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoosterDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<GbTreeDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GbTreeDocument {
    gbtree_model_param: GbTreeModelParam,
    trees: Vec<TreeDocument>,
    tree_info: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GbTreeModelParam {
    #[serde(default = "default_parallel_tree")]
    num_parallel_tree: String,
    num_trees: String,
}

fn default_parallel_tree() -> String {
    "1".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    boost_from_average: Option<String>,
    #[serde(default = "default_num_class")]
    num_class: String,
    num_feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_target: Option<String>,
}

fn default_num_class() -> String {
    "0".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectiveDocument {
    name: String,
    #[serde(flatten)]
    params: serde_json::Map<String, serde_json::Value>,
}

/// Older releases wrote `default_left` as booleans, newer ones as integers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeParam {
    #[serde(default = "default_zero")]
    num_deleted: String,
    num_feature: String,
    num_nodes: String,
    #[serde(default = "default_leaf_vector")]
    size_leaf_vector: String,
}

fn default_zero() -> String {
    "0".to_string()
}

fn default_leaf_vector() -> String {
    "1".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeDocument {
    #[serde(default)]
    base_weights: Vec<f32>,
    #[serde(default)]
    categories: Vec<i32>,
    #[serde(default)]
    categories_nodes: Vec<i32>,
    #[serde(default)]
    categories_segments: Vec<u64>,
    #[serde(default)]
    categories_sizes: Vec<u64>,
    default_left: Vec<Flag>,
    id: usize,
    left_children: Vec<i32>,
    #[serde(default)]
    loss_changes: Vec<f32>,
    #[serde(default)]
    parents: Vec<i32>,
    right_children: Vec<i32>,
    split_conditions: Vec<f32>,
    split_indices: Vec<u32>,
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    sum_hessian: Vec<f32>,
    tree_param: TreeParam,
}

impl TreeDocument {
    fn into_tree(self, num_features: usize) -> Result<RegressionTree> {
        let n = self.left_children.len();
        if [
            self.right_children.len(),
            self.split_conditions.len(),
            self.split_indices.len(),
            self.default_left.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(ClassifierError::Artifact(format!(
                "tree {} has node arrays of different lengths",
                self.id
            )));
        }
        if self.split_type.iter().any(|&t| t != 0) {
            return Err(ClassifierError::Artifact(format!(
                "tree {} uses categorical splits, which are not supported",
                self.id
            )));
        }

        let nodes = (0..n)
            .map(|i| TreeNode {
                left: self.left_children[i],
                right: self.right_children[i],
                parent: ROOT_PARENT,
                feature: self.split_indices[i],
                condition: self.split_conditions[i],
                default_left: self.default_left[i].is_set(),
                base_weight: stat(&self.base_weights, i),
                loss_change: stat(&self.loss_changes, i),
                sum_hessian: stat(&self.sum_hessian, i),
            })
            .collect();

        RegressionTree::new(nodes, num_features)
            .map_err(|e| ClassifierError::Artifact(format!("tree {}: {}", self.id, e)))
    }

    fn from_tree(id: usize, tree: &RegressionTree, num_features: usize) -> Self {
        let nodes = tree.nodes();
        Self {
            base_weights: nodes.iter().map(|n| n.base_weight).collect(),
            categories: Vec::new(),
            categories_nodes: Vec::new(),
            categories_segments: Vec::new(),
            categories_sizes: Vec::new(),
            default_left: nodes.iter().map(|n| Flag::Int(u8::from(n.default_left))).collect(),
            id,
            left_children: nodes.iter().map(|n| n.left).collect(),
            loss_changes: nodes.iter().map(|n| n.loss_change).collect(),
            parents: nodes.iter().map(|n| n.parent).collect(),
            right_children: nodes.iter().map(|n| n.right).collect(),
            split_conditions: nodes.iter().map(|n| n.condition).collect(),
            split_indices: nodes.iter().map(|n| n.feature).collect(),
            split_type: vec![0; nodes.len()],
            sum_hessian: nodes.iter().map(|n| n.sum_hessian).collect(),
            tree_param: TreeParam {
                num_deleted: "0".to_string(),
                num_feature: num_features.to_string(),
                num_nodes: nodes.len().to_string(),
                size_leaf_vector: "1".to_string(),
            },
        }
    }
}
