//! Shared fixtures for unit tests

use crate::models::RawObservation;
use crate::predictor::{Objective, RegressionTree, TreeEnsemble, TreeNode, SCHEMA_FINGERPRINT_ATTR};
use crate::schema::PENGUIN_SCHEMA;

const BILL_LENGTH: u32 = 0;
const BILL_DEPTH: u32 = 1;

fn tree(nodes: Vec<TreeNode>) -> RegressionTree {
    RegressionTree::new(nodes, PENGUIN_SCHEMA.width()).unwrap()
}

/// Hand-built three-class ensemble over the penguin schema
///
/// Short bills vote Adelie, long bills with deep bills vote Chinstrap and
/// shallow bills vote Gentoo.
pub fn penguin_ensemble() -> TreeEnsemble {
    let mut ensemble = TreeEnsemble::new(Objective::MultiSoftprob, PENGUIN_SCHEMA.width(), 3, 0.5)
        .unwrap()
        .with_feature_names(PENGUIN_SCHEMA.columns(), vec!["float".to_string(); 10])
        .unwrap();
    ensemble.set_attribute(SCHEMA_FINGERPRINT_ATTR, PENGUIN_SCHEMA.fingerprint());

    let adelie = tree(vec![
        TreeNode::split(BILL_LENGTH, 44.0, 1, 2),
        TreeNode::leaf(1.5, 1.5, 1.0),
        TreeNode::leaf(-1.0, -1.0, 1.0),
    ]);
    let chinstrap = tree(vec![
        TreeNode::split(BILL_LENGTH, 44.0, 1, 2),
        TreeNode::leaf(-1.0, -1.0, 1.0),
        TreeNode::split(BILL_DEPTH, 16.0, 3, 4),
        TreeNode::leaf(-1.0, -1.0, 1.0),
        TreeNode::leaf(2.0, 2.0, 1.0),
    ]);
    let gentoo = tree(vec![
        TreeNode::split(BILL_DEPTH, 16.0, 1, 2),
        TreeNode::leaf(2.0, 2.0, 1.0),
        TreeNode::leaf(-1.0, -1.0, 1.0),
    ]);

    ensemble.push_tree(adelie, 0).unwrap();
    ensemble.push_tree(chinstrap, 1).unwrap();
    ensemble.push_tree(gentoo, 2).unwrap();
    ensemble
}

pub fn observation(
    bill_length_mm: f64,
    bill_depth_mm: f64,
    sex: &str,
    island: &str,
) -> RawObservation {
    RawObservation {
        bill_length_mm,
        bill_depth_mm,
        flipper_length_mm: 190.0,
        body_mass_g: 4000.0,
        year: 2008,
        sex: sex.to_string(),
        island: island.to_string(),
    }
}
