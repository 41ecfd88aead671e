//! ML prediction engine

mod artifact;
mod ensemble;
mod features;
mod inference;

pub use artifact::{ArtifactFormat, ArtifactInfo, ModelArtifact, MAX_ARTIFACT_BYTES};
pub use ensemble::{
    Objective, RegressionTree, TreeEnsemble, TreeNode, SCHEMA_FINGERPRINT_ATTR,
    SCHEMA_VERSION_ATTR,
};
pub use features::{reindex, FeatureEncoder};
pub use inference::OnnxClassifier;

pub(crate) use ensemble::softmax;

use crate::error::Result;
use crate::models::EncodedFeatureVector;

/// Trait for loaded classifiers
///
/// Implementations are immutable after construction and are shared across
/// concurrent requests without locking.
pub trait Classifier: Send + Sync {
    /// Predict the class index for one encoded row
    fn predict(&self, features: &EncodedFeatureVector) -> Result<usize>;

    /// Input width the model was trained with
    fn num_features(&self) -> usize;

    /// Number of classes, when the model records it
    fn num_classes(&self) -> Option<usize>;

    /// Training-time column names, empty when not recorded
    fn feature_names(&self) -> &[String] {
        &[]
    }

    /// Feature schema fingerprint recorded at training time
    fn schema_fingerprint(&self) -> Option<&str> {
        None
    }
}
