//! Model artifact loading
//!
//! Artifacts are read once at startup from a local path. Before the handle
//! is returned, the model's input width, recorded feature names and schema
//! fingerprint are checked against the serving schema, so any drift between
//! training and serving stops the process instead of producing silent
//! mispredictions.

use super::ensemble::TreeEnsemble;
use super::inference::OnnxClassifier;
use super::Classifier;
use crate::error::{ClassifierError, Result};
use crate::models::EncodedFeatureVector;
use crate::schema::SchemaDefinition;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Largest artifact file accepted
pub const MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

/// Serialized model formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// XGBoost JSON model, evaluated natively
    XgboostJson,
    /// ONNX graph, evaluated with tract
    Onnx,
    /// Built in process rather than read from a file
    InMemory,
}

impl ArtifactFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(Self::XgboostJson),
            Some("onnx") => Ok(Self::Onnx),
            _ => Err(ClassifierError::Artifact(format!(
                "cannot infer model format of {} (expected .json or .onnx)",
                path.display()
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XgboostJson => "xgboost_json",
            Self::Onnx => "onnx",
            Self::InMemory => "in_memory",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata about a loaded artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    /// Source file, absent for models built in memory
    pub path: Option<PathBuf>,
    pub format: ArtifactFormat,
    /// SHA-256 of the serialized bytes
    pub sha256: String,
    pub size_bytes: u64,
    pub num_features: usize,
    pub num_classes: Option<usize>,
}

impl ArtifactInfo {
    /// First 12 hex digits of the checksum, for logs and metric labels
    pub fn short_checksum(&self) -> &str {
        &self.sha256[..self.sha256.len().min(12)]
    }
}

/// Immutable trained classifier
pub struct ModelArtifact {
    classifier: Box<dyn Classifier>,
    info: ArtifactInfo,
}

impl ModelArtifact {
    /// Load an artifact from a local file and check it against `schema`
    pub fn load(path: &Path, schema: &SchemaDefinition) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| {
            ClassifierError::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_ARTIFACT_BYTES {
            return Err(ClassifierError::Artifact(format!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                metadata.len(),
                MAX_ARTIFACT_BYTES
            )));
        }

        let format = ArtifactFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|e| {
            ClassifierError::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;

        let classifier: Box<dyn Classifier> = match format {
            ArtifactFormat::XgboostJson => Box::new(TreeEnsemble::from_json_slice(&bytes)?),
            ArtifactFormat::Onnx => Box::new(OnnxClassifier::from_bytes(&bytes, schema.width())?),
            ArtifactFormat::InMemory => {
                return Err(ClassifierError::Artifact(format!(
                    "{} has no file format",
                    path.display()
                )))
            }
        };

        verify_against_schema(classifier.as_ref(), schema)?;

        let info = ArtifactInfo {
            path: Some(path.to_path_buf()),
            format,
            sha256: checksum(&bytes),
            size_bytes: bytes.len() as u64,
            num_features: classifier.num_features(),
            num_classes: classifier.num_classes(),
        };

        info!(
            path = %path.display(),
            format = %info.format,
            sha256 = %info.sha256,
            num_features = info.num_features,
            "Model artifact loaded"
        );

        Ok(Self { classifier, info })
    }

    /// Wrap an in-memory ensemble with the same checks as [`ModelArtifact::load`]
    pub fn from_ensemble(ensemble: TreeEnsemble, schema: &SchemaDefinition) -> Result<Self> {
        verify_against_schema(&ensemble, schema)?;
        let bytes = ensemble.to_json_vec()?;
        let info = ArtifactInfo {
            path: None,
            format: ArtifactFormat::XgboostJson,
            sha256: checksum(&bytes),
            size_bytes: bytes.len() as u64,
            num_features: ensemble.num_features(),
            num_classes: Some(ensemble.num_classes()),
        };
        Ok(Self {
            classifier: Box::new(ensemble),
            info,
        })
    }

    /// Wrap any classifier with the same schema checks; no checksum is recorded
    pub fn from_classifier(classifier: Box<dyn Classifier>, schema: &SchemaDefinition) -> Result<Self> {
        verify_against_schema(classifier.as_ref(), schema)?;
        let info = ArtifactInfo {
            path: None,
            format: ArtifactFormat::InMemory,
            sha256: String::new(),
            size_bytes: 0,
            num_features: classifier.num_features(),
            num_classes: classifier.num_classes(),
        };
        Ok(Self { classifier, info })
    }

    pub fn predict(&self, features: &EncodedFeatureVector) -> Result<usize> {
        self.classifier.predict(features)
    }

    pub fn info(&self) -> &ArtifactInfo {
        &self.info
    }

    pub fn num_features(&self) -> usize {
        self.classifier.num_features()
    }

    pub fn num_classes(&self) -> Option<usize> {
        self.classifier.num_classes()
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact").field("info", &self.info).finish()
    }
}

fn verify_against_schema(classifier: &dyn Classifier, schema: &SchemaDefinition) -> Result<()> {
    let columns = schema.columns();
    if classifier.num_features() != columns.len() {
        return Err(ClassifierError::ShapeMismatch {
            expected: classifier.num_features(),
            actual: columns.len(),
        });
    }

    for (position, (expected, found)) in columns.iter().zip(classifier.feature_names()).enumerate() {
        if expected != found {
            return Err(ClassifierError::ColumnMismatch {
                position,
                expected: expected.clone(),
                found: found.clone(),
            });
        }
    }

    if let Some(recorded) = classifier.schema_fingerprint() {
        let current = schema.fingerprint();
        if recorded != current {
            return Err(ClassifierError::Artifact(format!(
                "model was trained with feature schema {} but the service uses {} (v{})",
                recorded,
                current,
                schema.version()
            )));
        }
    }
    Ok(())
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
