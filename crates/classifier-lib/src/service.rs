//! Prediction service: validate, encode, predict, label

use crate::error::{ClassifierError, Result};
use crate::models::{EncodedFeatureVector, Prediction, RawObservation, SpeciesLabel};
use crate::predictor::{FeatureEncoder, ModelArtifact};
use crate::schema::SchemaDefinition;
use std::sync::Arc;
use tracing::{debug, error};

/// Classifies single observations against one loaded artifact
///
/// Holds only immutable state, so a single instance can be shared across
/// any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: Arc<ModelArtifact>,
    encoder: FeatureEncoder,
}

impl PredictionService {
    /// Build a service around an already-loaded artifact
    ///
    /// Fails if the schema is internally inconsistent, if the artifact's
    /// width disagrees with it, or if the artifact can emit more classes
    /// than there are species labels.
    pub fn new(artifact: Arc<ModelArtifact>, schema: SchemaDefinition) -> Result<Self> {
        schema.verify_coverage()?;

        if artifact.num_features() != schema.width() {
            return Err(ClassifierError::ShapeMismatch {
                expected: artifact.num_features(),
                actual: schema.width(),
            });
        }
        if let Some(classes) = artifact.num_classes() {
            if classes > SpeciesLabel::ALL.len() {
                return Err(ClassifierError::Configuration(format!(
                    "model predicts {} classes but only {} species labels are known",
                    classes,
                    SpeciesLabel::ALL.len()
                )));
            }
        }

        Ok(Self {
            artifact,
            encoder: FeatureEncoder::new(schema),
        })
    }

    pub fn schema(&self) -> &SchemaDefinition {
        self.encoder.schema()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Validate and encode without predicting
    pub fn encode(&self, observation: &RawObservation) -> Result<EncodedFeatureVector> {
        self.encoder.schema().validate(observation)?;
        self.encoder.encode(observation)
    }

    pub fn classify(&self, observation: &RawObservation) -> Result<Prediction> {
        let features = self.encode(observation)?;

        let result = self
            .artifact
            .predict(&features)
            .and_then(|index| SpeciesLabel::from_index(index).map(|species| (index, species)));

        match result {
            Ok((prediction, species)) => {
                debug!(prediction, species = %species, "Observation classified");
                Ok(Prediction {
                    prediction,
                    species,
                })
            }
            Err(e) => {
                if e.is_systemic() {
                    error!(
                        error = %e,
                        kind = e.kind(),
                        sha256 = %self.artifact.info().short_checksum(),
                        "Model and schema disagree; check the deployed artifact"
                    );
                }
                Err(e)
            }
        }
    }
}
