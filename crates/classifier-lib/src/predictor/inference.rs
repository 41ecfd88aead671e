//! ONNX inference using tract
//!
//! Serves tree ensembles exported to ONNX (e.g. an XGBoost classifier run
//! through onnxmltools). tract evaluates the `ai.onnx.ml` tree operators;
//! the first output is read as the predicted label, or as per-class scores
//! when the graph emits floats there.

use super::ensemble::argmax;
use super::Classifier;
use crate::error::{ClassifierError, Result};
use crate::models::EncodedFeatureVector;
use anyhow::Context;
use std::time::Instant;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::infer::Factoid;
use tract_onnx::tract_hir::internal::DimLike;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-backed classifier with a fixed `[1, num_features]` input
pub struct OnnxClassifier {
    model: TractModel,
    num_features: usize,
}

impl OnnxClassifier {
    /// Parse an ONNX graph; `fallback_width` is used only when the graph
    /// leaves its input width symbolic
    pub fn from_bytes(model_bytes: &[u8], fallback_width: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")
            .map_err(|e| ClassifierError::Artifact(format!("{:#}", e)))?;
        Self::from_inference_model(model, fallback_width)
    }

    fn from_inference_model(model: InferenceModel, fallback_width: usize) -> Result<Self> {
        let num_features = declared_width(&model).unwrap_or(fallback_width);
        let model = Self::optimize(model, num_features)
            .map_err(|e| ClassifierError::Artifact(format!("{:#}", e)))?;
        Ok(Self {
            model,
            num_features,
        })
    }

    /// Pin the input to `[1, num_features]` and optimize
    fn optimize(model: InferenceModel, num_features: usize) -> anyhow::Result<TractModel> {
        let model = model
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn to_tensor(&self, features: &EncodedFeatureVector) -> Result<Tensor> {
        let array = tract_ndarray::Array2::from_shape_vec(
            (1, self.num_features),
            features.as_slice().to_vec(),
        )
        .map_err(|e| ClassifierError::Artifact(format!("failed to build input tensor: {}", e)))?;
        Ok(array.into())
    }
}

/// Width of the graph's first input when its last dimension is concrete
fn declared_width(model: &InferenceModel) -> Option<usize> {
    let fact = model.input_fact(0).ok()?;
    let last = fact.shape.dims().last()?;
    last.concretize()?.to_usize().ok()
}

/// Read the class from the first model output
fn decode_class(output: &Tensor) -> Result<usize> {
    if let Ok(labels) = output.to_array_view::<i64>() {
        let label = labels
            .iter()
            .next()
            .copied()
            .ok_or_else(|| ClassifierError::Artifact("model returned no label".to_string()))?;
        return usize::try_from(label)
            .map_err(|_| ClassifierError::Artifact(format!("model returned negative label {}", label)));
    }

    let scores: Vec<f32> = output
        .to_array_view::<f32>()
        .map_err(|e| ClassifierError::Artifact(format!("unexpected model output: {}", e)))?
        .iter()
        .copied()
        .collect();
    if scores.is_empty() {
        return Err(ClassifierError::Artifact("model returned no scores".to_string()));
    }
    Ok(argmax(&scores))
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &EncodedFeatureVector) -> Result<usize> {
        if features.len() != self.num_features {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.num_features,
                actual: features.len(),
            });
        }

        let start = Instant::now();
        let input = self.to_tensor(features)?;
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Artifact(format!("ONNX inference failed: {}", e)))?;
        let output = result
            .first()
            .ok_or_else(|| ClassifierError::Artifact("No output from model".to_string()))?;
        let class = decode_class(output)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(class)
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_classes(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ModelArtifact;
    use crate::schema::PENGUIN_SCHEMA;

    #[test]
    fn test_rejects_invalid_bytes() {
        let err = OnnxClassifier::from_bytes(b"definitely not protobuf", 10)
            .err()
            .expect("garbage should not load");
        assert!(matches!(err, ClassifierError::Artifact(_)));
    }

    /// Graph that passes its `[1, width]` input straight through
    fn passthrough(input: InferenceFact) -> InferenceModel {
        let mut model = InferenceModel::default();
        let source = model.add_source("input", input).unwrap();
        model.set_output_outlets(&[source]).unwrap();
        model
    }

    #[test]
    fn test_declared_width_is_kept() {
        let classifier =
            OnnxClassifier::from_inference_model(passthrough(f32::fact([1, 7]).into()), 10).unwrap();
        assert_eq!(classifier.num_features(), 7);

        let err = ModelArtifact::from_classifier(Box::new(classifier), &PENGUIN_SCHEMA).unwrap_err();
        assert!(matches!(err, ClassifierError::ShapeMismatch { expected: 7, actual: 10 }));
    }

    #[test]
    fn test_unknown_width_uses_fallback() {
        let classifier =
            OnnxClassifier::from_inference_model(passthrough(InferenceFact::default()), 10).unwrap();
        assert_eq!(classifier.num_features(), 10);
    }

    #[test]
    fn test_decode_label_output() {
        let tensor = Tensor::from(tract_ndarray::arr1(&[2i64]));
        assert_eq!(decode_class(&tensor).unwrap(), 2);
    }

    #[test]
    fn test_decode_score_output() {
        let tensor = Tensor::from(tract_ndarray::arr2(&[[0.1f32, 0.7, 0.2]]));
        assert_eq!(decode_class(&tensor).unwrap(), 1);
    }

    #[test]
    fn test_decode_negative_label() {
        let tensor = Tensor::from(tract_ndarray::arr1(&[-1i64]));
        assert!(decode_class(&tensor).is_err());
    }
}
