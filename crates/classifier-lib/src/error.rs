//! Error taxonomy for the classifier
//!
//! Startup errors (configuration, artifact, column drift) are fatal; the rest
//! are per-request and are converted to a structured response by the gateway.

use thiserror::Error;

/// Errors raised by schema, encoding, artifact and service code
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Required external parameter missing or unusable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Artifact file unreadable or malformed
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Observation failed input validation
    #[error("invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Encoded vector width disagrees with the artifact's input width
    #[error("feature vector has {actual} columns but the model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Artifact feature names disagree with the schema columns
    #[error("model column {position} is '{found}' but the schema expects '{expected}'")]
    ColumnMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    /// Model produced a class index outside the label table
    #[error("predicted class index {index} is outside the label table of {num_labels} species")]
    LabelIndex { index: usize, num_labels: usize },

    /// Training dataset unreadable or malformed
    #[error("dataset error: {0}")]
    Dataset(String),
}

impl ClassifierError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that point at a deployment bug rather than bad input
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::ColumnMismatch { .. } | Self::LabelIndex { .. }
        )
    }

    /// Stable label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Artifact(_) => "artifact",
            Self::Validation { .. } => "validation",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::ColumnMismatch { .. } => "column_mismatch",
            Self::LabelIndex { .. } => "label_index",
            Self::Dataset(_) => "dataset",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_systemic_classification() {
        assert!(ClassifierError::ShapeMismatch { expected: 10, actual: 9 }.is_systemic());
        assert!(ClassifierError::LabelIndex { index: 3, num_labels: 3 }.is_systemic());
        assert!(!ClassifierError::validation("island", "unknown").is_systemic());
        assert!(!ClassifierError::Artifact("bad".into()).is_systemic());
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = ClassifierError::validation("island", "'Atlantis' is not one of [Biscoe, Dream, Torgersen]");
        let msg = err.to_string();
        assert!(msg.contains("island"));
        assert!(msg.contains("Atlantis"));
        assert_eq!(err.kind(), "validation");
    }
}
