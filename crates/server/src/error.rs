//! Conversion of request failures into `{ "error": ... }` responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use classifier_lib::{ClassifierError, ErrorResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Body was not a JSON observation
    #[error("malformed request: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MalformedBody(_) => "malformed_request",
            ApiError::Classifier(e) => e.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Classifier(e) if e.is_systemic() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Classifier(ClassifierError::Validation { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Classifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Systemic details stay in the logs
        let error = match &self {
            ApiError::Classifier(e) if e.is_systemic() => {
                "model and feature schema are inconsistent; see server logs".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::MalformedBody("expected value".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ClassifierError::validation("island", "unknown")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ClassifierError::ShapeMismatch {
                expected: 10,
                actual: 9
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ClassifierError::LabelIndex {
                index: 3,
                num_labels: 3
            })
            .kind(),
            "label_index"
        );
    }
}
