//! Penguin species classification library
//!
//! This crate provides the core functionality for:
//! - The shared feature schema and one-hot feature encoding
//! - Loading and evaluating gradient-boosted tree models (XGBoost JSON or ONNX)
//! - The prediction service used by the HTTP gateway and the CLI
//! - Offline training that writes models in the same format
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;
pub mod service;
pub mod training;

#[cfg(test)]
mod test_support;

pub use error::{ClassifierError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ModelSummary,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{ClassifierMetrics, StructuredLogger};
pub use predictor::{FeatureEncoder, ModelArtifact};
pub use schema::{SchemaDefinition, PENGUIN_SCHEMA};
pub use service::PredictionService;
pub use training::{TrainingConfig, TrainingPipeline, TrainingReport};
