//! Observability for the classifier
//!
//! Provides:
//! - Prometheus metrics (prediction latency, predictions per species, errors per kind, model info)
//! - Event-tagged structured logging with tracing

use crate::error::ClassifierError;
use crate::models::SpeciesLabel;
use crate::predictor::ArtifactInfo;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, GaugeVec, Histogram,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for single-row inference (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Registered once per process; `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<ClassifierMetricsInner>> = OnceLock::new();

struct ClassifierMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    model_info: GaugeVec,
}

impl ClassifierMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            prediction_latency_seconds: register_histogram!(
                "penguin_prediction_latency_seconds",
                "Time spent validating, encoding and classifying one observation",
                LATENCY_BUCKETS.to_vec()
            )?,
            predictions_total: register_int_counter_vec!(
                "penguin_predictions_total",
                "Predictions served, by species",
                &["species"]
            )?,
            prediction_errors_total: register_int_counter_vec!(
                "penguin_prediction_errors_total",
                "Rejected prediction requests, by error kind",
                &["kind"]
            )?,
            model_info: register_gauge_vec!(
                "penguin_model_info",
                "Currently loaded model artifact",
                &["format", "sha256"]
            )?,
        })
    }
}

/// Handle to the process-wide classifier metrics
///
/// Clones share the same underlying metrics. If registration failed the
/// handle still works but records nothing.
#[derive(Clone)]
pub struct ClassifierMetrics {
    _private: (),
}

impl Default for ClassifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match ClassifierMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register classifier metrics");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&ClassifierMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner.prediction_latency_seconds.observe(duration_secs);
        }
    }

    pub fn inc_predictions(&self, species: SpeciesLabel) {
        if let Some(inner) = self.inner() {
            inner
                .predictions_total
                .with_label_values(&[species.as_str()])
                .inc();
        }
    }

    pub fn inc_errors(&self, kind: &str) {
        if let Some(inner) = self.inner() {
            inner.prediction_errors_total.with_label_values(&[kind]).inc();
        }
    }

    /// Replace the model info series with the given artifact
    pub fn set_model_info(&self, info: &ArtifactInfo) {
        if let Some(inner) = self.inner() {
            inner.model_info.reset();
            inner
                .model_info
                .with_label_values(&[info.format.as_str(), info.short_checksum()])
                .set(1.0);
        }
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            addr = %addr,
            "Penguin classification service started"
        );
    }

    pub fn log_model_loaded(&self, info: &ArtifactInfo) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = ?info.path,
            format = %info.format,
            sha256 = %info.sha256,
            size_bytes = info.size_bytes,
            num_features = info.num_features,
            num_classes = ?info.num_classes,
            "Model artifact ready"
        );
    }

    pub fn log_prediction(&self, prediction: usize, species: SpeciesLabel, latency_secs: f64) {
        info!(
            event = "prediction_served",
            service = %self.service,
            prediction = prediction,
            species = %species,
            latency_ms = latency_secs * 1000.0,
            "Prediction served"
        );
    }

    /// Validation failures are routine; systemic failures mean the
    /// deployed model and schema disagree
    pub fn log_rejection(&self, err: &ClassifierError) {
        if err.is_systemic() {
            error!(
                event = "prediction_rejected",
                service = %self.service,
                kind = err.kind(),
                error = %err,
                "Prediction failed on a model/schema inconsistency"
            );
        } else {
            info!(
                event = "prediction_rejected",
                service = %self.service,
                kind = err.kind(),
                error = %err,
                "Prediction request rejected"
            );
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Penguin classification service shutting down"
        );
    }

    pub fn log_training_completed(
        &self,
        output: &str,
        train_rows: usize,
        test_rows: usize,
        train_f1: f64,
        test_f1: f64,
    ) {
        info!(
            event = "training_completed",
            service = %self.service,
            output = %output,
            train_rows = train_rows,
            test_rows = test_rows,
            train_f1 = train_f1,
            test_f1 = test_f1,
            "Model trained and saved"
        );
    }
}
