//! HTTP API: prediction, liveness, readiness and Prometheus metrics

use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use classifier_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{ClassifierMetrics, StructuredLogger},
    Prediction, PredictionService, RawObservation,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: PredictionService,
    pub health_registry: HealthRegistry,
    pub metrics: ClassifierMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        service: PredictionService,
        health_registry: HealthRegistry,
        metrics: ClassifierMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
            logger,
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Penguin Classification API running." }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 200 while healthy or degraded, 503 once a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawObservation>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let started = Instant::now();

    let result = match payload {
        Ok(Json(observation)) => state.service.classify(&observation).map_err(ApiError::from),
        Err(rejection) => Err(ApiError::MalformedBody(rejection.body_text())),
    };

    match result {
        Ok(prediction) => {
            let elapsed = started.elapsed().as_secs_f64();
            state.metrics.observe_prediction_latency(elapsed);
            state.metrics.inc_predictions(prediction.species);
            state
                .logger
                .log_prediction(prediction.prediction, prediction.species, elapsed);
            Ok(Json(prediction))
        }
        Err(err) => {
            state.metrics.inc_errors(err.kind());
            match &err {
                ApiError::Classifier(e) => {
                    state.logger.log_rejection(e);
                    if e.is_systemic() {
                        state
                            .health_registry
                            .set_degraded(components::CLASSIFIER, e.to_string())
                            .await;
                    }
                }
                ApiError::MalformedBody(reason) => {
                    info!(event = "prediction_rejected", kind = err.kind(), error = %reason, "Malformed prediction request");
                }
            }
            Err(err)
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %listener.local_addr()?, "Starting API server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
