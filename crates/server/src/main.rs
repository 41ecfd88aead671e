//! Penguin classification server
//!
//! Loads the model artifact once at startup, then serves predictions,
//! health checks and metrics until interrupted.

use anyhow::Result;
use classifier_lib::{
    health::{components, HealthRegistry},
    observability::{ClassifierMetrics, StructuredLogger},
    ModelArtifact, PredictionService, PENGUIN_SCHEMA,
};
use penguin_server::{api, AppState, ServerConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, RUST_LOG overrides the default level
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting penguin-server");

    let config = ServerConfig::load()?;
    info!(model_path = %config.model_path().display(), addr = %config.bind_addr(), "Server configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL).await;
    health_registry.register(components::CLASSIFIER).await;

    let metrics = ClassifierMetrics::new();
    let logger = StructuredLogger::new("penguin-server");

    // tract optimizes ONNX graphs on load, so keep it off the async workers
    let model_path = config.model_path().to_path_buf();
    let loaded = tokio::task::spawn_blocking(move || ModelArtifact::load(&model_path, &PENGUIN_SCHEMA)).await?;
    let artifact = match loaded {
        Ok(artifact) => artifact,
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Failed to load model artifact");
            health_registry.set_unhealthy(components::MODEL, e.to_string()).await;
            return Err(e.into());
        }
    };

    logger.log_model_loaded(artifact.info());
    metrics.set_model_info(artifact.info());
    health_registry.set_model(artifact.info()).await;

    let service = PredictionService::new(Arc::new(artifact), PENGUIN_SCHEMA)?;
    let app_state = Arc::new(AppState::new(
        service,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    health_registry.set_ready(true).await;
    logger.log_startup(SERVER_VERSION, &config.bind_addr());

    let shutdown_logger = logger.clone();
    api::serve(listener, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
