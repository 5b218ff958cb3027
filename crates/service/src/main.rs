//! Learner ML service
//!
//! Serves the persona classifier and weekly insight generator over HTTP.

use anyhow::Result;
use learner_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    registry::{ModelRegistry, ModelState},
};
use learner_service::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load()?;

    // Initialize tracing with env filter, falling back to the configured level
    let json = config.log_format == "json";
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().pretty()))
        .init();

    info!(
        app = %config.app_name,
        environment = %config.environment,
        "Starting learner-service"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::API).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.app_name);

    let paths = config.model_paths();
    info!(model_dir = %config.model_dir.display(), "Model paths resolved");
    let registry = Arc::new(ModelRegistry::from_paths(&paths));

    let states = if config.preload_models {
        // Artifact parsing and graph optimization block
        let preload = Arc::clone(&registry);
        tokio::task::spawn_blocking(move || preload.preload()).await?
    } else {
        registry.states()
    };

    health_registry.record_models(&states).await;
    for (name, state) in &states {
        logger.log_model_state(name, *state != ModelState::Failed);
    }
    let infos = registry.model_infos();
    metrics.set_models_loaded(infos.len() as i64);
    for info in &infos {
        metrics.set_model_version(&info.name, &info.version);
    }

    let ready = states.iter().filter(|(_, s)| *s == ModelState::Ready).count();
    if config.preload_models && ready < states.len() {
        warn!(ready, total = states.len(), "Some artifacts failed to load");
    }

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
        registry,
        config.is_production(),
    ));

    health_registry.set_ready(true).await;
    logger.log_startup(&config.app_version, &config.environment, ready, states.len());

    let shutdown_logger = logger.clone();
    api::serve(&config, app_state, async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await
            }
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
