//! HTTP API: prediction and insight endpoints, health checks and Prometheus metrics

use crate::auth::{require_api_key, ApiKey};
use crate::config::ServiceConfig;
use crate::error::{ApiError, Operation};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use learner_lib::{
    health::{ComponentStatus, HealthRegistry},
    insight::{performance_levels, InsightAggregator, InsightReport, InsightRequest},
    observability::{ServiceMetrics, StructuredLogger},
    persona::{PersonaClassifier, PersonaPrediction, PERSONA_CLASSES},
    registry::ModelRegistry,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub registry: Arc<ModelRegistry>,
    pub classifier: Arc<PersonaClassifier>,
    pub insights: Arc<InsightAggregator>,
    /// Hide internal error details from responses
    pub redact_errors: bool,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        registry: Arc<ModelRegistry>,
        redact_errors: bool,
    ) -> Self {
        let classifier = Arc::new(PersonaClassifier::new(registry.clone(), metrics.clone()));
        let insights = Arc::new(InsightAggregator::new(registry.clone(), metrics.clone()));
        Self {
            health_registry,
            metrics,
            logger,
            registry,
            classifier,
            insights,
            redact_errors,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PersonaRequest {
    pub features: Map<String, Value>,
}

/// Sync artifact components with the registry, which also sees lazy loads
async fn refresh_model_health(state: &AppState) {
    state
        .health_registry
        .record_models(&state.registry.states())
        .await;
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    refresh_model_health(&state).await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving the other endpoints
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    refresh_model_health(&state).await;
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn predict_persona(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PersonaRequest>, JsonRejection>,
) -> Result<Json<PersonaPrediction>, ApiError> {
    let Json(request) = payload?;
    info!("Persona prediction request received");

    // Inference is CPU bound
    let classifier = state.classifier.clone();
    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&request.features))
        .await
        .map_err(|e| ApiError::task_failed(Operation::Prediction, e))?
        .map_err(|e| ApiError::from_service(e, Operation::Prediction, state.redact_errors))?;

    state.logger.log_persona_prediction(
        prediction.persona.as_str(),
        prediction.confidence,
        &prediction.model_version,
    );
    Ok(Json(prediction))
}

async fn persona_labels() -> impl IntoResponse {
    let personas: Vec<Value> = PERSONA_CLASSES
        .iter()
        .map(|p| json!({ "label": p.as_str(), "description": p.description() }))
        .collect();
    Json(json!({ "personas": personas }))
}

async fn weekly_insights(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InsightRequest>, JsonRejection>,
) -> Result<Json<InsightReport>, ApiError> {
    let Json(request) = payload?;
    info!("Generating weekly insights");

    let insights = state.insights.clone();
    let report = tokio::task::spawn_blocking(move || insights.generate(&request))
        .await
        .map_err(|e| ApiError::task_failed(Operation::Insight, e))?
        .map_err(|e| ApiError::from_service(e, Operation::Insight, state.redact_errors))?;

    state.logger.log_insight(
        report.performance_level.as_str(),
        report.engagement_score,
        report.improvement_rate,
    );
    Ok(Json(report))
}

async fn levels() -> impl IntoResponse {
    Json(json!({ "levels": performance_levels() }))
}

async fn models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let states: Map<String, Value> = state
        .registry
        .names()
        .filter_map(|name| {
            let model_state = state.registry.state(name)?;
            Some((name.to_string(), json!(model_state)))
        })
        .collect();

    Json(json!({
        "models": state.registry.model_infos(),
        "states": states,
    }))
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not Found")
}

/// Give framework-generated errors the `{"detail"}` body
async fn detail_envelope(response: Response) -> Response {
    match response.status() {
        StatusCode::REQUEST_TIMEOUT => {
            ApiError::new(StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
        }
        StatusCode::METHOD_NOT_ALLOWED => {
            ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
        }
        _ => response,
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, config: &ServiceConfig) -> Router {
    let api = Router::new()
        .route("/predict/persona", post(predict_persona))
        .route("/predict/persona/labels", get(persona_labels))
        .route("/insights/weekly", post(weekly_insights))
        .route("/insights/performance-levels", get(levels))
        .route("/models", get(models))
        .route_layer(middleware::from_fn_with_state(
            ApiKey::new(&config.api_key),
            require_api_key,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_request_size))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(middleware::map_response(detail_envelope))
        .layer(cors_layer(&config.cors_origins()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    config: &ServiceConfig,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state, config);

    let addr = config.bind_addr();
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
