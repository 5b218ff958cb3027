//! Observability infrastructure for the learner ML service
//!
//! Provides:
//! - Prometheus metrics (inference latency, prediction outcomes, degradations)
//! - Structured logging of service events with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    inference_latency_seconds: Histogram,
    predictions: IntCounterVec,
    unknown_labels: IntCounter,
    probability_fallbacks: IntCounter,
    comparison_failures: IntCounter,
    validation_errors: IntCounter,
    inference_errors: IntCounter,
    insights_generated: IntCounterVec,
    models_loaded: IntGauge,
    model_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "learner_ml_inference_latency_seconds",
                "Time spent scaling features and running the persona classifier",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            predictions: register_int_counter_vec!(
                "learner_ml_predictions_total",
                "Persona predictions served, by resolved persona",
                &["persona"]
            )
            .expect("Failed to register predictions_total"),

            unknown_labels: register_int_counter!(
                "learner_ml_unknown_labels_total",
                "Predictions whose raw label did not map to a known persona"
            )
            .expect("Failed to register unknown_labels_total"),

            probability_fallbacks: register_int_counter!(
                "learner_ml_probability_fallbacks_total",
                "Predictions served with the default confidence of 1.0"
            )
            .expect("Failed to register probability_fallbacks_total"),

            comparison_failures: register_int_counter!(
                "learner_ml_comparison_failures_total",
                "Previous-period scorings that failed and reported no improvement"
            )
            .expect("Failed to register comparison_failures_total"),

            validation_errors: register_int_counter!(
                "learner_ml_validation_errors_total",
                "Requests rejected for missing or non-numeric features"
            )
            .expect("Failed to register validation_errors_total"),

            inference_errors: register_int_counter!(
                "learner_ml_inference_errors_total",
                "Predictor, scaler or scorer failures"
            )
            .expect("Failed to register inference_errors_total"),

            insights_generated: register_int_counter_vec!(
                "learner_ml_insights_generated_total",
                "Weekly insights generated, by performance level",
                &["performance_level"]
            )
            .expect("Failed to register insights_generated_total"),

            models_loaded: register_int_gauge!(
                "learner_ml_models_loaded",
                "Number of artifacts currently loaded in the registry"
            )
            .expect("Failed to register models_loaded"),

            model_version_info: register_gauge_vec!(
                "learner_ml_model_version_info",
                "Information about the loaded artifacts",
                &["model", "version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, persona: &str) {
        self.inner().predictions.with_label_values(&[persona]).inc();
    }

    pub fn inc_unknown_labels(&self) {
        self.inner().unknown_labels.inc();
    }

    pub fn inc_probability_fallbacks(&self) {
        self.inner().probability_fallbacks.inc();
    }

    pub fn inc_comparison_failures(&self) {
        self.inner().comparison_failures.inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors.inc();
    }

    pub fn inc_inference_errors(&self) {
        self.inner().inference_errors.inc();
    }

    pub fn inc_insights(&self, performance_level: &str) {
        self.inner()
            .insights_generated
            .with_label_values(&[performance_level])
            .inc();
    }

    pub fn set_models_loaded(&self, count: i64) {
        self.inner().models_loaded.set(count);
    }

    pub fn set_model_version(&self, model: &str, version: &str) {
        self.inner()
            .model_version_info
            .with_label_values(&[model, version])
            .set(1.0);
    }

    pub fn unknown_labels(&self) -> u64 {
        self.inner().unknown_labels.get()
    }

    pub fn probability_fallbacks(&self) -> u64 {
        self.inner().probability_fallbacks.get()
    }

    pub fn comparison_failures(&self) -> u64 {
        self.inner().comparison_failures.get()
    }
}

/// Structured logger for service events
///
/// Emits consistently named tracing events so logs can be filtered by
/// `event` regardless of the formatter in use.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, environment: &str, models_ready: usize, models_total: usize) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            environment = %environment,
            models_ready = models_ready,
            models_total = models_total,
            "Learner ML service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Learner ML service shutting down"
        );
    }

    pub fn log_persona_prediction(&self, persona: &str, confidence: f64, model_version: &str) {
        info!(
            event = "persona_predicted",
            service = %self.service_name,
            persona = %persona,
            confidence = confidence,
            model_version = %model_version,
            "Prediction: {} (confidence: {:.2})",
            persona,
            confidence
        );
    }

    pub fn log_insight(&self, performance_level: &str, engagement_score: f64, improvement_rate: f64) {
        info!(
            event = "insight_generated",
            service = %self.service_name,
            performance_level = %performance_level,
            engagement_score = engagement_score,
            improvement_rate = improvement_rate,
            "Insights generated: {} ({:.1}/100)",
            performance_level,
            engagement_score
        );
    }

    pub fn log_model_state(&self, model: &str, ready: bool) {
        if ready {
            info!(
                event = "model_ready",
                service = %self.service_name,
                model = %model,
                "Artifact ready"
            );
        } else {
            warn!(
                event = "model_unavailable",
                service = %self.service_name,
                model = %model,
                "Artifact unavailable, dependent endpoints will fail"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        // Handles share the global registry, so counters only ever grow
        let metrics = ServiceMetrics::new();
        let before = metrics.unknown_labels();

        metrics.observe_inference_latency(0.002);
        metrics.inc_predictions("fast_learner");
        metrics.inc_unknown_labels();
        metrics.inc_insights("good");
        metrics.set_models_loaded(3);
        metrics.set_model_version("persona_model", "1.0.0");

        assert!(ServiceMetrics::new().unknown_labels() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("learner-ml");
        assert_eq!(logger.service_name, "learner-ml");
    }
}
