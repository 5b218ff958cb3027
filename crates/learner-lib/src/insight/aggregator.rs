//! Combines current and previous period scorings into a weekly report

use super::{narrative, round_to, MetricsSnapshot, PerformanceLevel};
use crate::error::{Result, ServiceError};
use crate::observability::ServiceMetrics;
use crate::registry::{names, ModelRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Weekly insight request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InsightRequest {
    pub weekly_data: MetricsSnapshot,
    pub persona: String,
    #[serde(default)]
    pub previous_week_data: Option<MetricsSnapshot>,
}

/// Weekly insight report, produced fresh per request
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub engagement_score: f64,
    pub performance_level: PerformanceLevel,
    pub improvement_rate: f64,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub extended_message: String,
    pub metrics: BTreeMap<String, f64>,
    pub persona: String,
}

/// Percentage change from `previous` to `current`, 2 decimals.
///
/// A zero (or negative) baseline reports no change.
pub fn improvement_rate(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        round_to((current - previous) / previous * 100.0, 2)
    } else {
        0.0
    }
}

pub struct InsightAggregator {
    registry: Arc<ModelRegistry>,
    metrics: ServiceMetrics,
}

impl InsightAggregator {
    pub fn new(registry: Arc<ModelRegistry>, metrics: ServiceMetrics) -> Self {
        Self { registry, metrics }
    }

    pub fn generate(&self, request: &InsightRequest) -> Result<InsightReport> {
        let scorer = self.registry.scorer(names::INSIGHT_GENERATOR)?;
        let card = scorer
            .generate(&request.weekly_data, &request.persona)
            .inspect_err(|e| self.count_failure(e))?;

        let improvement_rate = match request.previous_week_data.as_ref().filter(|p| !p.is_empty()) {
            Some(previous) => match self.previous_score(previous, &request.persona) {
                Ok(previous_score) => improvement_rate(card.engagement_score, previous_score),
                Err(e) => {
                    warn!(error = %e, "Could not calculate improvement rate");
                    self.metrics.inc_comparison_failures();
                    0.0
                }
            },
            None => 0.0,
        };

        let summary = narrative::summary(card.performance_level, card.engagement_score);
        let extended_message =
            narrative::extended_message(&request.persona, card.performance_level, &card.metrics);

        debug!(
            performance_level = %card.performance_level,
            engagement_score = card.engagement_score,
            improvement_rate = improvement_rate,
            "Insight report assembled"
        );
        self.metrics.inc_insights(card.performance_level.as_str());

        Ok(InsightReport {
            engagement_score: card.engagement_score,
            performance_level: card.performance_level,
            improvement_rate,
            recommendations: card.recommendations,
            summary,
            extended_message,
            metrics: card.metrics,
            persona: request.persona.clone(),
        })
    }

    /// Score the comparison period with a fresh registry lookup
    fn previous_score(&self, previous: &MetricsSnapshot, persona: &str) -> Result<f64> {
        let scorer = self
            .registry
            .scorer(names::INSIGHT_GENERATOR)
            .map_err(|e| ServiceError::ComparisonFailure(e.to_string()))?;
        scorer
            .generate(previous, persona)
            .map(|card| card.engagement_score)
            .map_err(|e| ServiceError::ComparisonFailure(e.to_string()))
    }

    fn count_failure(&self, err: &ServiceError) {
        if err.is_client_error() {
            self.metrics.inc_validation_errors();
        } else {
            self.metrics.inc_inference_errors();
        }
    }
}
