use super::{resolve_label, PersonaLabel};
use crate::error::Result;
use crate::features::PERSONA_SCHEMA;
use crate::insight::round_to;
use crate::observability::ServiceMetrics;
use crate::predictor::{ConfidenceSource, InferenceAdapter};
use crate::registry::{names, ModelRegistry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Persona prediction response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaPrediction {
    pub persona: PersonaLabel,
    pub confidence: f64,
    pub model_version: String,
    pub predicted_at: DateTime<Utc>,
}

/// Registry lookup → feature vector → inference → label resolution
pub struct PersonaClassifier {
    registry: Arc<ModelRegistry>,
    metrics: ServiceMetrics,
}

impl PersonaClassifier {
    pub fn new(registry: Arc<ModelRegistry>, metrics: ServiceMetrics) -> Self {
        Self { registry, metrics }
    }

    pub fn predict(&self, features: &Map<String, Value>) -> Result<PersonaPrediction> {
        let predictor = self.registry.classifier(names::PERSONA_MODEL)?;
        // The scaler is only required when one was configured
        let scaler = if self.registry.contains(names::PERSONA_SCALER) {
            Some(self.registry.scaler(names::PERSONA_SCALER)?)
        } else {
            None
        };

        let vector = PERSONA_SCHEMA.build(features).inspect_err(|e| {
            debug!(error = %e, "Rejected persona features");
            self.metrics.inc_validation_errors();
        })?;

        let start = Instant::now();
        let mut adapter = InferenceAdapter::new(predictor.as_ref());
        if let Some(scaler) = scaler.as_deref() {
            adapter = adapter.with_scaler(scaler);
        }
        let inference = adapter
            .infer(&vector)
            .inspect_err(|_| self.metrics.inc_inference_errors())?;
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());

        if inference.confidence_source == ConfidenceSource::Default {
            self.metrics.inc_probability_fallbacks();
        }

        let persona = resolve_label(&inference.label);
        if !persona.is_known() {
            self.metrics.inc_unknown_labels();
        }
        self.metrics.inc_predictions(persona.as_str());

        Ok(PersonaPrediction {
            persona,
            confidence: round_to(inference.confidence, 4),
            model_version: predictor.model_version().to_string(),
            predicted_at: Utc::now(),
        })
    }
}
