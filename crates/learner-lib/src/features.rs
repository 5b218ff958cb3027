//! Feature vector construction for ML inference
//!
//! Maps an arbitrary string-keyed JSON object onto the ordered numeric
//! vector a trained model consumes. The schema order, not the key names,
//! decides the position of every value.

use crate::error::{Result, ServiceError};
use serde_json::{Map, Value};

/// Number of features expected by the persona classifier
pub const PERSONA_FEATURE_COUNT: usize = 18;

/// Field order the persona classifier was trained on
pub const PERSONA_FIELDS: [&str; PERSONA_FEATURE_COUNT] = [
    "total_activities",
    "completion_rate",
    "consistency_ratio",
    "avg_study_duration_min",
    "total_completions",
    "avg_session_gap_days",
    "active_days",
    "total_study_time_hours",
    "peak_hour",
    "weekend_activity_ratio",
    "late_night_study_ratio",
    "morning_study_ratio",
    "focus_score",
    "streak_days",
    "quiz_attempt_rate",
    "material_review_rate",
    "pomodoro_usage_rate",
    "dominant_time_period",
];

/// Schema used for persona prediction
pub const PERSONA_SCHEMA: FeatureSchema = FeatureSchema::new(&PERSONA_FIELDS);

/// Ordered, fixed-length list of named numeric fields
#[derive(Debug, Clone, Copy)]
pub struct FeatureSchema {
    fields: &'static [&'static str],
}

impl FeatureSchema {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a single-sample vector from `input` in schema order.
    ///
    /// Fields not named by the schema are ignored. The first missing or
    /// non-numeric field, in schema order, is reported.
    pub fn build(&self, input: &Map<String, Value>) -> Result<FeatureVector> {
        let mut values = Vec::with_capacity(self.fields.len());
        for &field in self.fields {
            let value = input.get(field).ok_or_else(|| ServiceError::MissingFeature {
                field: field.to_string(),
            })?;
            values.push(coerce_numeric(field, value)?);
        }
        Ok(FeatureVector { values })
    }
}

/// Dense single-row batch of 64-bit features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Batch shape `(rows, columns)`; always one row
    pub fn shape(&self) -> (usize, usize) {
        (1, self.values.len())
    }

    /// Narrow to f32 for models exported with float inputs
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

/// Coerce a JSON value to f64.
///
/// Accepts numbers, numeric strings (surrounding whitespace trimmed) and
/// booleans as 1/0.
pub fn coerce_numeric(field: &str, value: &Value) -> Result<f64> {
    let coerced = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    coerced.ok_or_else(|| ServiceError::InvalidFeatureType {
        field: field.to_string(),
        expected: "numeric",
        found: json_type_name(value),
        value: display_value(value),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
