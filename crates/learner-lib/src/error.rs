//! Error taxonomy for the inference core

use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors raised while validating input, loading artifacts or running inference
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required feature is absent from the input mapping
    #[error("Missing required feature: '{field}'")]
    MissingFeature { field: String },

    /// A feature is present but cannot be coerced to a number
    #[error("Feature '{field}' must be {expected}. Got {found}: '{value}'")]
    InvalidFeatureType {
        field: String,
        expected: &'static str,
        found: &'static str,
        value: String,
    },

    /// The registry has no usable artifact under this name
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    /// The predictor, scaler or scorer failed while running
    #[error("{0}")]
    Inference(String),

    /// The predictor cannot provide a probability distribution
    #[error("Probabilities unavailable: {0}")]
    ProbabilityUnavailable(String),

    /// Scoring the comparison period failed
    #[error("Comparison failed: {0}")]
    ComparisonFailure(String),

    /// An artifact could not be read or parsed at load time
    #[error("Failed to load artifact '{name}': {reason}")]
    Artifact { name: String, reason: String },
}

impl ServiceError {
    pub fn inference(err: impl std::fmt::Display) -> Self {
        ServiceError::Inference(err.to_string())
    }

    pub fn artifact(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ServiceError::Artifact {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::MissingFeature { .. } | ServiceError::InvalidFeatureType { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feature_message() {
        let err = ServiceError::MissingFeature {
            field: "focus_score".to_string(),
        };
        assert_eq!(err.to_string(), "Missing required feature: 'focus_score'");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invalid_feature_message() {
        let err = ServiceError::InvalidFeatureType {
            field: "peak_hour".to_string(),
            expected: "numeric",
            found: "string",
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Feature 'peak_hour' must be numeric. Got string: 'abc'"
        );
    }

    #[test]
    fn test_server_errors_are_not_client_errors() {
        assert!(!ServiceError::ModelUnavailable("persona_model".into()).is_client_error());
        assert!(!ServiceError::inference("boom").is_client_error());
    }
}
