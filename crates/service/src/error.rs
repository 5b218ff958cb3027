//! HTTP error mapping
//!
//! Every failure leaves the service as `{"detail": "<message>"}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use learner_lib::ServiceError;
use serde_json::json;
use tracing::error;

/// Endpoint family, used to prefix server-side failures
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Prediction,
    Insight,
}

impl Operation {
    fn failure_prefix(&self) -> &'static str {
        match self {
            Operation::Prediction => "Prediction failed",
            Operation::Insight => "Insight generation failed",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Invalid API Key")
    }

    /// Map a core error; `redact` hides internal details from callers
    pub fn from_service(err: ServiceError, operation: Operation, redact: bool) -> Self {
        match err {
            ServiceError::MissingFeature { .. } | ServiceError::InvalidFeatureType { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ServiceError::ModelUnavailable(name) => {
                error!(model = %name, "Request needs an artifact that is not loaded");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Model not loaded")
            }
            other => {
                error!(error = %other, "{}", operation.failure_prefix());
                let detail = if redact {
                    operation.failure_prefix().to_string()
                } else {
                    format!("{}: {}", operation.failure_prefix(), other)
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        }
    }

    /// A blocking task panicked or was cancelled
    pub fn task_failed(operation: Operation, err: tokio::task::JoinError) -> Self {
        error!(error = %err, "{}", operation.failure_prefix());
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            operation.failure_prefix(),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_errors_are_unprocessable() {
        let err = ApiError::from_service(
            ServiceError::MissingFeature {
                field: "peak_hour".to_string(),
            },
            Operation::Prediction,
            true,
        );
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.detail(), "Missing required feature: 'peak_hour'");
    }

    #[test]
    fn test_missing_model_detail() {
        let err = ApiError::from_service(
            ServiceError::ModelUnavailable("persona_model".to_string()),
            Operation::Prediction,
            false,
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "Model not loaded");
    }

    #[test]
    fn test_inference_errors_are_redacted_on_request() {
        let err = || ServiceError::inference("tensor shape mismatch");

        let open = ApiError::from_service(err(), Operation::Prediction, false);
        assert_eq!(open.detail(), "Prediction failed: tensor shape mismatch");

        let redacted = ApiError::from_service(err(), Operation::Insight, true);
        assert_eq!(redacted.detail(), "Insight generation failed");
    }
}
