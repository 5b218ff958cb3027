//! Static API key check for the `/api/v1` routes

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Expected key, shared with the middleware
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_compare(self.0.as_bytes(), candidate.as_bytes())
    }
}

/// Rejects requests without the expected `X-API-Key` header with 403
pub async fn require_api_key(State(key): State<ApiKey>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(candidate) if key.matches(candidate) => next.run(request).await,
        _ => {
            warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            ApiError::forbidden().into_response()
        }
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
