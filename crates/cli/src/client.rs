//! API client for communicating with the learner ML service

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

const API_KEY_HEADER: &str = "X-API-Key";

/// API client for the learner ML service
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .authorized(self.client.post(url).json(body))
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    pub async fn predict_persona(&self, features: Map<String, Value>) -> Result<PersonaPrediction> {
        self.post("api/v1/predict/persona", &PersonaRequest { features })
            .await
    }

    pub async fn persona_labels(&self) -> Result<LabelList> {
        self.get("api/v1/predict/persona/labels").await
    }

    pub async fn weekly_insights(&self, request: &InsightRequest) -> Result<InsightReport> {
        self.post("api/v1/insights/weekly", request).await
    }

    pub async fn performance_levels(&self) -> Result<LevelList> {
        self.get("api/v1/insights/performance-levels").await
    }

    pub async fn models(&self) -> Result<ModelList> {
        self.get("api/v1/models").await
    }

    /// Health report; an unhealthy service answers 503 with the same body
    pub async fn health(&self) -> Result<HealthReport> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse response");
        }
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("API error ({}): {}", status, error_detail(&body));
    }

    response.json().await.context("Failed to parse response")
}

/// Pull `detail` out of an error body, falling back to the raw text
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| match e.detail {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|_| body.to_string())
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaRequest {
    pub features: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaPrediction {
    pub persona: String,
    pub confidence: f64,
    pub model_version: String,
    pub predicted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaLabel {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelList {
    pub personas: Vec<PersonaLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRequest {
    pub weekly_data: Map<String, Value>,
    pub persona: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_week_data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub engagement_score: f64,
    pub performance_level: String,
    pub improvement_rate: f64,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub extended_message: String,
    pub metrics: BTreeMap<String, f64>,
    pub persona: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceLevel {
    pub level: String,
    pub score_range: String,
    pub description: String,
    pub badge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelList {
    pub levels: Vec<PerformanceLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub size_bytes: u64,
    pub loaded_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub models: Vec<ModelInfo>,
    #[serde(default)]
    pub states: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: Value,
}
