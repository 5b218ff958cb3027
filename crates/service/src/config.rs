//! Service configuration

use anyhow::{bail, Result};
use learner_lib::features::PERSONA_FEATURE_COUNT;
use learner_lib::registry::ModelPaths;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Key used when none is configured; rejected in production
pub const DEV_API_KEY: &str = "learner-ml-dev-key";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// `production` redacts internal error details
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Expected value of the `X-API-Key` header
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Comma-separated CORS origins, `*` for any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    pub persona_model_path: Option<PathBuf>,

    /// Falls back to `<model_dir>/persona/persona_scaler.json` when that file exists
    pub persona_scaler_path: Option<PathBuf>,

    pub insight_model_path: Option<PathBuf>,

    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Load every artifact before reporting ready
    #[serde(default = "default_true")]
    pub preload_models: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_feature_count")]
    pub feature_count: usize,
}

fn default_app_name() -> String {
    "Learner ML Service".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_key() -> String {
    DEV_API_KEY.to_string()
}

fn default_allowed_origins() -> String {
    "http://localhost:3000,http://localhost:5000,http://localhost:5173".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_model_version() -> String {
    "1.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_request_size() -> usize {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_feature_count() -> usize {
    PERSONA_FEATURE_COUNT
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_version: default_app_version(),
            environment: default_environment(),
            host: default_host(),
            port: default_port(),
            api_key: default_api_key(),
            allowed_origins: default_allowed_origins(),
            model_dir: default_model_dir(),
            persona_model_path: None,
            persona_scaler_path: None,
            insight_model_path: None,
            model_version: default_model_version(),
            preload_models: default_true(),
            request_timeout_secs: default_request_timeout(),
            max_request_size: default_max_request_size(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            feature_count: default_feature_count(),
        }
    }
}

impl ServiceConfig {
    /// Load from `.env`, an optional `config/service` file and `LEARNER_*` variables
    pub fn load() -> Result<Self> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/service").required(false))
            .add_source(config::Environment::with_prefix("LEARNER"))
            .build()?;

        let config: ServiceConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_count != PERSONA_FEATURE_COUNT {
            bail!(
                "feature_count is {} but the persona schema has {} fields",
                self.feature_count,
                PERSONA_FEATURE_COUNT
            );
        }
        if self.api_key.trim().is_empty() {
            bail!("api_key must not be empty");
        }
        if self.is_production() && self.api_key == DEV_API_KEY {
            bail!("api_key must be set in production");
        }
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            bail!("log_format must be 'json' or 'pretty', got '{}'", self.log_format);
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve artifact locations against `model_dir`
    pub fn model_paths(&self) -> ModelPaths {
        let dir = &self.model_dir;
        let scaler = self.persona_scaler_path.clone().or_else(|| {
            let default = dir.join("persona").join("persona_scaler.json");
            default.exists().then_some(default)
        });

        ModelPaths {
            persona_model: self
                .persona_model_path
                .clone()
                .unwrap_or_else(|| dir.join("persona").join("persona_model.onnx")),
            persona_scaler: scaler,
            insight_generator: self
                .insight_model_path
                .clone()
                .unwrap_or_else(|| dir.join("insight").join("insight_generator.json")),
            feature_count: self.feature_count,
            model_version: self.model_version.clone(),
        }
    }
}
