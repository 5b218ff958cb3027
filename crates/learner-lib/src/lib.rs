//! Core library for the learner ML service
//!
//! This crate provides:
//! - Ordered feature vector construction and validation
//! - Classifier inference with confidence derivation
//! - Persona label resolution
//! - Weekly insight scoring and narrative
//! - Load-once model registry
//! - Health checks and observability

pub mod error;
pub mod features;
pub mod health;
pub mod insight;
pub mod observability;
pub mod persona;
pub mod predictor;
pub mod registry;

pub use error::{Result, ServiceError};
pub use features::{FeatureSchema, FeatureVector, PERSONA_SCHEMA};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use insight::{InsightAggregator, InsightReport, InsightRequest, PerformanceLevel};
pub use observability::{ServiceMetrics, StructuredLogger};
pub use persona::{PersonaClassifier, PersonaLabel, PersonaPrediction};
pub use registry::{ModelInfo, ModelPaths, ModelRegistry, ModelState};
