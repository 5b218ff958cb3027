//! ML prediction capabilities
//!
//! Pre-trained artifacts are opaque to the service: a classifier exposes
//! `predict` and optionally `predict_proba`, a scaler exposes `transform`.
//! Implementations exist per artifact family (tract ONNX classifiers,
//! JSON standard scalers); tests plug in stubs.

mod adapter;
mod onnx;
mod scaler;

pub use adapter::{ConfidenceSource, Inference, InferenceAdapter};
pub use onnx::OnnxClassifier;
pub use scaler::StandardScaler;

use crate::error::{Result, ServiceError};
use crate::features::FeatureVector;
use std::fmt;

/// Label produced by a classifier before normalization.
///
/// Artifacts trained on integer-encoded targets emit a class index, those
/// trained on string targets emit the label itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLabel {
    Index(i64),
    Name(String),
}

impl fmt::Display for RawLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawLabel::Index(i) => write!(f, "{}", i),
            RawLabel::Name(s) => f.write_str(s),
        }
    }
}

/// Trait for classifier implementations
pub trait Predictor: Send + Sync {
    /// Predict the label of the single sample in `batch`
    fn predict(&self, batch: &FeatureVector) -> Result<RawLabel>;

    /// Class probability distribution for the single sample in `batch`
    fn predict_proba(&self, _batch: &FeatureVector) -> Result<Vec<f64>> {
        Err(ServiceError::ProbabilityUnavailable(
            "predictor exposes no probability output".to_string(),
        ))
    }

    /// Label and probability distribution from one model run.
    ///
    /// A failed `predict` is an error; a failed `predict_proba` is returned
    /// inside the pair. Override when one run yields both outputs.
    fn classify(&self, batch: &FeatureVector) -> Result<(RawLabel, Result<Vec<f64>>)> {
        let label = self.predict(batch)?;
        Ok((label, self.predict_proba(batch)))
    }

    /// Version string reported alongside predictions
    fn model_version(&self) -> &str;
}

/// Trait for pre-fit feature transforms applied before prediction
pub trait Scaler: Send + Sync {
    /// Transform `batch`, returning a vector of the same shape
    fn transform(&self, batch: &FeatureVector) -> Result<FeatureVector>;
}
