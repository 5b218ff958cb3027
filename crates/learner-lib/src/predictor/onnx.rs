//! ONNX classifier inference using tract
//!
//! Expects scikit-learn style exports: output 0 carries the predicted label
//! (integer or string tensor), output 1, when present, the probability
//! matrix `[1, classes]`. Models must be exported without a ZipMap node.

use super::{Predictor, RawLabel};
use crate::error::{Result, ServiceError};
use crate::features::FeatureVector;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Classifier backed by an optimized tract plan.
///
/// The plan is immutable once built, so concurrent requests run it
/// without synchronization.
pub struct OnnxClassifier {
    plan: TractModel,
    num_features: usize,
    has_probabilities: bool,
    model_version: String,
}

impl OnnxClassifier {
    /// Parse and optimize an ONNX model taking `[1, num_features]` f32 input
    pub fn from_bytes(
        model_bytes: &[u8],
        num_features: usize,
        model_version: impl Into<String>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?;

        let has_probabilities = model.outputs.len() > 1;
        let plan = model
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            plan,
            num_features,
            has_probabilities,
            model_version: model_version.into(),
        })
    }

    pub fn has_probabilities(&self) -> bool {
        self.has_probabilities
    }

    fn run(&self, batch: &FeatureVector) -> Result<TVec<TValue>> {
        if batch.len() != self.num_features {
            return Err(ServiceError::Inference(format!(
                "expected {} features, got {}",
                self.num_features,
                batch.len()
            )));
        }

        let start = Instant::now();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec(batch.shape(), batch.to_f32())
            .map_err(ServiceError::inference)?
            .into();
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(ServiceError::inference)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(outputs)
    }
}

impl Predictor for OnnxClassifier {
    fn predict(&self, batch: &FeatureVector) -> Result<RawLabel> {
        let outputs = self.run(batch)?;
        label_output(&outputs)
    }

    fn predict_proba(&self, batch: &FeatureVector) -> Result<Vec<f64>> {
        if !self.has_probabilities {
            return Err(no_probability_output());
        }
        let outputs = self.run(batch)?;
        probability_output(&outputs)
    }

    /// Both outputs come from the same plan run
    fn classify(&self, batch: &FeatureVector) -> Result<(RawLabel, Result<Vec<f64>>)> {
        let outputs = self.run(batch)?;
        let label = label_output(&outputs)?;
        let probabilities = if self.has_probabilities {
            probability_output(&outputs)
        } else {
            Err(no_probability_output())
        };
        Ok((label, probabilities))
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }
}

fn no_probability_output() -> ServiceError {
    ServiceError::ProbabilityUnavailable("model has no probability output".to_string())
}

fn label_output(outputs: &[TValue]) -> Result<RawLabel> {
    let label = outputs
        .first()
        .ok_or_else(|| ServiceError::Inference("No output from model".to_string()))?;
    first_label(label)
}

fn probability_output(outputs: &[TValue]) -> Result<Vec<f64>> {
    let probabilities = outputs
        .get(1)
        .ok_or_else(|| ServiceError::ProbabilityUnavailable("missing output 1".to_string()))?
        .cast_to::<f64>()
        .map_err(|e| ServiceError::ProbabilityUnavailable(e.to_string()))?;
    let view = probabilities
        .to_array_view::<f64>()
        .map_err(|e| ServiceError::ProbabilityUnavailable(e.to_string()))?;

    // Single sample: the first row is the whole distribution
    let classes = view.shape().last().copied().unwrap_or(0);
    Ok(view.iter().take(classes).copied().collect())
}

/// Read the first element of a label tensor as a [`RawLabel`]
fn first_label(tensor: &Tensor) -> Result<RawLabel> {
    let dt = tensor.datum_type();
    if dt == DatumType::String {
        let view = tensor.to_array_view::<String>().map_err(ServiceError::inference)?;
        return view
            .iter()
            .next()
            .cloned()
            .map(RawLabel::Name)
            .ok_or_else(|| ServiceError::Inference("Empty label output".to_string()));
    }

    if dt.is_integer() {
        let casted = tensor.cast_to::<i64>().map_err(ServiceError::inference)?;
        let view = casted.to_array_view::<i64>().map_err(ServiceError::inference)?;
        return view
            .iter()
            .next()
            .copied()
            .map(RawLabel::Index)
            .ok_or_else(|| ServiceError::Inference("Empty label output".to_string()));
    }

    // Float labels: whole numbers are class indices, anything else is only
    // meaningful as text
    let casted = tensor.cast_to::<f64>().map_err(ServiceError::inference)?;
    let view = casted.to_array_view::<f64>().map_err(ServiceError::inference)?;
    let value = view
        .iter()
        .next()
        .copied()
        .ok_or_else(|| ServiceError::Inference("Empty label output".to_string()))?;
    if value.fract() == 0.0 && value.is_finite() {
        Ok(RawLabel::Index(value as i64))
    } else {
        Ok(RawLabel::Name(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_label_tensor() {
        let tensor: Tensor = tract_ndarray::arr1(&[3i64]).into();
        assert_eq!(first_label(&tensor).unwrap(), RawLabel::Index(3));
    }

    #[test]
    fn test_string_label_tensor() {
        let tensor: Tensor = tract_ndarray::arr1(&["new_learner".to_string()]).into();
        assert_eq!(
            first_label(&tensor).unwrap(),
            RawLabel::Name("new_learner".to_string())
        );
    }

    #[test]
    fn test_float_label_tensor() {
        let whole: Tensor = tract_ndarray::arr1(&[1.0f32]).into();
        assert_eq!(first_label(&whole).unwrap(), RawLabel::Index(1));

        let fractional: Tensor = tract_ndarray::arr1(&[1.5f32]).into();
        assert_eq!(
            first_label(&fractional).unwrap(),
            RawLabel::Name("1.5".to_string())
        );
    }

    #[test]
    fn test_invalid_model_bytes_rejected() {
        assert!(OnnxClassifier::from_bytes(b"not an onnx model", 18, "v1").is_err());
    }

    #[test]
    fn test_probability_output_reads_first_row() {
        let label: Tensor = tract_ndarray::arr1(&[0i64]).into();
        let probabilities: Tensor = tract_ndarray::arr2(&[[0.7f32, 0.2, 0.1]]).into();
        let outputs: TVec<TValue> = tvec!(label.into(), probabilities.into());

        assert_eq!(label_output(&outputs).unwrap(), RawLabel::Index(0));
        let distribution = probability_output(&outputs).unwrap();
        assert_eq!(distribution.len(), 3);
        assert!((distribution[0] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_missing_probability_output() {
        let label: Tensor = tract_ndarray::arr1(&[2i64]).into();
        let outputs: TVec<TValue> = tvec!(label.into());
        assert!(matches!(
            probability_output(&outputs),
            Err(ServiceError::ProbabilityUnavailable(_))
        ));
    }
}
