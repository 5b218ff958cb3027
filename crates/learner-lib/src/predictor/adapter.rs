//! Normalizes heterogeneous classifier outputs into a (label, confidence) pair

use super::{Predictor, RawLabel, Scaler};
use crate::error::Result;
use crate::features::FeatureVector;
use serde::Serialize;
use tracing::{debug, warn};

/// Confidence reported when no usable probability is available
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Where a confidence value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Probability of the predicted class index
    ClassProbability,
    /// Highest probability, used for string labels
    MaxProbability,
    /// Probabilities were unavailable
    Default,
}

/// Outcome of a single inference call
#[derive(Debug, Clone)]
pub struct Inference {
    pub label: RawLabel,
    pub confidence: f64,
    pub confidence_source: ConfidenceSource,
}

/// Runs a predictor (with an optional scaler) and derives a confidence
pub struct InferenceAdapter<'a> {
    predictor: &'a dyn Predictor,
    scaler: Option<&'a dyn Scaler>,
}

impl<'a> InferenceAdapter<'a> {
    pub fn new(predictor: &'a dyn Predictor) -> Self {
        Self {
            predictor,
            scaler: None,
        }
    }

    pub fn with_scaler(mut self, scaler: &'a dyn Scaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Scale, predict and derive the confidence for one sample.
    ///
    /// Scaler and `predict` failures propagate. Probability failures never do:
    /// they degrade the confidence to [`DEFAULT_CONFIDENCE`].
    pub fn infer(&self, vector: &FeatureVector) -> Result<Inference> {
        let scaled;
        let input = match self.scaler {
            Some(scaler) => {
                scaled = scaler.transform(vector)?;
                &scaled
            }
            None => vector,
        };

        let (label, probabilities) = self.predictor.classify(input)?;
        debug!(label = %label, "Raw prediction");

        let (confidence, confidence_source) = match probabilities {
            Ok(probabilities) => confidence_for(&label, &probabilities),
            Err(e) => {
                warn!(error = %e, "Model doesn't support predict_proba, using confidence 1.0");
                (DEFAULT_CONFIDENCE, ConfidenceSource::Default)
            }
        };

        Ok(Inference {
            label,
            confidence,
            confidence_source,
        })
    }
}

fn confidence_for(label: &RawLabel, probabilities: &[f64]) -> (f64, ConfidenceSource) {
    match label {
        RawLabel::Index(i) => {
            match usize::try_from(*i).ok().and_then(|i| probabilities.get(i)) {
                Some(&p) => (p, ConfidenceSource::ClassProbability),
                None => {
                    warn!(
                        index = *i,
                        classes = probabilities.len(),
                        "Predicted class outside probability distribution, using confidence 1.0"
                    );
                    (DEFAULT_CONFIDENCE, ConfidenceSource::Default)
                }
            }
        }
        RawLabel::Name(_) => {
            let max = probabilities.iter().copied().fold(f64::NAN, f64::max);
            if max.is_nan() {
                warn!("Empty probability distribution, using confidence 1.0");
                (DEFAULT_CONFIDENCE, ConfidenceSource::Default)
            } else {
                (max, ConfidenceSource::MaxProbability)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    struct StubPredictor {
        label: RawLabel,
        probabilities: Option<Vec<f64>>,
    }

    impl Predictor for StubPredictor {
        fn predict(&self, _batch: &FeatureVector) -> Result<RawLabel> {
            Ok(self.label.clone())
        }

        fn predict_proba(&self, _batch: &FeatureVector) -> Result<Vec<f64>> {
            self.probabilities
                .clone()
                .ok_or_else(|| ServiceError::inference("predict_proba raised"))
        }

        fn model_version(&self) -> &str {
            "test"
        }
    }

    struct LabelOnly;

    impl Predictor for LabelOnly {
        fn predict(&self, _batch: &FeatureVector) -> Result<RawLabel> {
            Ok(RawLabel::Index(2))
        }

        fn model_version(&self) -> &str {
            "test"
        }
    }

    struct Doubler;

    impl Scaler for Doubler {
        fn transform(&self, batch: &FeatureVector) -> Result<FeatureVector> {
            Ok(FeatureVector::new(
                batch.values().iter().map(|v| v * 2.0).collect(),
            ))
        }
    }

    /// Predicts the index stored in the first feature, so the scaler's effect is visible
    struct EchoFirst;

    impl Predictor for EchoFirst {
        fn predict(&self, batch: &FeatureVector) -> Result<RawLabel> {
            Ok(RawLabel::Index(batch.values()[0] as i64))
        }

        fn model_version(&self) -> &str {
            "echo"
        }
    }

    struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn predict(&self, _batch: &FeatureVector) -> Result<RawLabel> {
            Err(ServiceError::inference("tensor shape mismatch"))
        }

        fn model_version(&self) -> &str {
            "broken"
        }
    }

    /// Answers only through `classify`
    struct SingleRun;

    impl Predictor for SingleRun {
        fn predict(&self, _batch: &FeatureVector) -> Result<RawLabel> {
            Err(ServiceError::inference("predict called separately"))
        }

        fn classify(&self, _batch: &FeatureVector) -> Result<(RawLabel, Result<Vec<f64>>)> {
            Ok((RawLabel::Index(1), Ok(vec![0.2, 0.8])))
        }

        fn model_version(&self) -> &str {
            "single"
        }
    }

    fn vector() -> FeatureVector {
        FeatureVector::new(vec![1.0; 18])
    }

    #[test]
    fn test_index_label_uses_class_probability() {
        let predictor = StubPredictor {
            label: RawLabel::Index(0),
            probabilities: Some(vec![0.9, 0.05, 0.03, 0.02]),
        };
        let inference = InferenceAdapter::new(&predictor).infer(&vector()).unwrap();
        assert_eq!(inference.label, RawLabel::Index(0));
        assert_eq!(inference.confidence, 0.9);
        assert_eq!(inference.confidence_source, ConfidenceSource::ClassProbability);
    }

    #[test]
    fn test_string_label_uses_max_probability() {
        let predictor = StubPredictor {
            label: RawLabel::Name("fast_learner".to_string()),
            probabilities: Some(vec![0.1, 0.7, 0.2]),
        };
        let inference = InferenceAdapter::new(&predictor).infer(&vector()).unwrap();
        assert_eq!(inference.confidence, 0.7);
        assert_eq!(inference.confidence_source, ConfidenceSource::MaxProbability);
    }

    #[test]
    fn test_missing_predict_proba_defaults_to_one() {
        let inference = InferenceAdapter::new(&LabelOnly).infer(&vector()).unwrap();
        assert_eq!(inference.confidence, 1.0);
        assert_eq!(inference.confidence_source, ConfidenceSource::Default);
    }

    #[test]
    fn test_failing_predict_proba_defaults_to_one() {
        let predictor = StubPredictor {
            label: RawLabel::Index(1),
            probabilities: None,
        };
        let inference = InferenceAdapter::new(&predictor).infer(&vector()).unwrap();
        assert_eq!(inference.confidence, 1.0);
    }

    #[test]
    fn test_index_outside_distribution_defaults_to_one() {
        let predictor = StubPredictor {
            label: RawLabel::Index(7),
            probabilities: Some(vec![0.5, 0.5]),
        };
        let inference = InferenceAdapter::new(&predictor).infer(&vector()).unwrap();
        assert_eq!(inference.label, RawLabel::Index(7));
        assert_eq!(inference.confidence_source, ConfidenceSource::Default);
    }

    #[test]
    fn test_scaler_runs_before_predict() {
        let inference = InferenceAdapter::new(&EchoFirst)
            .with_scaler(&Doubler)
            .infer(&vector())
            .unwrap();
        assert_eq!(inference.label, RawLabel::Index(2));
    }

    #[test]
    fn test_predict_failure_propagates() {
        let err = InferenceAdapter::new(&FailingPredictor)
            .infer(&vector())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Inference(ref msg) if msg == "tensor shape mismatch"));
    }

    #[test]
    fn test_classify_runs_model_once() {
        let inference = InferenceAdapter::new(&SingleRun).infer(&vector()).unwrap();
        assert_eq!(inference.label, RawLabel::Index(1));
        assert_eq!(inference.confidence, 0.8);
    }
}
