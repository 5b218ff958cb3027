//! Standard scaler fitted offline and shipped as JSON parameters

use super::Scaler;
use crate::error::{Result, ServiceError};
use crate::features::FeatureVector;
use serde::Deserialize;

/// `(x - mean) / scale`, per feature
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> anyhow::Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Parse `{"mean": [...], "scale": [...]}` and check it covers `num_features`
    pub fn from_json(bytes: &[u8], num_features: usize) -> anyhow::Result<Self> {
        let scaler: StandardScaler = serde_json::from_slice(bytes)?;
        scaler.validate()?;
        if scaler.mean.len() != num_features {
            anyhow::bail!(
                "Scaler was fitted on {} features, expected {}",
                scaler.mean.len(),
                num_features
            );
        }
        Ok(scaler)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "Scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            );
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            anyhow::bail!("Scaler parameters must be finite");
        }
        Ok(())
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, batch: &FeatureVector) -> Result<FeatureVector> {
        if batch.len() != self.mean.len() {
            return Err(ServiceError::Inference(format!(
                "Scaler expects {} features, got {}",
                self.mean.len(),
                batch.len()
            )));
        }

        let values = batch
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Zero-variance features were fitted with a unit scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect();

        Ok(FeatureVector::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_standardizes() {
        let scaler = StandardScaler::new(vec![1.0, 10.0], vec![2.0, 5.0]).unwrap();
        let out = scaler.transform(&FeatureVector::new(vec![3.0, 0.0])).unwrap();
        assert_eq!(out.values(), &[1.0, -2.0]);
    }

    #[test]
    fn test_zero_scale_is_unit() {
        let scaler = StandardScaler::new(vec![4.0], vec![0.0]).unwrap();
        let out = scaler.transform(&FeatureVector::new(vec![6.0])).unwrap();
        assert_eq!(out.values(), &[2.0]);
    }

    #[test]
    fn test_from_json_checks_feature_count() {
        let json = br#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#;
        assert!(StandardScaler::from_json(json, 2).is_ok());
        assert!(StandardScaler::from_json(json, 18).is_err());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(StandardScaler::new(vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_wrong_width_batch_is_an_inference_error() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).unwrap();
        assert!(matches!(
            scaler.transform(&FeatureVector::new(vec![1.0])),
            Err(ServiceError::Inference(_))
        ));
    }
}
