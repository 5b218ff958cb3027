//! Persona prediction commands

use anyhow::Result;
use serde_json::{Map, Value};
use std::path::Path;
use tabled::Tabled;

use super::{format_timestamp, read_json_object};
use crate::client::ApiClient;
use crate::output::{color_confidence, color_persona, print_json, print_table, print_warning, OutputFormat};

/// Row for persona labels table
#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Persona")]
    label: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Accept either `{"features": {...}}` or the bare feature mapping
fn unwrap_features(mut body: Map<String, Value>) -> Map<String, Value> {
    match body.remove("features") {
        Some(Value::Object(features)) => features,
        Some(other) => {
            body.insert("features".to_string(), other);
            body
        }
        None => body,
    }
}

/// Predict the persona for the features in `file`
pub async fn predict(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let features = unwrap_features(read_json_object(file)?);
    let prediction = client.predict_persona(features).await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            if prediction.persona == "unknown" {
                print_warning("The model returned a label outside the known personas");
            }
            println!("Persona:      {}", color_persona(&prediction.persona));
            println!("Confidence:   {}", color_confidence(prediction.confidence));
            println!("Model:        {}", prediction.model_version);
            println!("Predicted at: {}", format_timestamp(&prediction.predicted_at));
        }
    }

    Ok(())
}

/// List the persona labels the service can return
pub async fn labels(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.persona_labels().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows = result
                .personas
                .into_iter()
                .map(|p| LabelRow {
                    label: p.label,
                    description: p.description,
                })
                .collect();
            print_table::<LabelRow>(rows);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_unwrap_features_wrapper() {
        let features = unwrap_features(object(json!({"features": {"focus_score": 0.5}})));
        assert_eq!(features["focus_score"], 0.5);
        assert!(!features.contains_key("features"));
    }

    #[test]
    fn test_unwrap_bare_features() {
        let features = unwrap_features(object(json!({"focus_score": 0.5, "streak_days": 3})));
        assert_eq!(features.len(), 2);
    }
}
