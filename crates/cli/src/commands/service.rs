//! Service inspection commands: loaded models and health

use anyhow::Result;
use tabled::Tabled;

use super::format_unix;
use crate::client::ApiClient;
use crate::output::{
    color_status, format_bytes, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Loaded")]
    loaded_at: String,
}

/// Row for health components table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// List loaded artifacts
pub async fn models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.models().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows = result
                .models
                .iter()
                .map(|m| ModelRow {
                    name: m.name.clone(),
                    kind: m.kind.clone(),
                    version: m.version.clone(),
                    size: format_bytes(m.size_bytes),
                    checksum: m
                        .checksum
                        .as_deref()
                        .map(short_checksum)
                        .unwrap_or_else(|| "-".to_string()),
                    loaded_at: format_unix(m.loaded_at),
                })
                .collect();
            print_table::<ModelRow>(rows);

            for (name, state) in result.states.iter().filter(|(_, s)| s.as_str() != "ready") {
                print_warning(&format!("{} is {}", name, color_status(state)));
            }
        }
    }

    Ok(())
}

/// Show service health
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if report.status == "healthy" {
                print_success("Service is healthy");
            } else {
                print_warning(&format!("Service is {}", color_status(&report.status)));
            }

            let rows = report
                .components
                .into_iter()
                .map(|(name, c)| ComponentRow {
                    name,
                    status: color_status(&c.status),
                    message: c.message.unwrap_or_default(),
                })
                .collect();
            print_table::<ComponentRow>(rows);
        }
    }

    Ok(())
}

fn short_checksum(checksum: &str) -> String {
    checksum.chars().take(12).collect()
}
