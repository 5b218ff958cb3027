//! Weekly insight commands

use anyhow::Result;
use std::path::Path;
use tabled::Tabled;

use super::read_json_object;
use crate::client::{ApiClient, InsightRequest};
use crate::output::{color_level, format_rate, print_info, print_json, print_table, OutputFormat};

/// Row for the metrics breakdown table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row for performance levels table
#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "")]
    badge: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Score")]
    score_range: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Generate weekly insights from the activity counters in `file`
pub async fn weekly(
    client: &ApiClient,
    file: &Path,
    persona: &str,
    previous: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let request = InsightRequest {
        weekly_data: read_json_object(file)?,
        persona: persona.to_string(),
        previous_week_data: previous.map(read_json_object).transpose()?,
    };
    let report = client.weekly_insights(&request).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "Engagement: {:.1}/100 ({})",
                report.engagement_score,
                color_level(&report.performance_level)
            );
            if request.previous_week_data.is_some() {
                println!("Change:     {}", format_rate(report.improvement_rate));
            }
            println!("\n{}\n", report.summary);

            let rows = report
                .metrics
                .iter()
                .map(|(name, value)| MetricRow {
                    name: name.clone(),
                    value: format!("{}", value),
                })
                .collect();
            print_table::<MetricRow>(rows);

            println!("\nRecommendations:");
            for recommendation in &report.recommendations {
                println!("  • {}", recommendation);
            }
            println!();
            print_info(&report.extended_message);
        }
    }

    Ok(())
}

/// Show the performance level catalog
pub async fn levels(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.performance_levels().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows = result
                .levels
                .into_iter()
                .map(|l| LevelRow {
                    badge: l.badge,
                    level: color_level(&l.level),
                    score_range: l.score_range,
                    description: l.description,
                })
                .collect();
            print_table::<LevelRow>(rows);
        }
    }

    Ok(())
}
