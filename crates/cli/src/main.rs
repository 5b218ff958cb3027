//! Learner ML service CLI
//!
//! A command-line tool for classifying learner personas, generating
//! weekly insights and inspecting a running learner ML service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{insights, persona, service};
use std::path::PathBuf;

/// Learner ML service CLI
#[derive(Parser)]
#[command(name = "lrn")]
#[command(author, version, about = "CLI for the Learner ML Service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via LRN_API_URL env var)
    #[arg(long, env = "LRN_API_URL")]
    pub api_url: Option<String>,

    /// API key sent as X-API-Key (can also be set via LRN_API_KEY env var)
    #[arg(long, env = "LRN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict a learner persona from a JSON feature file
    Persona {
        /// File holding the features, bare or as {"features": {...}}
        #[arg(long)]
        file: PathBuf,
    },

    /// Generate weekly insights from a JSON activity file
    Insights {
        /// File holding this week's counters
        #[arg(long)]
        file: PathBuf,

        /// Learner persona used to tailor the messages
        #[arg(long, default_value = "")]
        persona: String,

        /// File holding last week's counters, for the improvement rate
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// List the persona labels the service can return
    Labels,

    /// Show the performance level catalog
    Levels,

    /// Show loaded models and their state
    Models,

    /// Show service health
    Health,
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format);
    let client = client::ApiClient::new(
        &config.resolve_api_url(cli.api_url),
        config.resolve_api_key(cli.api_key),
    )?;

    match cli.command {
        Commands::Persona { file } => persona::predict(&client, &file, format).await,
        Commands::Insights {
            file,
            persona,
            previous,
        } => insights::weekly(&client, &file, &persona, previous.as_deref(), format).await,
        Commands::Labels => persona::labels(&client, format).await,
        Commands::Levels => insights::levels(&client, format).await,
        Commands::Models => service::models(&client, format).await,
        Commands::Health => service::health(&client, format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
