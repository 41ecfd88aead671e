//! Penguin species classifier CLI
//!
//! Trains models, classifies observations offline with a local model, or
//! sends them to a running penguin-server.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use classifier_lib::PENGUIN_SCHEMA;
use commands::{classify, predict, schema, train, MeasurementArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Penguin species classifier CLI
#[derive(Parser)]
#[command(name = "penguin")]
#[command(author, version, about = "Train and query the penguin species classifier", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from a labeled CSV and save it
    Train(train::TrainArgs),

    /// Classify one observation with a local model file
    Classify {
        /// Model artifact (.json or .onnx)
        #[arg(long, env = "PENGUIN_MODEL_PATH")]
        model: PathBuf,

        /// Also print the encoded feature vector
        #[arg(long)]
        show_features: bool,

        #[command(flatten)]
        measurements: MeasurementArgs,
    },

    /// Classify one observation through a running server
    Predict {
        /// Server URL
        #[arg(long, env = "PENGUIN_API_URL", default_value = "http://localhost:8080")]
        api_url: String,

        #[command(flatten)]
        measurements: MeasurementArgs,
    },

    /// Show the feature schema models are trained and served with
    Schema,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train(args) => train::run(args, cli.format),
        Commands::Classify {
            model,
            show_features,
            measurements,
        } => classify::run(&model, measurements.into(), show_features, cli.format),
        Commands::Predict {
            api_url,
            measurements,
        } => {
            let client = client::ApiClient::new(&api_url)?;
            predict::run(&client, measurements.into(), cli.format).await
        }
        Commands::Schema => schema::run(&PENGUIN_SCHEMA, cli.format),
    }
}
