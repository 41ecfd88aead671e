//! `penguin train`: fit a model from a labeled CSV

use anyhow::Result;
use clap::Args;
use classifier_lib::{
    training::{BoosterParams, ClassificationReport},
    StructuredLogger, TrainingConfig, TrainingPipeline, TrainingReport, PENGUIN_SCHEMA,
};
use colored::Colorize;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{color_score, print_json, print_success, print_table, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct TrainArgs {
    /// Labeled dataset in the palmerpenguins CSV layout
    #[arg(long)]
    pub dataset: PathBuf,

    /// Where to write the XGBoost JSON model
    #[arg(long, short, default_value = "app/data/model.json")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub rounds: usize,

    #[arg(long, default_value_t = 3)]
    pub max_depth: usize,

    #[arg(long, default_value_t = 0.3)]
    pub learning_rate: f64,

    /// Fraction of each species held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl TrainArgs {
    fn config(&self) -> TrainingConfig {
        TrainingConfig {
            booster: BoosterParams {
                rounds: self.rounds,
                max_depth: self.max_depth,
                learning_rate: self.learning_rate,
                ..BoosterParams::default()
            },
            test_size: self.test_size,
            seed: self.seed,
        }
    }
}

#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Species")]
    species: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1: String,
    #[tabled(rename = "Support")]
    support: usize,
}

fn class_rows(report: &ClassificationReport) -> Vec<ClassRow> {
    report
        .classes
        .iter()
        .map(|c| ClassRow {
            species: c.species.to_string(),
            precision: format!("{:.3}", c.precision),
            recall: format!("{:.3}", c.recall),
            f1: format!("{:.3}", c.f1),
            support: c.support,
        })
        .collect()
}

pub fn run(args: TrainArgs, format: OutputFormat) -> Result<()> {
    let pipeline = TrainingPipeline::new(PENGUIN_SCHEMA, args.config())?;
    let report = pipeline.run(&args.dataset, &args.output)?;

    StructuredLogger::new("penguin-cli").log_training_completed(
        &args.output.display().to_string(),
        report.train_rows,
        report.test_rows,
        report.train.weighted_f1,
        report.test.weighted_f1,
    );

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report, &args),
    }
    Ok(())
}

fn print_report(report: &TrainingReport, args: &TrainArgs) {
    println!("{}", "Training Summary".bold());
    println!("{}", "=".repeat(60));
    println!(
        "Rows:         {} train, {} test, {} dropped",
        report.train_rows, report.test_rows, report.dropped_rows
    );
    println!("Trees:        {}", report.num_trees);
    println!("Train F1:     {}", color_score(report.train.weighted_f1));
    println!("Test F1:      {}", color_score(report.test.weighted_f1));
    println!("Test acc.:    {}", color_score(report.test.accuracy));
    println!();
    println!("{}", "Classification Report (test)".bold());
    print_table(&class_rows(&report.test));
    println!();

    let checksum = report.sha256.as_deref().unwrap_or("-");
    print_success(&format!(
        "Model saved to {} (sha256 {})",
        args.output.display(),
        &checksum[..checksum.len().min(12)]
    ));
}
