//! `penguin classify`: offline classification with a local model

use anyhow::{Context, Result};
use classifier_lib::{ModelArtifact, PredictionService, RawObservation, PENGUIN_SCHEMA};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{color_species, print_info, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Value")]
    value: f32,
}

pub fn run(
    model: &Path,
    observation: RawObservation,
    show_features: bool,
    format: OutputFormat,
) -> Result<()> {
    let artifact = ModelArtifact::load(model, &PENGUIN_SCHEMA)
        .with_context(|| format!("Failed to load model from {}", model.display()))?;
    let service = PredictionService::new(Arc::new(artifact), PENGUIN_SCHEMA)?;

    let features = service.encode(&observation)?;
    let prediction = service.classify(&observation)?;

    match format {
        OutputFormat::Json => {
            if show_features {
                print_json(&json!({
                    "prediction": prediction.prediction,
                    "species": prediction.species,
                    "features": features,
                }))?;
            } else {
                print_json(&prediction)?;
            }
        }
        OutputFormat::Table => {
            if show_features {
                let rows: Vec<FeatureRow> = service
                    .schema()
                    .columns()
                    .into_iter()
                    .zip(features.as_slice())
                    .map(|(column, &value)| FeatureRow { column, value })
                    .collect();
                print_table(&rows);
            }
            print_info(&format!(
                "Predicted species: {} (class {})",
                color_species(prediction.species),
                prediction.prediction
            ));
        }
    }
    Ok(())
}
