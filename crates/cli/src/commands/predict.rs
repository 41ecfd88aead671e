//! `penguin predict`: classify through a running server

use anyhow::Result;
use classifier_lib::RawObservation;

use crate::client::ApiClient;
use crate::output::{color_species, print_info, print_json, OutputFormat};

pub async fn run(client: &ApiClient, observation: RawObservation, format: OutputFormat) -> Result<()> {
    let prediction = client.predict(&observation).await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => print_info(&format!(
            "Predicted species: {} (class {})",
            color_species(prediction.species),
            prediction.prediction
        )),
    }
    Ok(())
}
