//! `penguin schema`: show the model's input columns

use anyhow::Result;
use classifier_lib::SchemaDefinition;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct SchemaView {
    version: u32,
    fingerprint: String,
    columns: Vec<String>,
}

#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Column")]
    name: String,
}

pub fn run(schema: &SchemaDefinition, format: OutputFormat) -> Result<()> {
    let view = SchemaView {
        version: schema.version(),
        fingerprint: schema.fingerprint(),
        columns: schema.columns(),
    };

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("{} v{}", "Feature Schema".bold(), view.version);
            println!("Fingerprint: {}", view.fingerprint.cyan());
            let rows: Vec<ColumnRow> = view
                .columns
                .into_iter()
                .enumerate()
                .map(|(position, name)| ColumnRow { position, name })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}
