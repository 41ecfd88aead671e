//! Output formatting utilities

use clap::ValueEnum;
use classifier_lib::SpeciesLabel;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No rows".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn color_species(species: SpeciesLabel) -> String {
    let name = species.as_str();
    match species {
        SpeciesLabel::Adelie => name.cyan().bold().to_string(),
        SpeciesLabel::Chinstrap => name.magenta().bold().to_string(),
        SpeciesLabel::Gentoo => name.yellow().bold().to_string(),
    }
}

/// Three decimals, colored by how good the score is
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.3}", score);
    if score >= 0.9 {
        formatted.green().to_string()
    } else if score >= 0.7 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_score_keeps_value() {
        colored::control::set_override(false);
        assert_eq!(color_score(0.98765), "0.988");
        assert_eq!(color_score(0.5), "0.500");
    }

    #[test]
    fn test_color_species_plain() {
        colored::control::set_override(false);
        assert_eq!(color_species(SpeciesLabel::Gentoo), "Gentoo");
    }
}
