//! CLI subcommand implementations

pub mod classify;
pub mod predict;
pub mod schema;
pub mod train;

use clap::Args;
use classifier_lib::RawObservation;

/// One penguin's measurements, as accepted by `/predict`
#[derive(Debug, Clone, Args)]
pub struct MeasurementArgs {
    #[arg(long)]
    pub bill_length_mm: f64,

    #[arg(long)]
    pub bill_depth_mm: f64,

    #[arg(long)]
    pub flipper_length_mm: f64,

    #[arg(long)]
    pub body_mass_g: f64,

    #[arg(long)]
    pub year: i32,

    /// male or female
    #[arg(long)]
    pub sex: String,

    /// Biscoe, Dream or Torgersen
    #[arg(long)]
    pub island: String,
}

impl From<MeasurementArgs> for RawObservation {
    fn from(args: MeasurementArgs) -> Self {
        RawObservation {
            bill_length_mm: args.bill_length_mm,
            bill_depth_mm: args.bill_depth_mm,
            flipper_length_mm: args.flipper_length_mm,
            body_mass_g: args.body_mass_g,
            year: args.year,
            sex: args.sex,
            island: args.island,
        }
    }
}
