//! Labeled penguin datasets
//!
//! Reads the palmerpenguins CSV layout: a header row naming at least
//! `species`, `island`, the four body measurements, `sex` and `year`, in
//! any order. Extra columns are ignored.

use crate::error::{ClassifierError, Result};
use crate::models::{RawObservation, SpeciesLabel};
use crate::schema::SchemaDefinition;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io;
use std::path::Path;
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 8] = [
    "species",
    "island",
    "bill_length_mm",
    "bill_depth_mm",
    "flipper_length_mm",
    "body_mass_g",
    "sex",
    "year",
];

/// Observations with their species labels, in file order
#[derive(Debug, Clone, Default)]
pub struct LabeledDataset {
    observations: Vec<RawObservation>,
    labels: Vec<SpeciesLabel>,
    dropped_rows: usize,
}

impl LabeledDataset {
    pub fn new(observations: Vec<RawObservation>, labels: Vec<SpeciesLabel>) -> Result<Self> {
        if observations.len() != labels.len() {
            return Err(ClassifierError::Dataset(format!(
                "{} observations but {} labels",
                observations.len(),
                labels.len()
            )));
        }
        Ok(Self {
            observations,
            labels,
            dropped_rows: 0,
        })
    }

    pub fn from_csv_path(path: &Path, schema: &SchemaDefinition) -> Result<Self> {
        let reader = csv_builder().from_path(path).map_err(|e| {
            ClassifierError::Dataset(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_csv_reader(reader, schema)
    }

    pub fn from_csv_str(text: &str, schema: &SchemaDefinition) -> Result<Self> {
        Self::from_csv_reader(csv_builder().from_reader(text.as_bytes()), schema)
    }

    /// Parse CSV records, dropping rows with any missing field
    ///
    /// Sex values are lowercased before validation. Any other value the
    /// schema does not accept is an error naming the offending line.
    fn from_csv_reader<R: io::Read>(mut reader: csv::Reader<R>, schema: &SchemaDefinition) -> Result<Self> {
        let headers = reader
            .headers()
            .map_err(|e| ClassifierError::Dataset(format!("cannot read header: {}", e)))?
            .clone();
        if headers.is_empty() {
            return Err(ClassifierError::Dataset("dataset is empty".to_string()));
        }

        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers.iter().position(|h| h == name).ok_or_else(|| {
                ClassifierError::Dataset(format!("missing required column '{}'", name))
            })?;
        }

        let mut dataset = Self::default();
        for record in reader.records() {
            let record = record.map_err(|e| ClassifierError::Dataset(e.to_string()))?;
            let line_no = record.position().map_or(0, |p| p.line());

            let fields: Vec<&str> = positions.iter().map(|&p| &record[p]).collect();
            if fields.iter().any(|f| is_missing(f)) {
                dataset.dropped_rows += 1;
                continue;
            }

            let (label, observation) = parse_row(&fields)
                .map_err(|reason| ClassifierError::Dataset(format!("line {}: {}", line_no, reason)))?;
            schema
                .validate(&observation)
                .map_err(|e| ClassifierError::Dataset(format!("line {}: {}", line_no, e)))?;

            dataset.observations.push(observation);
            dataset.labels.push(label);
        }

        if dataset.is_empty() {
            return Err(ClassifierError::Dataset(
                "dataset has no complete rows".to_string(),
            ));
        }

        debug!(
            rows = dataset.len(),
            dropped = dataset.dropped_rows,
            "Dataset parsed"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[RawObservation] {
        &self.observations
    }

    pub fn labels(&self) -> &[SpeciesLabel] {
        &self.labels
    }

    /// Rows skipped because a field was missing
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Row count per species, indexed by label
    pub fn class_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }

    /// Split into (train, test) keeping each species' share in both halves
    ///
    /// Every species with at least two rows keeps one row on each side.
    /// The same seed always gives the same split.
    pub fn stratified_split(&self, test_size: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ClassifierError::Configuration(format!(
                "test size must be between 0 and 1, got {}",
                test_size
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train_idx = Vec::new();
        let mut test_idx = Vec::new();

        for label in SpeciesLabel::ALL {
            let mut members: Vec<usize> = (0..self.len())
                .filter(|&i| self.labels[i] == label)
                .collect();
            if members.is_empty() {
                continue;
            }
            members.shuffle(&mut rng);

            let count = members.len();
            let wanted = (count as f64 * test_size).round() as usize;
            let n_test = if count < 2 { 0 } else { wanted.clamp(1, count - 1) };

            test_idx.extend_from_slice(&members[..n_test]);
            train_idx.extend_from_slice(&members[n_test..]);
        }

        train_idx.sort_unstable();
        test_idx.sort_unstable();
        Ok((self.subset(&train_idx), self.subset(&test_idx)))
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            observations: indices.iter().map(|&i| self.observations[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            dropped_rows: 0,
        }
    }
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All);
    builder
}

fn is_missing(field: &str) -> bool {
    field.is_empty() || field.eq_ignore_ascii_case("na") || field.eq_ignore_ascii_case("nan")
}

/// Fields arrive in `REQUIRED_COLUMNS` order
fn parse_row(fields: &[&str]) -> std::result::Result<(SpeciesLabel, RawObservation), String> {
    let label = SpeciesLabel::from_name(fields[0])
        .ok_or_else(|| format!("unknown species '{}'", fields[0]))?;

    let number = |i: usize| -> std::result::Result<f64, String> {
        fields[i]
            .parse::<f64>()
            .map_err(|_| format!("{} is not a number: '{}'", REQUIRED_COLUMNS[i], fields[i]))
    };
    let year = number(7)?;
    if year.fract() != 0.0 {
        return Err(format!("year is not an integer: '{}'", fields[7]));
    }

    let observation = RawObservation {
        bill_length_mm: number(2)?,
        bill_depth_mm: number(3)?,
        flipper_length_mm: number(4)?,
        body_mass_g: number(5)?,
        year: year as i32,
        sex: fields[6].to_ascii_lowercase(),
        island: fields[1].to_string(),
    };
    Ok((label, observation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PENGUIN_SCHEMA;

    const SAMPLE: &str = "\
rowid,species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex,year
1,Adelie,Torgersen,39.1,18.7,181,3750,male,2007
2,Adelie,Torgersen,39.5,17.4,186,3800,female,2007
3,Adelie,Torgersen,NA,NA,NA,NA,NA,2007
4,Gentoo,Biscoe,46.1,13.2,211,4500,female,2007
5,Chinstrap,Dream,46.5,17.9,192,3500,FEMALE,2007
6,Gentoo,Biscoe,50.0,16.3,230,5700,,2007
";

    #[test]
    fn test_parse_drops_incomplete_rows() {
        let dataset = LabeledDataset::from_csv_str(SAMPLE, &PENGUIN_SCHEMA).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.dropped_rows(), 2);
        assert_eq!(
            dataset.labels(),
            &[
                SpeciesLabel::Adelie,
                SpeciesLabel::Adelie,
                SpeciesLabel::Gentoo,
                SpeciesLabel::Chinstrap
            ]
        );
        assert_eq!(dataset.class_counts(), [2, 1, 1]);
    }

    #[test]
    fn test_sex_is_lowercased() {
        let dataset = LabeledDataset::from_csv_str(SAMPLE, &PENGUIN_SCHEMA).unwrap();
        assert_eq!(dataset.observations()[3].sex, "female");
        assert_eq!(dataset.observations()[0].year, 2007);
    }

    #[test]
    fn test_missing_year_column() {
        let text = "species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex\n\
                    Adelie,Torgersen,39.1,18.7,181,3750,male\n";
        let err = LabeledDataset::from_csv_str(text, &PENGUIN_SCHEMA).unwrap_err();
        assert!(matches!(err, ClassifierError::Dataset(ref m) if m.contains("year")));
    }

    #[test]
    fn test_unknown_island_names_line() {
        let text = "species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex,year\n\
                    Adelie,Atlantis,39.1,18.7,181,3750,male,2007\n";
        let err = LabeledDataset::from_csv_str(text, &PENGUIN_SCHEMA).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 2"));
        assert!(message.contains("Atlantis"));
    }

    #[test]
    fn test_unknown_species() {
        let text = "species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex,year\n\
                    Emperor,Dream,39.1,18.7,181,3750,male,2007\n";
        assert!(LabeledDataset::from_csv_str(text, &PENGUIN_SCHEMA).is_err());
    }

    #[test]
    fn test_quoted_fields_may_span_lines() {
        let text = "species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex,year,note\n\
                    Adelie,Torgersen,39.1,18.7,181,3750,male,2007,\"banded, left flipper\"\n\
                    \"Gentoo\",Biscoe,46.1,13.2,211,4500,female,2007,\"two\nlines\"\n\
                    Adelie,Dream,39.5,17.4,186,3800,female,2008,\n";
        let dataset = LabeledDataset::from_csv_str(text, &PENGUIN_SCHEMA).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels()[1], SpeciesLabel::Gentoo);
        assert_eq!(dataset.observations()[2].island, "Dream");
    }

    #[test]
    fn test_ragged_row_is_dataset_error() {
        let text = "species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex,year\n\
                    Adelie,Torgersen,39.1,18.7\n";
        let err = LabeledDataset::from_csv_str(text, &PENGUIN_SCHEMA).unwrap_err();
        assert!(matches!(err, ClassifierError::Dataset(_)));
    }

    #[test]
    fn test_empty_dataset() {
        let err = LabeledDataset::from_csv_str("", &PENGUIN_SCHEMA).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    fn balanced(per_class: usize) -> LabeledDataset {
        let mut observations = Vec::new();
        let mut labels = Vec::new();
        for label in SpeciesLabel::ALL {
            for i in 0..per_class {
                observations.push(RawObservation {
                    bill_length_mm: 40.0 + i as f64,
                    bill_depth_mm: 18.0,
                    flipper_length_mm: 190.0,
                    body_mass_g: 4000.0,
                    year: 2008,
                    sex: "male".to_string(),
                    island: "Dream".to_string(),
                });
                labels.push(label);
            }
        }
        LabeledDataset::new(observations, labels).unwrap()
    }

    #[test]
    fn test_stratified_split_keeps_proportions() {
        let dataset = balanced(10);
        let (train, test) = dataset.stratified_split(0.2, 42).unwrap();
        assert_eq!(train.len(), 24);
        assert_eq!(test.len(), 6);
        assert_eq!(train.class_counts(), [8, 8, 8]);
        assert_eq!(test.class_counts(), [2, 2, 2]);
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let dataset = balanced(10);
        let (a, _) = dataset.stratified_split(0.2, 42).unwrap();
        let (b, _) = dataset.stratified_split(0.2, 42).unwrap();
        assert_eq!(a.observations(), b.observations());
    }

    #[test]
    fn test_invalid_test_size() {
        let dataset = balanced(3);
        assert!(dataset.stratified_split(0.0, 42).is_err());
        assert!(dataset.stratified_split(1.0, 42).is_err());
    }
}
