//! Feature schema shared by training and serving
//!
//! [`PENGUIN_SCHEMA`] is the only place the model's column list is written
//! down. The encoder, the trainer and the artifact loader all derive their
//! column order from it.

use crate::error::{ClassifierError, Result};
use crate::models::RawObservation;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// A categorical input and the literal values it may take, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoricalField {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

impl CategoricalField {
    pub fn allows(&self, value: &str) -> bool {
        self.values.contains(&value)
    }

    /// Indicator column name for one of this field's values
    pub fn indicator(&self, value: &str) -> String {
        format!("{}_{}", self.name, value)
    }
}

/// Ordered model input columns plus the categorical expansion rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDefinition {
    version: u32,
    continuous: &'static [&'static str],
    categorical: &'static [CategoricalField],
}

/// Schema the penguin models are trained and served with
pub const PENGUIN_SCHEMA: SchemaDefinition = SchemaDefinition {
    version: 1,
    continuous: &[
        "bill_length_mm",
        "bill_depth_mm",
        "flipper_length_mm",
        "body_mass_g",
        "year",
    ],
    categorical: &[
        CategoricalField {
            name: "sex",
            values: &["female", "male"],
        },
        CategoricalField {
            name: "island",
            values: &["Biscoe", "Dream", "Torgersen"],
        },
    ],
};

impl SchemaDefinition {
    pub const fn new(
        version: u32,
        continuous: &'static [&'static str],
        categorical: &'static [CategoricalField],
    ) -> Self {
        Self {
            version,
            continuous,
            categorical,
        }
    }

    pub const fn version(&self) -> u32 {
        self.version
    }

    pub const fn continuous(&self) -> &'static [&'static str] {
        self.continuous
    }

    pub const fn categorical(&self) -> &'static [CategoricalField] {
        self.categorical
    }

    pub fn field(&self, name: &str) -> Option<&CategoricalField> {
        self.categorical.iter().find(|f| f.name == name)
    }

    /// Ordered column names: continuous first, then one indicator per
    /// categorical value
    pub fn columns(&self) -> Vec<String> {
        let indicators = self
            .categorical
            .iter()
            .flat_map(|field| field.values.iter().map(move |v| field.indicator(v)));
        self.continuous
            .iter()
            .map(|c| c.to_string())
            .chain(indicators)
            .collect()
    }

    pub fn width(&self) -> usize {
        self.continuous.len() + self.categorical.iter().map(|f| f.values.len()).sum::<usize>()
    }

    /// SHA-256 over the version and ordered columns, recorded in artifacts
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("v{}:", self.version));
        hasher.update(self.columns().join(","));
        hex::encode(hasher.finalize())
    }

    /// Check that every column is backed by an observation field and that
    /// no two columns collide
    pub fn verify_coverage(&self) -> Result<()> {
        let sample = RawObservation {
            bill_length_mm: 0.0,
            bill_depth_mm: 0.0,
            flipper_length_mm: 0.0,
            body_mass_g: 0.0,
            year: 0,
            sex: String::new(),
            island: String::new(),
        };

        for name in self.continuous {
            if sample.continuous(name).is_none() {
                return Err(ClassifierError::Configuration(format!(
                    "schema column '{}' has no observation field",
                    name
                )));
            }
        }
        for field in self.categorical {
            if sample.categorical(field.name).is_none() {
                return Err(ClassifierError::Configuration(format!(
                    "categorical field '{}' has no observation field",
                    field.name
                )));
            }
            if field.values.is_empty() {
                return Err(ClassifierError::Configuration(format!(
                    "categorical field '{}' has no values",
                    field.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for column in self.columns() {
            if !seen.insert(column.clone()) {
                return Err(ClassifierError::Configuration(format!(
                    "duplicate schema column '{}'",
                    column
                )));
            }
        }
        Ok(())
    }

    /// Reject observations with unknown categories or measurements that are
    /// not finite once narrowed to the `f32` feature width
    pub fn validate(&self, observation: &RawObservation) -> Result<()> {
        for name in self.continuous {
            if let Some(value) = observation.continuous(name) {
                if !(value as f32).is_finite() {
                    return Err(ClassifierError::validation(*name, "must be a finite number"));
                }
            }
        }
        for field in self.categorical {
            let value = observation.categorical(field.name).unwrap_or_default();
            if !field.allows(value) {
                return Err(ClassifierError::validation(
                    field.name,
                    format!("'{}' is not one of [{}]", value, field.values.join(", ")),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SchemaDefinition {
    fn default() -> Self {
        PENGUIN_SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(sex: &str, island: &str) -> RawObservation {
        RawObservation {
            bill_length_mm: 39.1,
            bill_depth_mm: 18.7,
            flipper_length_mm: 181.0,
            body_mass_g: 3750.0,
            year: 2007,
            sex: sex.to_string(),
            island: island.to_string(),
        }
    }

    #[test]
    fn test_column_order() {
        assert_eq!(
            PENGUIN_SCHEMA.columns(),
            vec![
                "bill_length_mm",
                "bill_depth_mm",
                "flipper_length_mm",
                "body_mass_g",
                "year",
                "sex_female",
                "sex_male",
                "island_Biscoe",
                "island_Dream",
                "island_Torgersen",
            ]
        );
        assert_eq!(PENGUIN_SCHEMA.width(), 10);
    }

    #[test]
    fn test_columns_are_deterministic() {
        assert_eq!(PENGUIN_SCHEMA.columns(), PENGUIN_SCHEMA.columns());
        assert_eq!(PENGUIN_SCHEMA.fingerprint(), PENGUIN_SCHEMA.fingerprint());
        assert_eq!(PENGUIN_SCHEMA.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_version() {
        let bumped = SchemaDefinition::new(2, PENGUIN_SCHEMA.continuous(), PENGUIN_SCHEMA.categorical());
        assert_ne!(bumped.fingerprint(), PENGUIN_SCHEMA.fingerprint());
    }

    #[test]
    fn test_penguin_schema_coverage() {
        PENGUIN_SCHEMA.verify_coverage().unwrap();
    }

    #[test]
    fn test_coverage_rejects_unknown_column() {
        const BROKEN: SchemaDefinition = SchemaDefinition::new(1, &["bill_length_mm", "wingspan"], &[]);
        assert!(matches!(
            BROKEN.verify_coverage(),
            Err(ClassifierError::Configuration(_))
        ));
    }

    #[test]
    fn test_coverage_rejects_duplicate_column() {
        const DUPLICATED: SchemaDefinition =
            SchemaDefinition::new(1, &["year", "year"], &[]);
        assert!(DUPLICATED.verify_coverage().is_err());
    }

    #[test]
    fn test_validate_accepts_known_values() {
        for sex in ["male", "female"] {
            for island in ["Torgersen", "Biscoe", "Dream"] {
                PENGUIN_SCHEMA.validate(&observation(sex, island)).unwrap();
            }
        }
    }

    #[test]
    fn test_validate_rejects_unknown_island() {
        let err = PENGUIN_SCHEMA.validate(&observation("male", "Atlantis")).unwrap_err();
        match err {
            ClassifierError::Validation { field, reason } => {
                assert_eq!(field, "island");
                assert!(reason.contains("Atlantis"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_is_case_sensitive() {
        assert!(PENGUIN_SCHEMA.validate(&observation("Male", "Biscoe")).is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut obs = observation("female", "Dream");
        obs.body_mass_g = f64::NAN;
        let err = PENGUIN_SCHEMA.validate(&obs).unwrap_err();
        assert!(matches!(err, ClassifierError::Validation { ref field, .. } if field == "body_mass_g"));
    }

    #[test]
    fn test_validate_rejects_values_beyond_f32() {
        let mut obs = observation("female", "Dream");
        obs.bill_length_mm = 1e300;
        assert!(obs.bill_length_mm.is_finite());
        let err = PENGUIN_SCHEMA.validate(&obs).unwrap_err();
        assert!(matches!(err, ClassifierError::Validation { ref field, .. } if field == "bill_length_mm"));
    }
}
