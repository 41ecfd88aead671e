//! Feature encoding for ML inference
//!
//! Turns a raw observation into the numeric vector the model was trained on.
//! Continuous measurements are copied, every categorical value of every
//! field gets an indicator column, and the result is reindexed against the
//! schema so that the output order never depends on which categories a
//! particular observation happens to carry.

use crate::error::{ClassifierError, Result};
use crate::models::{EncodedFeatureVector, RawObservation};
use crate::schema::SchemaDefinition;
use std::collections::HashMap;

/// Encodes observations into schema-aligned feature vectors
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: SchemaDefinition,
    columns: Vec<String>,
}

impl FeatureEncoder {
    pub fn new(schema: SchemaDefinition) -> Self {
        let columns = schema.columns();
        Self { schema, columns }
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn encode(&self, observation: &RawObservation) -> Result<EncodedFeatureVector> {
        let generated = self.generate_columns(observation)?;
        Ok(EncodedFeatureVector::new(reindex(&generated, &self.columns)))
    }

    pub fn encode_batch(&self, observations: &[RawObservation]) -> Result<Vec<EncodedFeatureVector>> {
        observations.iter().map(|obs| self.encode(obs)).collect()
    }

    /// Columns that arise naturally from one observation, before alignment
    fn generate_columns(&self, observation: &RawObservation) -> Result<Vec<(String, f32)>> {
        let mut generated = Vec::with_capacity(self.columns.len());

        for name in self.schema.continuous() {
            let value = observation.continuous(name).ok_or_else(|| {
                ClassifierError::Configuration(format!("no observation field for column '{}'", name))
            })?;
            let narrowed = value as f32;
            if !narrowed.is_finite() {
                return Err(ClassifierError::validation(*name, "must be a finite number"));
            }
            generated.push((name.to_string(), narrowed));
        }

        for field in self.schema.categorical() {
            let value = observation.categorical(field.name).unwrap_or_default();
            if !field.allows(value) {
                return Err(ClassifierError::validation(
                    field.name,
                    format!("'{}' is not one of [{}]", value, field.values.join(", ")),
                ));
            }
            for candidate in field.values {
                let hot = if *candidate == value { 1.0 } else { 0.0 };
                generated.push((field.indicator(candidate), hot));
            }
        }

        Ok(generated)
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(SchemaDefinition::default())
    }
}

/// Align generated columns to `columns`: missing ones become 0, unknown ones
/// are dropped
pub fn reindex(generated: &[(String, f32)], columns: &[String]) -> Vec<f32> {
    let lookup: HashMap<&str, f32> = generated
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();
    columns
        .iter()
        .map(|column| lookup.get(column.as_str()).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PENGUIN_SCHEMA;

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

    fn indicator_block<'a>(encoder: &FeatureEncoder, vector: &'a [f32], field: &str) -> Vec<(&'a f32, String)> {
        encoder
            .columns()
            .iter()
            .zip(vector.iter())
            .filter(|(name, _)| name.starts_with(&format!("{}_", field)))
            .map(|(name, value)| (value, name.clone()))
            .collect()
    }

    #[test]
    fn test_reference_observation_encoding() {
        let encoder = FeatureEncoder::new(PENGUIN_SCHEMA);
        let vector = encoder.encode(&observation("male", "Biscoe")).unwrap();
        assert_eq!(
            vector.as_slice(),
            &[39.1, 18.7, 181.0, 3750.0, 2007.0, 0.0, 1.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_length_matches_schema_for_every_category() {
        let encoder = FeatureEncoder::new(PENGUIN_SCHEMA);
        for sex in ["female", "male"] {
            for island in ["Biscoe", "Dream", "Torgersen"] {
                let vector = encoder.encode(&observation(sex, island)).unwrap();
                assert_eq!(vector.len(), PENGUIN_SCHEMA.columns().len());
            }
        }
    }

    #[test]
    fn test_exactly_one_indicator_per_field() {
        let encoder = FeatureEncoder::new(PENGUIN_SCHEMA);
        for sex in ["female", "male"] {
            for island in ["Biscoe", "Dream", "Torgersen"] {
                let vector = encoder.encode(&observation(sex, island)).unwrap();
                for field in PENGUIN_SCHEMA.categorical() {
                    let block = indicator_block(&encoder, vector.as_slice(), field.name);
                    assert_eq!(block.len(), field.values.len());
                    let hot: Vec<_> = block.iter().filter(|(v, _)| **v == 1.0).collect();
                    assert_eq!(hot.len(), 1, "field {} for ({sex}, {island})", field.name);
                    assert!(block.iter().all(|(v, _)| **v == 0.0 || **v == 1.0));
                    let expected = if field.name == "sex" { sex } else { island };
                    assert_eq!(hot[0].1, field.indicator(expected));
                }
            }
        }
    }

    #[test]
    fn test_first_option_zeroes_other_indicators() {
        let encoder = FeatureEncoder::new(PENGUIN_SCHEMA);
        let sex = PENGUIN_SCHEMA.field("sex").unwrap().values[0];
        let island = PENGUIN_SCHEMA.field("island").unwrap().values[0];
        let vector = encoder.encode(&observation(sex, island)).unwrap();
        assert_eq!(&vector.as_slice()[5..], &[1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let encoder = FeatureEncoder::new(PENGUIN_SCHEMA);
        let err = encoder.encode(&observation("male", "Atlantis")).unwrap_err();
        assert!(matches!(err, ClassifierError::Validation { ref field, .. } if field == "island"));
    }

    #[test]
    fn test_non_finite_measurement_rejected() {
        let encoder = FeatureEncoder::new(PENGUIN_SCHEMA);
        let mut obs = observation("female", "Dream");
        obs.flipper_length_mm = f64::INFINITY;
        assert!(encoder.encode(&obs).is_err());

        obs.flipper_length_mm = f64::MAX;
        let err = encoder.encode(&obs).unwrap_err();
        assert!(matches!(err, ClassifierError::Validation { ref field, .. } if field == "flipper_length_mm"));
    }

    #[test]
    fn test_reindex_fills_and_drops() {
        let columns: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let generated = vec![
            ("c".to_string(), 3.0),
            ("extra".to_string(), 9.0),
            ("a".to_string(), 1.0),
        ];
        assert_eq!(reindex(&generated, &columns), vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_batch_encoding_matches_single() {
        let encoder = FeatureEncoder::default();
        let observations = vec![observation("male", "Biscoe"), observation("female", "Torgersen")];
        let batch = encoder.encode_batch(&observations).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], encoder.encode(&observations[1]).unwrap());
    }
}
