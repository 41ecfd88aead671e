//! Core data models for the classifier

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Untransformed measurements for one penguin
///
/// Categorical fields are carried as the raw strings received so that
/// validation against the schema happens in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub bill_length_mm: f64,
    pub bill_depth_mm: f64,
    pub flipper_length_mm: f64,
    pub body_mass_g: f64,
    pub year: i32,
    pub sex: String,
    pub island: String,
}

impl RawObservation {
    /// Look up a continuous measurement by its column name
    pub fn continuous(&self, name: &str) -> Option<f64> {
        match name {
            "bill_length_mm" => Some(self.bill_length_mm),
            "bill_depth_mm" => Some(self.bill_depth_mm),
            "flipper_length_mm" => Some(self.flipper_length_mm),
            "body_mass_g" => Some(self.body_mass_g),
            "year" => Some(self.year as f64),
            _ => None,
        }
    }

    /// Look up a categorical field by name
    pub fn categorical(&self, name: &str) -> Option<&str> {
        match name {
            "sex" => Some(self.sex.as_str()),
            "island" => Some(self.island.as_str()),
            _ => None,
        }
    }
}

/// Penguin species, in the order used for class indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesLabel {
    Adelie,
    Chinstrap,
    Gentoo,
}

impl SpeciesLabel {
    pub const ALL: [SpeciesLabel; 3] = [Self::Adelie, Self::Chinstrap, Self::Gentoo];

    /// Map a model class index to a label
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ClassifierError::LabelIndex {
                index,
                num_labels: Self::ALL.len(),
            })
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|label| label.as_str() == name)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adelie => "Adelie",
            Self::Chinstrap => "Chinstrap",
            Self::Gentoo => "Gentoo",
        }
    }
}

impl fmt::Display for SpeciesLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric model input aligned with the schema columns
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EncodedFeatureVector(Vec<f32>);

impl EncodedFeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// Classification result for one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class index into [`SpeciesLabel::ALL`]
    pub prediction: usize,
    pub species: SpeciesLabel,
}

/// Failure body returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
