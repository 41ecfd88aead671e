//! End-to-end tests against a hand-written XGBoost JSON model

use classifier_lib::{
    ClassifierError, ModelArtifact, PredictionService, RawObservation, SpeciesLabel,
    PENGUIN_SCHEMA,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn service() -> PredictionService {
    let artifact = ModelArtifact::load(&fixture("penguin_model.json"), &PENGUIN_SCHEMA).unwrap();
    PredictionService::new(Arc::new(artifact), PENGUIN_SCHEMA).unwrap()
}

fn observation(bill_length_mm: f64, bill_depth_mm: f64, island: &str) -> RawObservation {
    RawObservation {
        bill_length_mm,
        bill_depth_mm,
        flipper_length_mm: 200.0,
        body_mass_g: 4200.0,
        year: 2009,
        sex: "female".to_string(),
        island: island.to_string(),
    }
}

#[test]
fn test_fixture_loads_with_schema_width() {
    let artifact = ModelArtifact::load(&fixture("penguin_model.json"), &PENGUIN_SCHEMA).unwrap();
    assert_eq!(artifact.num_features(), PENGUIN_SCHEMA.width());
    assert_eq!(artifact.num_classes(), Some(3));
}

#[test]
fn test_fixture_classifies_each_species() {
    let service = service();
    assert_eq!(
        service.classify(&observation(39.1, 18.7, "Torgersen")).unwrap().species,
        SpeciesLabel::Adelie
    );
    assert_eq!(
        service.classify(&observation(49.5, 19.0, "Dream")).unwrap().species,
        SpeciesLabel::Chinstrap
    );
    assert_eq!(
        service.classify(&observation(47.5, 14.8, "Biscoe")).unwrap().species,
        SpeciesLabel::Gentoo
    );
}

#[test]
fn test_fixture_rejects_unknown_island() {
    let err = service()
        .classify(&observation(39.1, 18.7, "Atlantis"))
        .unwrap_err();
    assert!(matches!(err, ClassifierError::Validation { .. }));
}

#[test]
fn test_sample_dataset_path_is_not_a_model() {
    let err = ModelArtifact::load(&fixture("penguins_sample.csv"), &PENGUIN_SCHEMA).unwrap_err();
    assert!(matches!(err, ClassifierError::Artifact(_)));
}
