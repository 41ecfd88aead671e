//! Offline training pipeline
//!
//! Uses the same [`FeatureEncoder`] and [`SchemaDefinition`] as serving, so
//! the column list the booster sees is exactly the one the gateway encodes.

mod booster;
mod dataset;
mod evaluation;

pub use booster::{BoosterParams, GradientBooster};
pub use dataset::LabeledDataset;
pub use evaluation::{ClassMetrics, ClassificationReport};

use crate::error::{ClassifierError, Result};
use crate::models::SpeciesLabel;
use crate::predictor::{
    Classifier, FeatureEncoder, ModelArtifact, TreeEnsemble, SCHEMA_FINGERPRINT_ATTR,
    SCHEMA_VERSION_ATTR,
};
use crate::schema::SchemaDefinition;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(flatten)]
    pub booster: BoosterParams,
    /// Fraction of each species held out for evaluation
    pub test_size: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            booster: BoosterParams::default(),
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub dropped_rows: usize,
    pub num_trees: usize,
    pub train: ClassificationReport,
    pub test: ClassificationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A fitted ensemble and its evaluation
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub ensemble: TreeEnsemble,
    pub report: TrainingReport,
}

#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    encoder: FeatureEncoder,
    booster: GradientBooster,
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(schema: SchemaDefinition, config: TrainingConfig) -> Result<Self> {
        schema.verify_coverage()?;
        let booster = GradientBooster::new(config.booster.clone())?;
        Ok(Self {
            encoder: FeatureEncoder::new(schema),
            booster,
            config,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split, encode, fit and evaluate without touching the filesystem
    pub fn fit(&self, dataset: &LabeledDataset) -> Result<TrainedModel> {
        let (train, test) = dataset.stratified_split(self.config.test_size, self.config.seed)?;
        if train.class_counts().iter().any(|&c| c == 0) {
            return Err(ClassifierError::Dataset(format!(
                "every species needs training rows, got {:?}",
                train.class_counts()
            )));
        }

        let schema = self.encoder.schema();
        let train_rows = self.encoder.encode_batch(train.observations())?;
        let train_labels: Vec<usize> = train.labels().iter().map(SpeciesLabel::index).collect();

        let mut ensemble = self
            .booster
            .fit(&train_rows, &train_labels, SpeciesLabel::ALL.len())?
            .with_feature_names(
                self.encoder.columns().to_vec(),
                vec!["float".to_string(); self.encoder.columns().len()],
            )?;
        ensemble.set_attribute(SCHEMA_FINGERPRINT_ATTR, schema.fingerprint());
        ensemble.set_attribute(SCHEMA_VERSION_ATTR, schema.version().to_string());

        let train_report = self.evaluate(&ensemble, &train)?;
        let test_report = self.evaluate(&ensemble, &test)?;

        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            train_f1 = train_report.weighted_f1,
            test_f1 = test_report.weighted_f1,
            "Model fitted"
        );

        let report = TrainingReport {
            train_rows: train.len(),
            test_rows: test.len(),
            dropped_rows: dataset.dropped_rows(),
            num_trees: ensemble.num_trees(),
            train: train_report,
            test: test_report,
            output: None,
            sha256: None,
        };
        Ok(TrainedModel { ensemble, report })
    }

    /// Weighted F1 and per-class report of `ensemble` on `dataset`
    pub fn evaluate(&self, ensemble: &TreeEnsemble, dataset: &LabeledDataset) -> Result<ClassificationReport> {
        let rows = self.encoder.encode_batch(dataset.observations())?;
        let predicted = rows
            .iter()
            .map(|row| ensemble.predict(row))
            .collect::<Result<Vec<_>>>()?;
        let actual: Vec<usize> = dataset.labels().iter().map(SpeciesLabel::index).collect();
        Ok(ClassificationReport::new(&actual, &predicted))
    }

    /// Load a CSV dataset, fit, save the model to `output` and reload it
    /// through the serving loader
    pub fn run(&self, dataset_path: &Path, output: &Path) -> Result<TrainingReport> {
        let dataset = LabeledDataset::from_csv_path(dataset_path, self.encoder.schema())?;
        info!(
            path = %dataset_path.display(),
            rows = dataset.len(),
            dropped = dataset.dropped_rows(),
            "Dataset loaded"
        );

        let TrainedModel { ensemble, mut report } = self.fit(&dataset)?;
        ensemble.save(output)?;

        let artifact = ModelArtifact::load(output, self.encoder.schema())?;
        report.output = Some(output.to_path_buf());
        report.sha256 = Some(artifact.info().sha256.clone());
        Ok(report)
    }
}
