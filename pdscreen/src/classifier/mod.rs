//! Classifier
//!
//! A classifier maps a [`FeatureVector`] to labeled scores plus an anomaly
//! flag. It is defined only by the [`Classifier`] capability set, so a trained
//! model and a deterministic stand-in are interchangeable.
//!
//! # Lifecycle
//! uninitialized → `init()` → ready. `init` is idempotent; `classify` before
//! `init` fails with `NotInitialized`. One instance lives for the whole
//! process behind an `Arc` and is only read after `init`.

pub mod model;
pub mod scorers;

pub use model::{ClassifierSettings, ModelClassifier};
pub use scorers::{FixedScorer, LinearScorer, ScoringStrategy, SeededScorer};

use crate::error::PipelineResult;
use crate::features::FeatureVector;
use pdscreen_common::config::{ModelConfig, ScorerConfig};
use serde::Serialize;
use std::sync::Arc;

/// Static metadata describing the loaded model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub owner: String,
    pub name: String,
    pub version: String,
}

impl ProjectInfo {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            owner: config.owner.clone(),
            name: config.name.clone(),
            version: config.version.clone(),
        }
    }
}

/// Score for one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub label: String,
    /// Confidence in [0, 1]
    pub value: f32,
}

impl ClassScore {
    pub fn new(label: impl Into<String>, value: f32) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Classifier output
///
/// Scores keep declaration order and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub classification: Vec<ClassScore>,
    /// Positive-class score exceeded the configured threshold
    pub anomaly: bool,
}

impl ClassificationResult {
    /// Score for `label`, compared case-insensitively
    pub fn score(&self, label: &str) -> Option<&ClassScore> {
        self.classification
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
    }
}

/// Classifier capability set
pub trait Classifier: Send + Sync {
    /// Prepare the model; calling it again is a no-op
    fn init(&self) -> PipelineResult<()>;

    /// Model metadata, available right after construction
    fn project_info(&self) -> &ProjectInfo;

    /// Score a feature vector
    ///
    /// # Errors
    /// - `NotInitialized` before `init`
    /// - `FeatureShapeMismatch` when the vector length differs from the model input length
    /// - `Model` when the model produces unusable scores
    fn classify(&self, features: &FeatureVector) -> PipelineResult<ClassificationResult>;
}

/// Build the classifier selected by `[model.scorer]`
pub fn build_classifier(config: &ModelConfig) -> Arc<dyn Classifier> {
    let info = ProjectInfo::from_config(config);
    let settings = ClassifierSettings::from_config(config);

    match &config.scorer {
        ScorerConfig::Seeded { seed } => Arc::new(ModelClassifier::new(
            info,
            settings,
            SeededScorer::new(config.labels.clone(), config.positive_label.clone(), *seed),
        )),
        ScorerConfig::Fixed { scores } => Arc::new(ModelClassifier::new(
            info,
            settings,
            FixedScorer::new(
                scores
                    .iter()
                    .map(|s| ClassScore::new(s.label.clone(), s.value))
                    .collect(),
            ),
        )),
        ScorerConfig::Linear { weights_path } => Arc::new(ModelClassifier::new(
            info,
            settings,
            LinearScorer::new(weights_path.clone()),
        )),
    }
}
