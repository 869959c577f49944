//! Scoring strategies
//!
//! A strategy turns a feature vector into raw per-class scores.
//! [`ModelClassifier`](super::ModelClassifier) handles lifecycle and output
//! validation, so strategies stay small.

use super::ClassScore;
use crate::error::{PipelineError, PipelineResult};
use crate::features::FeatureVector;
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::info;

/// Raw per-class scoring
pub trait ScoringStrategy: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Load or validate model state; called once from `Classifier::init`
    fn prepare(&self, _input_length: usize) -> PipelineResult<()> {
        Ok(())
    }

    fn score(&self, features: &FeatureVector) -> PipelineResult<Vec<ClassScore>>;
}

/// Deterministic stand-in model
///
/// The positive-class score is drawn from an RNG seeded with a SHA-256 digest
/// of the feature values and the configured seed. Remaining labels share
/// `1 - p` evenly. Identical features always give identical scores.
#[derive(Debug, Clone)]
pub struct SeededScorer {
    labels: Vec<String>,
    positive_label: String,
    seed: u64,
}

impl SeededScorer {
    pub fn new(labels: Vec<String>, positive_label: String, seed: u64) -> Self {
        Self {
            labels,
            positive_label,
            seed,
        }
    }

    fn rng_for(&self, features: &FeatureVector) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        for value in features.as_slice() {
            hasher.update(value.to_le_bytes());
        }
        let digest = hasher.finalize();

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        StdRng::from_seed(seed)
    }
}

impl ScoringStrategy for SeededScorer {
    fn name(&self) -> &'static str {
        "seeded"
    }

    fn score(&self, features: &FeatureVector) -> PipelineResult<Vec<ClassScore>> {
        let positive: f32 = self.rng_for(features).gen();
        let others = self
            .labels
            .iter()
            .filter(|l| !l.eq_ignore_ascii_case(&self.positive_label))
            .count();
        let share = if others > 0 {
            (1.0 - positive) / others as f32
        } else {
            0.0
        };

        Ok(self
            .labels
            .iter()
            .map(|label| {
                let value = if label.eq_ignore_ascii_case(&self.positive_label) {
                    positive
                } else {
                    share
                };
                ClassScore::new(label.clone(), value)
            })
            .collect())
    }
}

/// Returns the same configured scores for every input
#[derive(Debug, Clone)]
pub struct FixedScorer {
    scores: Vec<ClassScore>,
}

impl FixedScorer {
    pub fn new(scores: Vec<ClassScore>) -> Self {
        Self { scores }
    }
}

impl ScoringStrategy for FixedScorer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn score(&self, _features: &FeatureVector) -> PipelineResult<Vec<ClassScore>> {
        Ok(self.scores.clone())
    }
}

/// One output class of a linear model
#[derive(Debug, Clone, Deserialize)]
struct LinearClass {
    label: String,
    weights: Vec<f32>,
    #[serde(default)]
    bias: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct LinearModel {
    classes: Vec<LinearClass>,
}

/// Per-class logistic scores from a JSON weights file
///
/// File shape: `{"classes": [{"label": "...", "weights": [...], "bias": 0.0}]}`.
/// Each class scores `sigmoid(w · x + b)`. The file is read by `prepare`.
#[derive(Debug)]
pub struct LinearScorer {
    weights_path: PathBuf,
    model: OnceCell<LinearModel>,
}

impl LinearScorer {
    pub fn new(weights_path: PathBuf) -> Self {
        Self {
            weights_path,
            model: OnceCell::new(),
        }
    }

    fn load(&self, input_length: usize) -> PipelineResult<LinearModel> {
        let text = std::fs::read_to_string(&self.weights_path).map_err(|e| {
            PipelineError::Model(format!(
                "Cannot read weights file {}: {}",
                self.weights_path.display(),
                e
            ))
        })?;

        let model: LinearModel = serde_json::from_str(&text).map_err(|e| {
            PipelineError::Model(format!(
                "Malformed weights file {}: {}",
                self.weights_path.display(),
                e
            ))
        })?;

        if model.classes.is_empty() {
            return Err(PipelineError::Model("Weights file declares no classes".to_string()));
        }
        for class in &model.classes {
            if class.weights.len() != input_length {
                return Err(PipelineError::Model(format!(
                    "Class '{}' has {} weights, model input length is {}",
                    class.label,
                    class.weights.len(),
                    input_length
                )));
            }
            if class.weights.iter().any(|w| !w.is_finite()) || !class.bias.is_finite() {
                return Err(PipelineError::Model(format!(
                    "Class '{}' has non-finite parameters",
                    class.label
                )));
            }
        }

        Ok(model)
    }
}

impl ScoringStrategy for LinearScorer {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn prepare(&self, input_length: usize) -> PipelineResult<()> {
        let model = self.model.get_or_try_init(|| self.load(input_length))?;
        info!(
            path = %self.weights_path.display(),
            classes = model.classes.len(),
            "Loaded linear model weights"
        );
        Ok(())
    }

    fn score(&self, features: &FeatureVector) -> PipelineResult<Vec<ClassScore>> {
        let model = self.model.get().ok_or(PipelineError::NotInitialized)?;

        Ok(model
            .classes
            .iter()
            .map(|class| {
                let z: f32 = class
                    .weights
                    .iter()
                    .zip(features.as_slice())
                    .map(|(w, x)| w * x)
                    .sum::<f32>()
                    + class.bias;
                ClassScore::new(class.label.clone(), sigmoid(z))
            })
            .collect())
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}
