//! Model classifier: lifecycle and output contract around a scoring strategy

use super::{ClassScore, ClassificationResult, Classifier, ProjectInfo, ScoringStrategy};
use crate::error::{PipelineError, PipelineResult};
use crate::features::FeatureVector;
use once_cell::sync::OnceCell;
use pdscreen_common::config::ModelConfig;
use std::collections::HashSet;
use tracing::{debug, info};

/// Contract parameters enforced around every strategy
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Feature vector length the model accepts
    pub input_length: usize,
    /// Positive-class score above which `anomaly` is raised
    pub threshold: f32,
    /// Label whose score drives the anomaly flag
    pub positive_label: String,
}

impl ClassifierSettings {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            input_length: config.input_length,
            threshold: config.threshold,
            positive_label: config.positive_label.clone(),
        }
    }
}

/// Classifier backed by a [`ScoringStrategy`]
///
/// Owns the lifecycle state and validates whatever the strategy returns, so
/// every strategy gets the same guarantees: scores finite and in [0, 1],
/// labels non-empty and unique, anomaly derived from the positive label.
pub struct ModelClassifier<S> {
    info: ProjectInfo,
    settings: ClassifierSettings,
    scorer: S,
    ready: OnceCell<()>,
}

impl<S: ScoringStrategy> ModelClassifier<S> {
    pub fn new(info: ProjectInfo, settings: ClassifierSettings, scorer: S) -> Self {
        Self {
            info,
            settings,
            scorer,
            ready: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.get().is_some()
    }

    fn validate_scores(&self, raw: Vec<ClassScore>) -> PipelineResult<Vec<ClassScore>> {
        if raw.is_empty() {
            return Err(PipelineError::Model(format!(
                "{} scorer returned no scores",
                self.scorer.name()
            )));
        }

        let mut seen = HashSet::with_capacity(raw.len());
        raw.into_iter()
            .map(|score| {
                if score.label.trim().is_empty() {
                    return Err(PipelineError::Model("Score with empty label".to_string()));
                }
                if !seen.insert(score.label.to_lowercase()) {
                    return Err(PipelineError::Model(format!(
                        "Duplicate score label '{}'",
                        score.label
                    )));
                }
                if !score.value.is_finite() {
                    return Err(PipelineError::Model(format!(
                        "Score for '{}' is not finite",
                        score.label
                    )));
                }
                Ok(ClassScore {
                    value: score.value.clamp(0.0, 1.0),
                    label: score.label,
                })
            })
            .collect()
    }
}

impl<S: ScoringStrategy> Classifier for ModelClassifier<S> {
    fn init(&self) -> PipelineResult<()> {
        if self.is_initialized() {
            debug!(model = %self.info.name, "Classifier already initialized");
            return Ok(());
        }

        self.ready.get_or_try_init(|| {
            self.scorer.prepare(self.settings.input_length)?;
            info!(
                owner = %self.info.owner,
                model = %self.info.name,
                version = %self.info.version,
                scorer = self.scorer.name(),
                input_length = self.settings.input_length,
                "Classifier initialized"
            );
            Ok::<(), PipelineError>(())
        })?;

        Ok(())
    }

    fn project_info(&self) -> &ProjectInfo {
        &self.info
    }

    fn classify(&self, features: &FeatureVector) -> PipelineResult<ClassificationResult> {
        if !self.is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        if features.len() != self.settings.input_length {
            return Err(PipelineError::FeatureShapeMismatch {
                expected: self.settings.input_length,
                actual: features.len(),
            });
        }

        let classification = self.validate_scores(self.scorer.score(features)?)?;
        let anomaly = classification
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(&self.settings.positive_label))
            .is_some_and(|s| s.value > self.settings.threshold);

        debug!(
            scorer = self.scorer.name(),
            scores = ?classification,
            anomaly,
            "Classification complete"
        );

        Ok(ClassificationResult {
            classification,
            anomaly,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FixedScorer, SeededScorer};

    fn info() -> ProjectInfo {
        ProjectInfo {
            owner: "tests".into(),
            name: "unit".into(),
            version: "3".into(),
        }
    }

    fn settings(input_length: usize) -> ClassifierSettings {
        ClassifierSettings {
            input_length,
            threshold: 0.5,
            positive_label: "parkinson".into(),
        }
    }

    fn fixed(scores: &[(&str, f32)]) -> ModelClassifier<FixedScorer> {
        ModelClassifier::new(
            info(),
            settings(3),
            FixedScorer::new(scores.iter().map(|(l, v)| ClassScore::new(*l, *v)).collect()),
        )
    }

    fn features(n: usize) -> FeatureVector {
        FeatureVector::new(vec![0.25; n]).unwrap()
    }

    #[test]
    fn test_classify_before_init_fails() {
        let classifier = fixed(&[("healthy", 0.5)]);
        let err = classifier.classify(&features(3)).unwrap_err();
        assert!(matches!(err, PipelineError::NotInitialized));
    }

    #[test]
    fn test_init_is_idempotent() {
        let classifier = fixed(&[("healthy", 0.5)]);
        classifier.init().unwrap();
        let first = classifier.project_info().clone();
        classifier.init().unwrap();
        assert_eq!(classifier.project_info(), &first);
        assert!(classifier.is_initialized());
    }

    #[test]
    fn test_shape_mismatch() {
        let classifier = fixed(&[("healthy", 0.5)]);
        classifier.init().unwrap();
        match classifier.classify(&features(5)).unwrap_err() {
            PipelineError::FeatureShapeMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_anomaly_follows_threshold() {
        let classifier = fixed(&[("healthy", 0.49), ("Parkinson", 0.51)]);
        classifier.init().unwrap();
        assert!(classifier.classify(&features(3)).unwrap().anomaly);

        let classifier = fixed(&[("healthy", 0.5), ("parkinson", 0.5)]);
        classifier.init().unwrap();
        assert!(!classifier.classify(&features(3)).unwrap().anomaly);
    }

    #[test]
    fn test_missing_positive_label_means_no_anomaly() {
        let classifier = fixed(&[("A", 0.9), ("B", 0.1)]);
        classifier.init().unwrap();
        let result = classifier.classify(&features(3)).unwrap();
        assert!(!result.anomaly);
        assert_eq!(result.classification[0].label, "A");
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let classifier = fixed(&[("healthy", -0.2), ("parkinson", 1.7)]);
        classifier.init().unwrap();
        let result = classifier.classify(&features(3)).unwrap();
        assert_eq!(result.classification[0].value, 0.0);
        assert_eq!(result.classification[1].value, 1.0);
    }

    #[test]
    fn test_unusable_scores_are_model_errors() {
        for scores in [
            vec![],
            vec![("healthy", f32::NAN)],
            vec![("healthy", 0.1), ("HEALTHY", 0.2)],
            vec![(" ", 0.1)],
        ] {
            let classifier = fixed(&scores);
            classifier.init().unwrap();
            let err = classifier.classify(&features(3)).unwrap_err();
            assert!(matches!(err, PipelineError::Model(_)), "scores {:?}", scores);
        }
    }

    #[test]
    fn test_seeded_scores_in_unit_range_and_anomaly_consistent() {
        let classifier = ModelClassifier::new(
            info(),
            settings(4),
            SeededScorer::new(vec!["healthy".into(), "parkinson".into()], "parkinson".into(), 11),
        );
        classifier.init().unwrap();

        for i in 0..200 {
            let fv = FeatureVector::new(vec![i as f32, -(i as f32), 0.5, 1.0 / (i + 1) as f32]).unwrap();
            let result = classifier.classify(&fv).unwrap();
            assert!(result.classification.iter().all(|s| (0.0..=1.0).contains(&s.value)));
            let positive = result.score("parkinson").unwrap().value;
            assert_eq!(result.anomaly, positive > 0.5);
        }
    }
}
