//! Shared test helpers

#![allow(dead_code)]

pub mod audio_generator;

use pdscreen::classifier::{build_classifier, Classifier};
use pdscreen::features::extractor::FeatureExtractor;
use pdscreen::pipeline::ScreeningPipeline;
use pdscreen_common::config::{AudioConfig, FixedScore, ModelConfig, ScorerConfig};
use std::sync::Arc;

/// Classifier that always returns `scores`
pub fn fixed_classifier(scores: &[(&str, f32)]) -> Arc<dyn Classifier> {
    let config = ModelConfig {
        scorer: ScorerConfig::Fixed {
            scores: scores
                .iter()
                .map(|(label, value)| FixedScore {
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
        },
        ..ModelConfig::default()
    };
    let classifier = build_classifier(&config);
    classifier.init().expect("Fixed classifier should initialize");
    classifier
}

/// Default seeded classifier
pub fn seeded_classifier(seed: u64) -> Arc<dyn Classifier> {
    let config = ModelConfig {
        scorer: ScorerConfig::Seeded { seed },
        ..ModelConfig::default()
    };
    let classifier = build_classifier(&config);
    classifier.init().expect("Seeded classifier should initialize");
    classifier
}

pub fn pipeline_with(audio: AudioConfig, classifier: Arc<dyn Classifier>) -> ScreeningPipeline {
    let extractor = FeatureExtractor::new(audio).expect("Audio config should be valid");
    ScreeningPipeline::new(Arc::new(extractor), classifier)
}

/// Pipeline with default audio settings and a fixed score table
pub fn fixed_pipeline(scores: &[(&str, f32)]) -> ScreeningPipeline {
    pipeline_with(AudioConfig::default(), fixed_classifier(scores))
}

/// Pipeline with default audio settings and the seeded stand-in model
pub fn seeded_pipeline(seed: u64) -> ScreeningPipeline {
    pipeline_with(AudioConfig::default(), seeded_classifier(seed))
}

/// Number of entries in a directory
pub fn count_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
