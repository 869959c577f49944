//! Result Interpreter
//!
//! Maps a [`ClassificationResult`] to a user-facing verdict. Pure: no I/O and
//! no failure mode. A result whose labels match neither pattern gets the
//! inconclusive fallback instead of an error.

use crate::classifier::{ClassScore, ClassificationResult};
use serde::Serialize;

/// Positive score above which the verdict is positive
const DECISION_BOUNDARY: f32 = 0.5;

/// Confidence reported when no label could be matched
const FALLBACK_CONFIDENCE: f32 = 0.5;

const DISCLAIMER: &str = "This is a screening aid, not a diagnosis. \
                          Please consult a healthcare professional for a proper evaluation.";

/// User-facing verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub has_parkinson: bool,
    /// In [0, 1]
    pub confidence: f32,
    pub message: String,
}

/// Decides which scores are the positive and negative class
///
/// Matching is by case-insensitive substring; the first match wins and score
/// order is otherwise irrelevant.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    positive: &'static [&'static str],
    negative: &'static [&'static str],
}

impl Default for LabelMatcher {
    fn default() -> Self {
        Self {
            positive: &["parkinson", "positive"],
            negative: &["healthy", "negative"],
        }
    }
}

impl LabelMatcher {
    pub fn positive<'a>(&self, scores: &'a [ClassScore]) -> Option<&'a ClassScore> {
        find_matching(scores, self.positive)
    }

    pub fn negative<'a>(&self, scores: &'a [ClassScore]) -> Option<&'a ClassScore> {
        find_matching(scores, self.negative)
    }
}

fn find_matching<'a>(scores: &'a [ClassScore], patterns: &[&str]) -> Option<&'a ClassScore> {
    scores.iter().find(|score| {
        let label = score.label.to_lowercase();
        patterns.iter().any(|p| label.contains(p))
    })
}

/// Interpret a classification with the default [`LabelMatcher`]
pub fn interpret(result: &ClassificationResult) -> Interpretation {
    interpret_with(&LabelMatcher::default(), result)
}

pub fn interpret_with(matcher: &LabelMatcher, result: &ClassificationResult) -> Interpretation {
    let scores = result.classification.as_slice();

    let Some(positive) = matcher.positive(scores) else {
        return Interpretation {
            has_parkinson: result.anomaly,
            confidence: FALLBACK_CONFIDENCE,
            message: format!(
                "The analysis was inconclusive: the model output could not be mapped to a \
                 screening result. {}",
                DISCLAIMER
            ),
        };
    };

    if positive.value > DECISION_BOUNDARY {
        Interpretation {
            has_parkinson: true,
            confidence: positive.value,
            message: format!(
                "The voice analysis shows patterns associated with Parkinson's disease \
                 ({:.1}% likelihood). {}",
                positive.value * 100.0,
                DISCLAIMER
            ),
        }
    } else {
        let confidence = matcher
            .negative(scores)
            .map_or(1.0 - positive.value, |negative| negative.value);
        Interpretation {
            has_parkinson: false,
            confidence,
            message: format!(
                "No significant patterns associated with Parkinson's disease were detected \
                 ({:.1}% confidence). {}",
                confidence * 100.0,
                DISCLAIMER
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(scores: &[(&str, f32)], anomaly: bool) -> ClassificationResult {
        ClassificationResult {
            classification: scores.iter().map(|(l, v)| ClassScore::new(*l, *v)).collect(),
            anomaly,
        }
    }

    #[test]
    fn test_negative_verdict_uses_negative_score() {
        let out = interpret(&result(&[("healthy", 0.8), ("parkinson", 0.2)], false));
        assert!(!out.has_parkinson);
        assert_eq!(out.confidence, 0.8);
        assert!(out.message.contains("80.0%"));
    }

    #[test]
    fn test_positive_verdict_order_independent() {
        let out = interpret(&result(&[("parkinson", 0.73), ("healthy", 0.27)], true));
        assert!(out.has_parkinson);
        assert_eq!(out.confidence, 0.73);
        assert!(out.message.contains("73.0%"));

        let swapped = interpret(&result(&[("healthy", 0.27), ("parkinson", 0.73)], true));
        assert_eq!(swapped, out);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let out = interpret(&result(&[("parkinson", 0.5), ("healthy", 0.5)], false));
        assert!(!out.has_parkinson);
    }

    #[test]
    fn test_negative_without_negative_label() {
        let out = interpret(&result(&[("Positive", 0.25)], false));
        assert!(!out.has_parkinson);
        assert_eq!(out.confidence, 0.75);
        assert!(out.message.contains("75.0%"));
    }

    #[test]
    fn test_substring_and_case_matching() {
        let out = interpret(&result(&[("Class_PARKINSONS", 0.9), ("Negative", 0.1)], true));
        assert!(out.has_parkinson);
        assert_eq!(out.confidence, 0.9);
    }

    #[test]
    fn test_fallback_follows_anomaly() {
        for anomaly in [false, true] {
            let out = interpret(&result(&[("A", 0.9), ("B", 0.1)], anomaly));
            assert_eq!(out.has_parkinson, anomaly);
            assert_eq!(out.confidence, 0.5);
            assert!(out.message.contains("inconclusive"));
        }
    }

    #[test]
    fn test_every_branch_carries_disclaimer() {
        for r in [
            result(&[("parkinson", 0.9)], true),
            result(&[("parkinson", 0.1), ("healthy", 0.9)], false),
            result(&[("A", 1.0)], false),
        ] {
            assert!(interpret(&r).message.contains("consult a healthcare professional"));
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(interpret(&result(&[("healthy", 1.0)], false))).unwrap();
        assert!(json.get("hasParkinson").is_some());
        assert!(json.get("confidence").is_some());
        assert!(json.get("message").is_some());
    }
}
