//! Feature extraction
//!
//! Converts an audio byte buffer into a fixed-length [`FeatureVector`], the
//! classifier's only input.

pub mod extractor;
pub mod mel;

pub use extractor::FeatureExtractor;

use crate::error::{PipelineError, PipelineResult};

/// Fixed-length vector of finite feature values
///
/// Created per request by the extractor, consumed once by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Wrap raw values, rejecting NaN and infinities
    pub fn new(values: Vec<f32>) -> PipelineResult<Self> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidAudio(format!(
                "Feature {} is not finite",
                index
            )));
        }
        Ok(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}
