//! Audio resampling using rubato
//!
//! Brings decoded audio to the configured analysis sample rate so features
//! are comparable regardless of the upload's native rate.

use crate::error::{PipelineError, PipelineResult};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Resample mono audio from `input_rate` to `output_rate`
///
/// Returns a copy when the rates already match. Uses FastFixedIn in a single
/// pass (chunk size = input length), which is deterministic for a given input.
pub fn resample_mono(input: &[f32], input_rate: u32, output_rate: u32) -> PipelineResult<Vec<f32>> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    debug!(
        "Resampling {} samples from {}Hz to {}Hz",
        input.len(),
        input_rate,
        output_rate
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0, // max_relative_ratio (no runtime changes)
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| PipelineError::InvalidAudio(format!("Failed to create resampler: {}", e)))?;

    let output = resampler
        .process(&[input], None)
        .map_err(|e| PipelineError::InvalidAudio(format!("Resampling failed: {}", e)))?;

    Ok(output.into_iter().next().unwrap_or_default())
}
