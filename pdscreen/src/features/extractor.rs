//! Cepstral Feature Extractor
//!
//! Turns an uploaded audio buffer into a fixed-length [`FeatureVector`].
//!
//! # Algorithm
//! 1. Decode to mono PCM (symphonia), or read raw 8-bit PCM under minimal validation
//! 2. Resample to the analysis rate and cap the analysed duration
//! 3. Pre-emphasis filter
//! 4. Hann-windowed STFT (rustfft), one-sided power spectrum
//! 5. Mel filterbank, log energies
//! 6. DCT-II to `num_features` cepstral coefficients per frame
//! 7. Mean of each coefficient over all frames
//!
//! The extractor is pure: no I/O, no randomness. The same bytes and the same
//! [`AudioConfig`] always give bit-identical output.

use super::mel::{DctTable, MelFilterbank};
use super::FeatureVector;
use crate::audio::{bytes_as_pcm_u8, decode_audio_bytes, resample_mono};
use crate::error::{PipelineError, PipelineResult};
use pdscreen_common::config::{AudioConfig, AudioValidation};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::debug;

/// Floor applied before taking the log of band energies
const LOG_ENERGY_FLOOR: f32 = 1e-10;

/// Cepstral feature extractor
///
/// Construction precomputes the window, filterbank, DCT table and FFT plan;
/// extraction only reads them, so one instance serves all requests.
pub struct FeatureExtractor {
    config: AudioConfig,
    window: Vec<f32>,
    filterbank: MelFilterbank,
    dct: DctTable,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FeatureExtractor {
    /// Create an extractor for the given audio configuration
    ///
    /// # Errors
    /// `Error::Config` when the filterbank range collapses after clamping
    /// `fmax` to the Nyquist frequency.
    pub fn new(config: AudioConfig) -> pdscreen_common::Result<Self> {
        let nyquist = config.sample_rate as f32 / 2.0;
        let fmax = config.fmax.min(nyquist);
        if config.fmin >= fmax {
            return Err(pdscreen_common::Error::Config(format!(
                "audio.fmin ({}) must be below min(audio.fmax, sample_rate / 2) ({})",
                config.fmin, fmax
            )));
        }

        let n = config.window_size;
        let window = (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
            .collect();
        let filterbank = MelFilterbank::new(n, config.sample_rate, config.mel_bins, config.fmin, fmax);
        let dct = DctTable::new(config.num_features, config.mel_bins);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);

        Ok(Self {
            config,
            window,
            filterbank,
            dct,
            fft,
        })
    }

    /// Configured feature vector length
    pub fn num_features(&self) -> usize {
        self.config.num_features
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Extract features from raw audio bytes
    pub fn extract(&self, audio: &[u8]) -> PipelineResult<FeatureVector> {
        self.extract_with_hint(audio, None)
    }

    /// Extract features, passing the upload's file extension to the container probe
    ///
    /// # Errors
    /// - `InvalidAudio` for empty input
    /// - `InvalidAudio` for undecodable bytes when validation is `full`
    pub fn extract_with_hint(
        &self,
        audio: &[u8],
        extension_hint: Option<&str>,
    ) -> PipelineResult<FeatureVector> {
        if audio.is_empty() {
            return Err(PipelineError::InvalidAudio("Audio input is empty".to_string()));
        }

        let max_seconds = self.config.max_analysis_seconds;
        let (samples, sample_rate) = match decode_audio_bytes(audio, extension_hint, max_seconds) {
            Ok(decoded) => (decoded.samples, decoded.sample_rate),
            Err(e) if self.config.validation == AudioValidation::Minimal => {
                debug!(error = %e, "Container not recognised, reading bytes as raw PCM");
                let limit = audio.len().min(self.max_samples());
                (bytes_as_pcm_u8(&audio[..limit]), self.config.sample_rate)
            }
            Err(e) => return Err(e),
        };

        let mut samples = resample_mono(&samples, sample_rate, self.config.sample_rate)?;
        samples.truncate(self.max_samples());

        let features = self.cepstral_means(&samples);

        debug!(
            samples = samples.len(),
            num_features = features.len(),
            "Feature extraction complete"
        );

        FeatureVector::new(features)
    }

    fn max_samples(&self) -> usize {
        (self.config.max_analysis_seconds as f64 * self.config.sample_rate as f64).ceil() as usize
    }

    /// Mean cepstral coefficients over all STFT frames
    fn cepstral_means(&self, samples: &[f32]) -> Vec<f32> {
        let emphasized = pre_emphasize(samples, self.config.pre_emphasis);
        let n = self.config.window_size;
        let hop = self.config.hop_length;
        let num_frames = if emphasized.len() <= n {
            1
        } else {
            1 + (emphasized.len() - n) / hop
        };

        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut power = vec![0.0f32; n / 2 + 1];
        let mut sums = vec![0.0f64; self.config.num_features];

        for frame in 0..num_frames {
            let start = frame * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = emphasized.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (p, bin) in power.iter_mut().zip(&buffer) {
                *p = bin.norm_sqr() / n as f32;
            }

            let log_energies: Vec<f32> = self
                .filterbank
                .apply(&power)
                .into_iter()
                .map(|e| e.max(LOG_ENERGY_FLOOR).ln())
                .collect();

            for (sum, coeff) in sums.iter_mut().zip(self.dct.apply(&log_energies)) {
                *sum += coeff as f64;
            }
        }

        sums.into_iter()
            .map(|s| (s / num_frames as f64) as f32)
            .collect()
    }
}

/// First-order high-pass: `y[n] = x[n] - a * x[n-1]`
fn pre_emphasize(samples: &[f32], coefficient: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len());
    let mut previous = 0.0f32;
    for &sample in samples {
        out.push(sample - coefficient * previous);
        previous = sample;
    }
    out
}
