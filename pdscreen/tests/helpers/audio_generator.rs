//! Audio Test Fixture Generator
//!
//! Utilities for generating test recordings in memory or on disk

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for a generated tone
#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency_hz: f32,
    pub amplitude: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.0,
            sample_rate: 16000,
            channels: 1,
            frequency_hz: 220.0,
            amplitude: 0.3,
        }
    }
}

/// Encode a 16-bit PCM WAV tone into memory
pub fn wav_bytes(config: &ToneConfig) -> anyhow::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_tone(hound::WavWriter::new(&mut cursor, spec(config))?, config)?;
    Ok(cursor.into_inner())
}

/// Write a 16-bit PCM WAV tone to `path`
pub fn generate_test_wav(path: &Path, config: &ToneConfig) -> anyhow::Result<PathBuf> {
    write_tone(hound::WavWriter::create(path, spec(config))?, config)?;
    Ok(path.to_path_buf())
}

/// Deterministic pseudo-random bytes
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

fn spec(config: &ToneConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn write_tone<W>(mut writer: hound::WavWriter<W>, config: &ToneConfig) -> anyhow::Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let sample = (config.amplitude
            * (2.0 * std::f32::consts::PI * config.frequency_hz * t).sin()
            * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
