//! Audio Decoding
//!
//! **Purpose:** Decode an in-memory audio upload to mono f32 PCM samples
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, AAC/M4A, OGG, FLAC).

use crate::error::{PipelineError, PipelineResult};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0], always finite)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Decode an audio byte buffer to mono f32 PCM samples
///
/// **Algorithm:**
/// 1. Probe the container (extension hint optional)
/// 2. Find the default audio track and create its decoder
/// 3. Decode packets, averaging channels to mono
/// 4. Stop once `max_seconds` of audio has been collected
///
/// Corrupt packets are skipped. A container that cannot be probed, a track
/// without a sample rate, or a stream that yields no samples is an
/// `InvalidAudio` error.
pub fn decode_audio_bytes(
    bytes: &[u8],
    extension_hint: Option<&str>,
    max_seconds: f32,
) -> PipelineResult<DecodedAudio> {
    tracing::debug!(bytes = bytes.len(), hint = ?extension_hint, "Decoding audio buffer");

    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PipelineError::InvalidAudio(format!("Unrecognised audio container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::InvalidAudio("No audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|rate| *rate > 0)
        .ok_or_else(|| PipelineError::InvalidAudio("Sample rate unknown".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::InvalidAudio(format!("Unsupported codec: {}", e)))?;

    let max_samples = (max_seconds as f64 * sample_rate as f64).ceil() as usize;
    let mut samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    while samples.len() < max_samples {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // End of stream
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(PipelineError::InvalidAudio(format!("Error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => mix_to_mono(&decoded, &mut samples),
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                tracing::trace!(reason = msg, "Skipping corrupt packet");
            }
            Err(e) => {
                return Err(PipelineError::InvalidAudio(format!("Decoding failed: {}", e)));
            }
        }
    }

    samples.truncate(max_samples);

    if samples.is_empty() {
        return Err(PipelineError::InvalidAudio(
            "Audio stream contains no samples".to_string(),
        ));
    }

    tracing::debug!(
        total_samples = samples.len(),
        sample_rate,
        skipped_packets,
        duration_seconds = format!("{:.2}", samples.len() as f64 / sample_rate as f64),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Interpret arbitrary bytes as unsigned 8-bit PCM
///
/// Used when validation is minimal and the bytes do not probe as a known
/// container.
pub fn bytes_as_pcm_u8(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect()
}

/// Append an audio buffer to `out`, averaging all channels to mono
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_channels(&**buf, out),
        AudioBufferRef::U16(buf) => mix_channels(&**buf, out),
        AudioBufferRef::U24(buf) => mix_channels(&**buf, out),
        AudioBufferRef::U32(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S8(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S16(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S24(buf) => mix_channels(&**buf, out),
        AudioBufferRef::S32(buf) => mix_channels(&**buf, out),
        AudioBufferRef::F32(buf) => mix_channels(&**buf, out),
        AudioBufferRef::F64(buf) => mix_channels(&**buf, out),
    }
}

fn mix_channels<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    if num_channels == 0 {
        return;
    }

    out.reserve(buf.frames());
    for frame_idx in 0..buf.frames() {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        let mono = sum / num_channels as f32;
        // NaN/Inf in float sources would poison every downstream feature
        out.push(if mono.is_finite() { mono } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, seconds: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let total = (seconds * sample_rate as f32) as usize;
            for i in 0..total {
                let t = i as f32 / sample_rate as f32;
                let sample = (0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() * i16::MAX as f32) as i16;
                for _ in 0..channels {
                    writer.write_sample(sample).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_wav_stereo_to_mono() {
        let bytes = wav_bytes(16000, 2, 0.5);
        let decoded = decode_audio_bytes(&bytes, Some("wav"), 60.0).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.samples.len(), 8000);
        assert!(decoded.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_decode_respects_duration_cap() {
        let bytes = wav_bytes(8000, 1, 2.0);
        let decoded = decode_audio_bytes(&bytes, None, 0.5).unwrap();
        assert_eq!(decoded.samples.len(), 4000);
    }

    #[test]
    fn test_decode_rejects_non_audio() {
        let err = decode_audio_bytes(b"definitely not an audio container", None, 60.0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidAudio(_)));
    }

    #[test]
    fn test_bytes_as_pcm_u8_range() {
        let pcm = bytes_as_pcm_u8(&[0, 128, 255]);
        assert_eq!(pcm[0], -1.0);
        assert_eq!(pcm[1], 0.0);
        assert!(pcm[2] < 1.0 && pcm[2] > 0.99);
    }
}
