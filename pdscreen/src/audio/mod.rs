//! Audio input handling: container decoding and sample-rate conversion

pub mod decoder;
pub mod resampler;

pub use decoder::{bytes_as_pcm_u8, decode_audio_bytes, DecodedAudio};
pub use resampler::resample_mono;
