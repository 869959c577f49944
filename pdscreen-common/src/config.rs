//! Configuration loading and config-file resolution
//!
//! Every numeric and policy parameter used by the screening pipeline lives
//! here, so a different trained model can be swapped in by configuration alone.
//!
//! # Resolution priority
//! 1. Command-line argument (highest priority)
//! 2. `PDSCREEN_CONFIG` environment variable
//! 3. User config file (`~/.config/pdscreen/config.toml` on Linux)
//! 4. System config file (`/etc/pdscreen/config.toml`, Linux only)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file never aborts startup. A config file that exists but
//! fails to parse or validate does.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PDSCREEN_CONFIG";

/// Root configuration loaded from TOML
///
/// Every section is optional; omitted sections and fields fall back to
/// compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub audio: AudioConfig,
    pub model: ModelConfig,
    pub upload: UploadConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full EnvFilter string)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// How hard the extractor tries to prove the bytes are audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioValidation {
    /// Reject only empty input; undecodable bytes are read as raw 8-bit PCM
    #[default]
    Minimal,
    /// Container and codec must be recognised and yield samples
    Full,
}

/// Feature extraction parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Analysis sample rate in Hz; decoded audio is resampled to this rate
    pub sample_rate: u32,
    /// STFT window (and FFT) size in samples
    pub window_size: usize,
    /// STFT hop in samples
    pub hop_length: usize,
    /// Length of the produced feature vector (cepstral coefficients)
    pub num_features: usize,
    /// Pre-emphasis coefficient, in [0, 1)
    pub pre_emphasis: f32,
    /// Number of triangular mel filters
    pub mel_bins: usize,
    /// Lowest filterbank frequency in Hz
    pub fmin: f32,
    /// Highest filterbank frequency in Hz (clamped to Nyquist)
    pub fmax: f32,
    /// Audio beyond this duration is ignored
    pub max_analysis_seconds: f32,
    pub validation: AudioValidation,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            window_size: 2048,
            hop_length: 512,
            num_features: 13,
            pre_emphasis: 0.97,
            mel_bins: 40,
            fmin: 0.0,
            fmax: 8000.0,
            max_analysis_seconds: 120.0,
            validation: AudioValidation::Minimal,
        }
    }
}

/// One entry of a fixed score table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixedScore {
    pub label: String,
    pub value: f32,
}

/// Scoring backend selection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScorerConfig {
    /// Deterministic stand-in keyed by a digest of the features
    Seeded {
        #[serde(default)]
        seed: u64,
    },
    /// Fixed label → score table
    Fixed { scores: Vec<FixedScore> },
    /// Per-class logistic model read from a JSON weights file
    Linear { weights_path: PathBuf },
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig::Seeded { seed: 0 }
    }
}

/// Classifier configuration and model metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub owner: String,
    pub name: String,
    pub version: String,
    /// Feature vector length the model accepts
    pub input_length: usize,
    /// Positive-class score above which `anomaly` is raised
    pub threshold: f32,
    /// Class labels in declaration order
    pub labels: Vec<String>,
    /// Label whose score drives the anomaly flag
    pub positive_label: String,
    pub scorer: ScorerConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            owner: "pdscreen".to_string(),
            name: "speech-screening".to_string(),
            version: "1".to_string(),
            input_length: 13,
            threshold: 0.5,
            labels: vec!["healthy".to_string(), "parkinson".to_string()],
            positive_label: "parkinson".to_string(),
            scorer: ScorerConfig::default(),
        }
    }
}

/// Upload gateway limits and staging location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
    /// Lowercase extensions without the leading dot
    pub allowed_extensions: Vec<String>,
    pub temp_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed_extensions: ["wav", "mp3", "m4a", "ogg"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            temp_dir: std::env::temp_dir().join("pdscreen-uploads"),
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return Err(config_error("audio.sample_rate must be greater than 0"));
        }
        if audio.window_size < 2 {
            return Err(config_error("audio.window_size must be at least 2"));
        }
        if audio.hop_length == 0 {
            return Err(config_error("audio.hop_length must be greater than 0"));
        }
        if audio.num_features == 0 {
            return Err(config_error("audio.num_features must be greater than 0"));
        }
        if audio.mel_bins == 0 {
            return Err(config_error("audio.mel_bins must be greater than 0"));
        }
        if !(0.0..1.0).contains(&audio.pre_emphasis) {
            return Err(config_error("audio.pre_emphasis must be in [0, 1)"));
        }
        if !(audio.fmin >= 0.0 && audio.fmin < audio.fmax) {
            return Err(config_error("audio.fmin must be non-negative and below audio.fmax"));
        }
        if !audio.max_analysis_seconds.is_finite() || audio.max_analysis_seconds <= 0.0 {
            return Err(config_error("audio.max_analysis_seconds must be positive"));
        }

        let model = &self.model;
        if model.input_length == 0 {
            return Err(config_error("model.input_length must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&model.threshold) {
            return Err(config_error("model.threshold must be in [0, 1]"));
        }
        validate_labels(model.labels.iter().map(String::as_str), "model.labels")?;
        if !model
            .labels
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&model.positive_label))
        {
            return Err(Error::Config(format!(
                "model.positive_label '{}' is not one of model.labels",
                model.positive_label
            )));
        }
        if let ScorerConfig::Fixed { scores } = &model.scorer {
            validate_labels(scores.iter().map(|s| s.label.as_str()), "model.scorer.scores")?;
        }

        if self.upload.max_bytes == 0 {
            return Err(config_error("upload.max_bytes must be greater than 0"));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(config_error("upload.allowed_extensions must not be empty"));
        }

        if audio.num_features != model.input_length {
            warn!(
                num_features = audio.num_features,
                input_length = model.input_length,
                "Feature count differs from model input length; every classification will fail"
            );
        }

        Ok(())
    }
}

fn config_error(msg: &str) -> Error {
    Error::Config(msg.to_string())
}

fn validate_labels<'a>(labels: impl Iterator<Item = &'a str>, field: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(Error::Config(format!("{} contains an empty label", field)));
        }
        if !seen.insert(label.to_lowercase()) {
            return Err(Error::Config(format!("{} contains duplicate label '{}'", field, label)));
        }
    }
    if seen.is_empty() {
        return Err(Error::Config(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Config-file resolver
///
/// Walks the priority list and loads the first config file it finds.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Explicitly requested path (CLI argument, then environment variable)
    pub fn explicit_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }
        std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Platform config files, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("pdscreen").join("config.toml"));
        }
        if cfg!(target_os = "linux") {
            paths.push(PathBuf::from("/etc/pdscreen/config.toml"));
        }
        paths
    }

    /// Resolve and load configuration
    ///
    /// An explicitly requested file must exist. Discovered platform files are
    /// optional: when none exists the compiled defaults are used.
    pub fn load(&self) -> Result<TomlConfig> {
        if let Some(path) = self.explicit_path() {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!(path = %path.display(), "Loading configuration");
            return TomlConfig::load_from_path(&path);
        }

        for path in Self::default_paths() {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration");
                return TomlConfig::load_from_path(&path);
            }
        }

        warn!("No config file found, using compiled defaults");
        let config = TomlConfig::default();
        config.validate()?;
        Ok(config)
    }
}

/// Create a directory (and parents) if it does not exist yet
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!(path = %path.display(), "Created directory");
    }
    Ok(())
}
