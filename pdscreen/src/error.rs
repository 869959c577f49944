//! Error types for pdscreen
//!
//! Two layers:
//! - [`PipelineError`]: the screening pipeline taxonomy, each variant with a
//!   stable external code
//! - [`ApiError`]: what the HTTP gateway renders; wraps pipeline errors and
//!   adds upload-level failures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Screening pipeline error
///
/// Stage errors propagate to the orchestrator unchanged in kind. Nothing in
/// the pipeline retries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Empty or unreadable audio input
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Classifier used before `init`
    #[error("Classifier used before initialization")]
    NotInitialized,

    /// Extractor output length differs from the model input length
    #[error("Feature shape mismatch: model expects {expected} features, got {actual}")]
    FeatureShapeMismatch { expected: usize, actual: usize },

    /// Staged upload missing or unreadable
    #[error("Staged upload unreadable: {source}")]
    UpstreamIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model failed to load or produced unusable scores
    #[error("Model error: {0}")]
    Model(String),

    /// Blocking worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Stable code exposed across the system boundary
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidAudio(_) => "INVALID_AUDIO",
            PipelineError::NotInitialized => "NOT_INITIALIZED",
            PipelineError::FeatureShapeMismatch { .. } => "FEATURE_SHAPE_MISMATCH",
            PipelineError::UpstreamIo { .. } => "UPSTREAM_IO",
            PipelineError::Model(_) => "MODEL_ERROR",
            PipelineError::Worker(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            PipelineError::InvalidAudio(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Multipart request without an `audio` field (400)
    #[error("No audio file provided: {0}")]
    NoFile(String),

    /// File extension not in the allowed list (415)
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Upload exceeds the configured cap (413)
    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Screening pipeline failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// IO error while staging
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Stable error code rendered in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoFile(_) => "NO_FILE",
            ApiError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ApiError::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Pipeline(err) => err.code(),
            ApiError::Io(_) => "IO_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(err) => err.status(),
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": self.code(),
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_codes_are_stable() {
        assert_eq!(PipelineError::InvalidAudio("x".into()).code(), "INVALID_AUDIO");
        assert_eq!(PipelineError::NotInitialized.code(), "NOT_INITIALIZED");
        assert_eq!(
            PipelineError::FeatureShapeMismatch { expected: 13, actual: 128 }.code(),
            "FEATURE_SHAPE_MISMATCH"
        );
        assert_eq!(PipelineError::Model("x".into()).code(), "MODEL_ERROR");
        assert_eq!(PipelineError::Worker("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_shape_mismatch_details() {
        let err = PipelineError::FeatureShapeMismatch { expected: 13, actual: 128 };
        assert_eq!(
            err.to_string(),
            "Feature shape mismatch: model expects 13 features, got 128"
        );
    }

    #[test]
    fn test_api_error_wraps_pipeline_code_and_status() {
        let err = ApiError::from(PipelineError::InvalidAudio("empty".into()));
        assert_eq!(err.code(), "INVALID_AUDIO");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::PayloadTooLarge("11 MiB".into());
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
