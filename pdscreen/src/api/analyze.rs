//! Upload analysis endpoint
//!
//! POST /api/analyze: multipart form with the recording under field `audio`

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use pdscreen_common::config::UploadConfig;
use serde::Serialize;

use crate::{
    classifier::ClassificationResult,
    error::{ApiError, ApiResult},
    interpret::Interpretation,
    pipeline::staging::file_extension,
    AppState,
};

/// Multipart field carrying the recording
pub const AUDIO_FIELD: &str = "audio";

/// Allowance for multipart boundaries and part headers on top of the file cap
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Successful analysis response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub result: ClassificationResult,
    pub interpretation: Interpretation,
}

/// Recording read from the multipart body
struct AudioUpload {
    file_name: String,
    bytes: Vec<u8>,
}

/// POST /api/analyze
pub async fn analyze_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_audio_field(&mut multipart, &state.upload).await?;

    tracing::info!(
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "Analysis request received"
    );

    let staged = state.staging.stage(&upload.file_name, &upload.bytes).await?;

    match state.pipeline.analyze_staged(staged).await {
        Ok(report) => Ok(Json(AnalyzeResponse {
            success: true,
            result: report.result,
            interpretation: report.interpretation,
        })),
        Err(e) => {
            state.record_error(format!("{}: {}", e.code(), e)).await;
            Err(e.into())
        }
    }
}

/// Find the `audio` field, check its extension and read it within the size cap
///
/// Other fields are skipped.
async fn read_audio_field(
    multipart: &mut Multipart,
    limits: &UploadConfig,
) -> ApiResult<AudioUpload> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let allowed = file_extension(&file_name).is_some_and(|ext| {
            limits
                .allowed_extensions
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&ext))
        });
        if !allowed {
            return Err(ApiError::UnsupportedFormat(format!(
                "'{}' (allowed: {})",
                file_name,
                limits.allowed_extensions.join(", ")
            )));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > limits.max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "upload exceeds {} bytes",
                    limits.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(AudioUpload { file_name, bytes });
    }

    Err(ApiError::NoFile(format!(
        "multipart field '{}' is required",
        AUDIO_FIELD
    )))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

/// Build analysis routes
pub fn analyze_routes(upload: &UploadConfig) -> Router<AppState> {
    Router::new()
        .route("/api/analyze", post(analyze_upload))
        .layer(DefaultBodyLimit::max(
            upload.max_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}
