//! pdscreen - speech-based Parkinson's screening service
//!
//! Library crate: audio decoding, cepstral features, classifier, result
//! interpretation, the screening pipeline and its HTTP surface.

pub mod api;
pub mod audio;
pub mod classifier;
pub mod error;
pub mod features;
pub mod interpret;
pub mod pipeline;

pub use crate::error::{ApiError, ApiResult, PipelineError, PipelineResult};

use axum::Router;
use chrono::{DateTime, Utc};
use pdscreen_common::config::UploadConfig;
use pipeline::{ScreeningPipeline, StagingArea};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ScreeningPipeline,
    pub upload: Arc<UploadConfig>,
    pub staging: StagingArea,
    pub startup_time: DateTime<Utc>,
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(pipeline: ScreeningPipeline, upload: UploadConfig) -> Self {
        let staging = StagingArea::new(upload.temp_dir.clone());
        Self {
            pipeline,
            upload: Arc::new(upload),
            staging,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember the latest failure for `/health`
    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes(&state.upload))
        .merge(api::passage_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
