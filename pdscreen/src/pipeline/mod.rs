//! Pipeline Orchestrator
//!
//! Sequences Extractor → Classifier → Interpreter for one request.
//!
//! Stages run on tokio's blocking pool. Any stage failure short-circuits the
//! request and is returned unchanged in kind; nothing is retried.

pub mod staging;

pub use staging::{StagedUpload, StagingArea};

use crate::classifier::{ClassificationResult, Classifier};
use crate::error::{PipelineError, PipelineResult};
use crate::features::extractor::FeatureExtractor;
use crate::interpret::{interpret, Interpretation};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Successful analysis of one recording
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub result: ClassificationResult,
    pub interpretation: Interpretation,
}

/// Screening pipeline
///
/// Cheap to clone; the extractor and classifier are shared read-only.
#[derive(Clone)]
pub struct ScreeningPipeline {
    extractor: Arc<FeatureExtractor>,
    classifier: Arc<dyn Classifier>,
}

impl ScreeningPipeline {
    pub fn new(extractor: Arc<FeatureExtractor>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            extractor,
            classifier,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Analyze an in-memory recording
    pub async fn analyze(&self, audio: Vec<u8>) -> PipelineResult<AnalysisReport> {
        self.analyze_with_hint(audio, None).await
    }

    /// Analyze a staged upload, removing the staged file before returning
    ///
    /// # Errors
    /// `UpstreamIo` when the staged file is missing or unreadable, otherwise
    /// whatever the stages report.
    pub async fn analyze_staged(&self, staged: StagedUpload) -> PipelineResult<AnalysisReport> {
        let bytes = tokio::fs::read(staged.path())
            .await
            .map_err(|source| PipelineError::UpstreamIo {
                path: staged.path().to_path_buf(),
                source,
            });

        let report = match bytes {
            Ok(bytes) => self.analyze_with_hint(bytes, staged.extension()).await,
            Err(e) => Err(e),
        };

        drop(staged);
        report
    }

    async fn analyze_with_hint(
        &self,
        audio: Vec<u8>,
        extension_hint: Option<String>,
    ) -> PipelineResult<AnalysisReport> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("analysis", %request_id);

        async move {
            let started = Instant::now();
            let bytes = audio.len();

            let outcome = self.run_stages(audio, extension_hint).await;

            match &outcome {
                Ok(report) => info!(
                    bytes,
                    anomaly = report.result.anomaly,
                    has_parkinson = report.interpretation.has_parkinson,
                    confidence = report.interpretation.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis complete"
                ),
                Err(e) => warn!(bytes, code = e.code(), error = %e, "Analysis failed"),
            }

            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        audio: Vec<u8>,
        extension_hint: Option<String>,
    ) -> PipelineResult<AnalysisReport> {
        if audio.is_empty() {
            return Err(PipelineError::InvalidAudio("Audio input is empty".to_string()));
        }

        let span = tracing::Span::current();
        let result = tokio::task::spawn_blocking({
            let extractor = Arc::clone(&self.extractor);
            let classifier = Arc::clone(&self.classifier);

            move || -> PipelineResult<ClassificationResult> {
                let _entered = span.enter();

                let features = extractor.extract_with_hint(&audio, extension_hint.as_deref())?;
                debug!(num_features = features.len(), "Features extracted");

                classifier.init()?;
                classifier.classify(&features)
            }
        })
        .await
        .map_err(|e| PipelineError::Worker(format!("Task join error: {}", e)))??;

        let interpretation = interpret(&result);

        Ok(AnalysisReport {
            result,
            interpretation,
        })
    }
}

impl std::fmt::Debug for ScreeningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreeningPipeline")
            .field("extractor", &self.extractor)
            .field("model", self.classifier.project_info())
            .finish()
    }
}
