//! Reading passage and model info endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{classifier::ProjectInfo, AppState};

pub const PASSAGE_TITLE: &str = "The Rainbow Passage";

/// Standard phonetically balanced text used in speech assessment
pub const PASSAGE_TEXT: &str = "When the sunlight strikes raindrops in the air, they act as a prism \
and form a rainbow. The rainbow is a division of white light into many beautiful colors. These \
take the shape of a long round arch, with its path high above, and its two ends apparently beyond \
the horizon. There is, according to legend, a boiling pot of gold at one end. People look, but no \
one ever finds it. When a man looks for something beyond his reach, his friends say he is looking \
for the pot of gold at the end of the rainbow.";

#[derive(Debug, Serialize)]
pub struct ReadingPassage {
    pub title: &'static str,
    pub passage: &'static str,
}

/// GET /api/reading-passage
pub async fn reading_passage() -> Json<ReadingPassage> {
    Json(ReadingPassage {
        title: PASSAGE_TITLE,
        passage: PASSAGE_TEXT,
    })
}

/// GET /api/model
pub async fn model_info(State(state): State<AppState>) -> Json<ProjectInfo> {
    Json(state.pipeline.classifier().project_info().clone())
}

pub fn passage_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reading-passage", get(reading_passage))
        .route("/api/model", get(model_info))
}
