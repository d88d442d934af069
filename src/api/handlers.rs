use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::dtos::{ErrorResponse, MISSING_URL, ScrapeQuery};
use crate::app_state::AppState;
use crate::pipeline::{ExtractionOutcome, PipelineError};

/// Extract product metadata from a URL.
#[utoipa::path(
    get,
    path = "/scrape",
    tag = "scrape",
    params(ScrapeQuery),
    responses(
        (status = 200, description = "Extracted product metadata", body = ExtractionOutcome),
        (status = 400, description = "Missing or invalid url", body = ErrorResponse),
        (status = 500, description = "Fetching or rendering failed", body = ErrorResponse)
    )
)]
pub async fn scrape(State(state): State<AppState>, Query(query): Query<ScrapeQuery>) -> Response {
    let Some(url) = query.url() else {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(MISSING_URL))).into_response();
    };

    match state.pipeline.handle(url).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            warn!(url, category = err.category(), error = %err, "scrape failed");
            let status = match err {
                PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
                PipelineError::Fetch(_) | PipelineError::Render(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (
                status,
                Json(ErrorResponse::with_message(err.category(), err.to_string())),
            )
                .into_response()
        }
    }
}
