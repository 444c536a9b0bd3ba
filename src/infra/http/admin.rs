use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::info;

use crate::application::error::HttpError;

use super::HttpState;

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/cache/invalidate", post(invalidate_cache))
        .route("/templates/reload", post(reload_templates))
}

async fn invalidate_cache(State(state): State<HttpState>) -> Response {
    state.renderer.clear_cache();
    info!(
        target = "vellum::http::admin",
        op = "invalidate_cache",
        "Response cache cleared"
    );
    StatusCode::NO_CONTENT.into_response()
}

async fn reload_templates(State(state): State<HttpState>) -> Response {
    match state.renderer.reload_templates() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::admin::reload_templates",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template reload failed",
            &err,
        )
        .into_response(),
    }
}
