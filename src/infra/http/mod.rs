mod admin;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware};

use crate::application::render::Renderer;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct HttpState {
    pub renderer: Arc<Renderer>,
    /// Site name exposed to every template as `site_name`.
    pub site_name: Arc<str>,
}

impl HttpState {
    pub fn new(renderer: Arc<Renderer>, site_name: impl Into<Arc<str>>) -> Self {
        Self {
            renderer,
            site_name: site_name.into(),
        }
    }
}

/// Public pages plus the `/_admin` maintenance endpoints.
pub fn build_router(state: HttpState) -> Router {
    public::routes()
        .nest("/_admin", admin::routes())
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
