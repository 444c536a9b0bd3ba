use axum::{
    Form, Router,
    body::Body,
    extract::{FromRequest, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tera::Context;

use crate::application::render::RenderRequest;

use super::HttpState;

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/contact", get(contact).post(contact_submit))
        .route("/_health", get(health))
        .fallback(not_found)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactForm {
    name: String,
    message: String,
}

fn page_context(state: &HttpState, path: &str) -> Context {
    let mut context = Context::new();
    context.insert("site_name", state.site_name.as_ref());
    context.insert("path", path);
    context
}

async fn index(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let context = page_context(&state, request.uri().path());
    state
        .renderer
        .render(&request, RenderRequest::new("index.html").with_context(context))
}

async fn about(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let context = page_context(&state, request.uri().path());
    state
        .renderer
        .render(&request, RenderRequest::new("about.html").with_context(context))
}

async fn contact(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let mut context = page_context(&state, request.uri().path());
    context.insert("submitted", &false);
    state
        .renderer
        .render_only_get(&request, RenderRequest::new("contact.html").with_context(context))
}

async fn contact_submit(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let form = match Form::<ContactForm>::from_request(
        Request::from_parts(parts.clone(), body),
        &state,
    )
    .await
    {
        Ok(Form(form)) => form,
        Err(rejection) => return rejection.into_response(),
    };

    let mut context = page_context(&state, parts.uri.path());
    context.insert("submitted", &true);
    context.insert("name", form.name.trim());
    context.insert("message_length", &form.message.chars().count());

    state
        .renderer
        .render_only_get(&parts, RenderRequest::new("contact.html").with_context(context))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn not_found(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let context = page_context(&state, request.uri().path());
    let render = RenderRequest::new("not_found.html")
        .with_status(StatusCode::NOT_FOUND)
        .with_context(context);
    state.renderer.render_only_get(&request, render)
}
