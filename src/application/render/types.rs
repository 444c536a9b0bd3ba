use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, VARY},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use thiserror::Error;

use crate::{
    application::error::HttpError,
    cache::{CachedItem, weak_etag},
    presentation::TemplateError,
};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=60";
pub const VARY_VALUE: &str = "Accept-Encoding";

/// Construction-time failures. Startup should abort on these.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("invalid renderer configuration: {message}")]
    Config { message: String },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl RendererError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Failures scoped to a single render call; both surface as a 500.
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error("no template set loaded")]
    MissingTemplateSet,
    #[error(transparent)]
    Execution(TemplateError),
}

impl IntoResponse for RenderFailure {
    fn into_response(self) -> Response {
        HttpError::from(self).into_response()
    }
}

/// Which requests may read and write the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodPolicy {
    /// Cache regardless of the request method.
    AnyMethod,
    /// Only GET requests touch the cache; everything else renders fresh.
    GetOnly,
}

impl MethodPolicy {
    pub fn caches(self, method: &Method) -> bool {
        match self {
            MethodPolicy::AnyMethod => true,
            MethodPolicy::GetOnly => method == Method::GET,
        }
    }
}

/// The decision taken for one render call.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// The client's validator matched a fresh cached entry.
    NotModified { item: Arc<CachedItem> },
    /// Served from a fresh cached entry.
    Cached {
        status: StatusCode,
        item: Arc<CachedItem>,
    },
    /// Rendered now and stored in the cache.
    Rendered {
        status: StatusCode,
        item: Arc<CachedItem>,
    },
    /// Rendered now without touching the cache.
    Uncached { status: StatusCode, body: Bytes },
}

impl RenderOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            RenderOutcome::NotModified { .. } => StatusCode::NOT_MODIFIED,
            RenderOutcome::Cached { status, .. }
            | RenderOutcome::Rendered { status, .. }
            | RenderOutcome::Uncached { status, .. } => *status,
        }
    }

    /// Body that will be written; empty for a 304.
    pub fn body(&self) -> Bytes {
        match self {
            RenderOutcome::NotModified { .. } => Bytes::new(),
            RenderOutcome::Cached { item, .. } | RenderOutcome::Rendered { item, .. } => {
                item.body.clone()
            }
            RenderOutcome::Uncached { body, .. } => body.clone(),
        }
    }

    /// Digest carried in the `ETag` header, if the response has one.
    pub fn etag(&self) -> Option<&str> {
        match self {
            RenderOutcome::NotModified { item }
            | RenderOutcome::Cached { item, .. }
            | RenderOutcome::Rendered { item, .. } => Some(item.etag.as_str()),
            RenderOutcome::Uncached { .. } => None,
        }
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(
            self,
            RenderOutcome::NotModified { .. } | RenderOutcome::Cached { .. }
        )
    }
}

impl IntoResponse for RenderOutcome {
    fn into_response(self) -> Response {
        match self {
            RenderOutcome::NotModified { item } => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::NOT_MODIFIED;
                insert_validators(response.headers_mut(), &item);
                response
            }
            RenderOutcome::Cached { status, item } | RenderOutcome::Rendered { status, item } => {
                let mut response = Response::new(Body::from(item.body.clone()));
                *response.status_mut() = status;
                let headers = response.headers_mut();
                let content_type = HeaderValue::from_str(&item.content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static(HTML_CONTENT_TYPE));
                headers.insert(CONTENT_TYPE, content_type);
                insert_validators(headers, &item);
                response
            }
            RenderOutcome::Uncached { status, body } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
                response
            }
        }
    }
}

fn insert_validators(headers: &mut HeaderMap, item: &CachedItem) {
    if let Ok(etag) = HeaderValue::from_str(&weak_etag(&item.etag)) {
        headers.insert(ETAG, etag);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(VARY, HeaderValue::from_static(VARY_VALUE));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::content_etag;

    fn item(body: &'static str) -> Arc<CachedItem> {
        Arc::new(CachedItem::new(
            Bytes::from_static(body.as_bytes()),
            content_etag(body.as_bytes()),
            HTML_CONTENT_TYPE,
        ))
    }

    #[test]
    fn get_only_policy_rejects_other_methods() {
        assert!(MethodPolicy::GetOnly.caches(&Method::GET));
        assert!(!MethodPolicy::GetOnly.caches(&Method::POST));
        assert!(!MethodPolicy::GetOnly.caches(&Method::HEAD));
        assert!(MethodPolicy::AnyMethod.caches(&Method::POST));
    }

    #[test]
    fn cached_response_carries_validators() {
        let item = item("<p>x</p>");
        let etag = item.etag.clone();
        let response = RenderOutcome::Cached {
            status: StatusCode::OK,
            item,
        }
        .into_response();

        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert_eq!(headers[ETAG], format!("W/\"{etag}\"").as_str());
        assert_eq!(headers[CACHE_CONTROL], CACHE_CONTROL_VALUE);
        assert_eq!(headers[VARY], VARY_VALUE);
    }

    #[test]
    fn uncached_response_only_sets_content_type() {
        let response = RenderOutcome::Uncached {
            status: StatusCode::ACCEPTED,
            body: Bytes::from_static(b"ok"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert!(response.headers().get(ETAG).is_none());
        assert!(response.headers().get(CACHE_CONTROL).is_none());
        assert!(response.headers().get(VARY).is_none());
    }

    #[test]
    fn not_modified_has_no_body() {
        let outcome = RenderOutcome::NotModified { item: item("<p>x</p>") };
        assert_eq!(outcome.status(), StatusCode::NOT_MODIFIED);
        assert!(outcome.body().is_empty());
        assert!(outcome.is_from_cache());
    }
}
