//! Response-caching, hot-reloadable template rendering for axum handlers.
//!
//! The [`Renderer`] sits between a parsed template set and the HTTP response:
//! it versions cache keys, expires entries after a ttl, answers conditional
//! requests with 304, minifies output on a best-effort basis and, in
//! development mode, swaps in a freshly parsed template set on every call.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
pub mod presentation;

pub use application::render::{
    DevModeSwitch, FixedMode, MethodPolicy, RenderFailure, RenderOutcome, RenderRequest,
    Renderer, RendererError, RendererOptions, RequestView, RuntimeMode,
};
pub use cache::{CacheConfig, CacheKey, CachedItem, ResponseCache};
pub use infra::minify::{Minifier, MinifyEngine, MinifyError};
pub use presentation::{FunctionMap, TemplateError, TemplateStore};
