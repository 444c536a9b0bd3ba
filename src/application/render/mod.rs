//! Response rendering with caching, conditional requests and hot reload.
//!
//! Each render call runs the same sequence: an optional development-mode
//! reload, a cache lookup keyed on path, query, template and version, and on
//! a miss a fresh template execution whose minified output is stored and
//! served. A client whose `If-None-Match` names a cached entry's digest gets
//! a bodyless 304.

mod mode;
mod renderer;
mod request;
mod types;

pub use mode::{DevModeSwitch, FixedMode, RuntimeMode};
pub(crate) use renderer::{
    METRIC_CACHE_EXPIRED_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL,
    METRIC_CACHE_NOT_MODIFIED_TOTAL, METRIC_RENDER_MS, METRIC_TEMPLATE_RELOAD_TOTAL,
};
pub use renderer::{Renderer, RendererOptions};
pub use request::{RenderRequest, RequestView};
pub use types::{
    CACHE_CONTROL_VALUE, HTML_CONTENT_TYPE, MethodPolicy, RenderFailure, RenderOutcome,
    RendererError, VARY_VALUE,
};
