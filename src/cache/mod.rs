//! Vellum response cache.
//!
//! A single in-process layer holding fully-rendered, minified HTML bodies
//! keyed by request path, query, template name and template-set version.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `vellum.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 600
//! ttl_seconds = 120
//! ```
//!
//! A capacity of zero disables the layer entirely.

mod config;
pub mod etag;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use etag::{content_etag, if_none_match_matches, weak_etag};
pub use keys::CacheKey;
pub use store::{CachedItem, ResponseCache};

pub(crate) use lock::{rw_read, rw_write};
pub(crate) use store::METRIC_CACHE_EVICT_TOTAL;
