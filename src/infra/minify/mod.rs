//! Best-effort output minification.
//!
//! Engines are registered per media type. [`Minifier::transform`] never
//! fails: any engine error is logged and the original bytes are returned.

mod css;
mod html;

use std::{collections::HashMap, fmt, sync::Arc};

use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

pub use css::CssMinifier;
pub use html::HtmlMinifier;

pub const HTML_MEDIA_TYPE: &str = "text/html";
pub const CSS_MEDIA_TYPE: &str = "text/css";

pub(crate) const METRIC_MINIFY_FALLBACK_TOTAL: &str = "vellum_minify_fallback_total";

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("no minifier registered for `{content_type}`")]
    Unsupported { content_type: String },
    #[error("input is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("rewrite failed: {message}")]
    Rewrite { message: String },
}

/// A byte-stream transform for one media type.
pub trait MinifyEngine: Send + Sync {
    fn minify(&self, input: &[u8]) -> Result<Vec<u8>, MinifyError>;
}

/// Media-type keyed registry of minification engines.
#[derive(Clone)]
pub struct Minifier {
    engines: HashMap<String, Arc<dyn MinifyEngine>>,
}

impl Default for Minifier {
    /// HTML and CSS engines with their default options.
    fn default() -> Self {
        Self::empty()
            .with_engine(HTML_MEDIA_TYPE, HtmlMinifier::default())
            .with_engine(CSS_MEDIA_TYPE, CssMinifier)
    }
}

impl Minifier {
    /// A minifier that passes every content type through untouched.
    pub fn empty() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    pub fn with_engine(mut self, content_type: &str, engine: impl MinifyEngine + 'static) -> Self {
        self.register(content_type, Arc::new(engine));
        self
    }

    pub fn register(&mut self, content_type: &str, engine: Arc<dyn MinifyEngine>) {
        self.engines.insert(media_type(content_type), engine);
    }

    /// Run the engine registered for `content_type`, surfacing its error.
    pub fn try_minify(&self, content_type: &str, input: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let engine = self.engines.get(&media_type(content_type)).ok_or_else(|| {
            MinifyError::Unsupported {
                content_type: content_type.to_string(),
            }
        })?;
        engine.minify(input)
    }

    /// Minify `input`, substituting the original bytes on any failure.
    pub fn transform(&self, content_type: &str, input: Bytes) -> Bytes {
        match self.try_minify(content_type, &input) {
            Ok(minified) => Bytes::from(minified),
            Err(MinifyError::Unsupported { .. }) => {
                debug!(
                    target = "vellum::minify",
                    content_type, "no engine registered, passing through"
                );
                input
            }
            Err(err) => {
                counter!(METRIC_MINIFY_FALLBACK_TOTAL).increment(1);
                warn!(
                    target = "vellum::minify",
                    op = "transform",
                    result = "fallback",
                    content_type,
                    error = %err,
                    bytes = input.len(),
                    "minify failed, serving unminified output"
                );
                input
            }
        }
    }
}

impl fmt::Debug for Minifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.engines.keys().collect();
        types.sort();
        f.debug_struct("Minifier").field("engines", &types).finish()
    }
}

/// `text/html; charset=utf-8` -> `text/html`
fn media_type(content_type: &str) -> String {
    content_type
        .split_once(';')
        .map_or(content_type, |(essence, _)| essence)
        .trim()
        .to_ascii_lowercase()
}
