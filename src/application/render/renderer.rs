use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{http::header::IF_NONE_MATCH, response::IntoResponse, response::Response};
use bytes::Bytes;
use metrics::{counter, histogram};
use tracing::{debug, error, warn};

use crate::{
    cache::{CacheConfig, CacheKey, CachedItem, ResponseCache, content_etag, if_none_match_matches},
    infra::minify::{HTML_MEDIA_TYPE, Minifier},
    presentation::{FunctionMap, TemplateError, TemplateStore, execute_template},
};

use super::{
    mode::{FixedMode, RuntimeMode},
    request::{RenderRequest, RequestView},
    types::{HTML_CONTENT_TYPE, MethodPolicy, RenderFailure, RenderOutcome, RendererError},
};

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "vellum_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "vellum_cache_miss_total";
pub(crate) const METRIC_CACHE_EXPIRED_TOTAL: &str = "vellum_cache_expired_total";
pub(crate) const METRIC_CACHE_NOT_MODIFIED_TOTAL: &str = "vellum_cache_not_modified_total";
pub(crate) const METRIC_TEMPLATE_RELOAD_TOTAL: &str = "vellum_template_reload_total";
pub(crate) const METRIC_RENDER_MS: &str = "vellum_render_ms";

/// Inputs needed to build a [`Renderer`].
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Glob the template set is parsed from, e.g. `templates/**/*.html`.
    pub pattern: String,
    /// Deployment version folded into every cache key.
    pub version: String,
    pub cache: CacheConfig,
    pub functions: FunctionMap,
}

impl RendererOptions {
    pub fn new(pattern: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            version: version.into(),
            cache: CacheConfig::default(),
            functions: FunctionMap::default(),
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_functions(mut self, functions: FunctionMap) -> Self {
        self.functions = functions;
        self
    }
}

/// Renders named templates into cached, minified HTML responses.
///
/// One instance is shared by every request handler. The template set and the
/// response cache are the only mutable state; everything else a render needs
/// lives on its own stack.
pub struct Renderer {
    templates: TemplateStore,
    pattern: String,
    functions: FunctionMap,
    version: String,
    ttl: Duration,
    cache: ResponseCache,
    minifier: Minifier,
    mode: Arc<dyn RuntimeMode>,
}

impl Renderer {
    /// Build a renderer and parse the initial template set.
    pub fn new(options: RendererOptions) -> Result<Self, RendererError> {
        let renderer = Self::deferred(options)?;
        renderer.templates.reload(&renderer.pattern, &renderer.functions)?;
        Ok(renderer)
    }

    /// Build a renderer without parsing templates yet.
    ///
    /// Renders fail with [`RenderFailure::MissingTemplateSet`] until a reload
    /// succeeds, either through [`Renderer::reload_templates`] or the
    /// development-mode reload gate.
    pub fn deferred(options: RendererOptions) -> Result<Self, RendererError> {
        let RendererOptions {
            pattern,
            version,
            cache,
            functions,
        } = options;

        if pattern.trim().is_empty() {
            return Err(RendererError::config("template pattern must not be empty"));
        }
        if version.trim().is_empty() {
            return Err(RendererError::config("template version must not be empty"));
        }
        if cache.is_enabled() && cache.ttl.is_zero() {
            return Err(RendererError::config(
                "cache ttl must be greater than zero while caching is enabled",
            ));
        }

        Ok(Self {
            templates: TemplateStore::new(),
            pattern,
            functions,
            version,
            ttl: cache.ttl,
            cache: ResponseCache::from_config(&cache),
            minifier: Minifier::default(),
            mode: Arc::new(FixedMode(false)),
        })
    }

    pub fn with_mode(mut self, mode: impl RuntimeMode + 'static) -> Self {
        self.mode = Arc::new(mode);
        self
    }

    pub fn with_minifier(mut self, minifier: Minifier) -> Self {
        self.minifier = minifier;
        self
    }

    /// Render regardless of request method, serving from and filling the cache.
    pub fn render<R>(&self, request: &R, render: RenderRequest) -> Response
    where
        R: RequestView + ?Sized,
    {
        into_response(self.resolve(request, render, MethodPolicy::AnyMethod))
    }

    /// Render with the cache reserved for GET requests.
    ///
    /// Any other method executes the template fresh and never reads or writes
    /// the cache, even when its key collides with a cached GET.
    pub fn render_only_get<R>(&self, request: &R, render: RenderRequest) -> Response
    where
        R: RequestView + ?Sized,
    {
        into_response(self.resolve(request, render, MethodPolicy::GetOnly))
    }

    /// Run one render call and report what happened without building a response.
    pub fn resolve<R>(
        &self,
        request: &R,
        render: RenderRequest,
        policy: MethodPolicy,
    ) -> Result<RenderOutcome, RenderFailure>
    where
        R: RequestView + ?Sized,
    {
        let started_at = Instant::now();
        self.reload_if_development();

        let outcome = self.resolve_after_gate(request, render, policy);
        histogram!(METRIC_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        outcome
    }

    fn resolve_after_gate<R>(
        &self,
        request: &R,
        render: RenderRequest,
        policy: MethodPolicy,
    ) -> Result<RenderOutcome, RenderFailure>
    where
        R: RequestView + ?Sized,
    {
        if !policy.caches(request.method()) || !self.cache.is_enabled() {
            let body = self.execute(&render)?;
            return Ok(RenderOutcome::Uncached {
                status: render.status,
                body,
            });
        }

        let key = self.cache_key(request.path(), request.raw_query(), &render.template);

        if let Some(item) = self.lookup(&key) {
            let matched = request
                .header(&IF_NONE_MATCH)
                .is_some_and(|validators| if_none_match_matches(validators, &item.etag));
            if matched {
                counter!(METRIC_CACHE_NOT_MODIFIED_TOTAL).increment(1);
                debug!(
                    target = "vellum::render",
                    op = "lookup",
                    result = "not_modified",
                    key = %key,
                    "Validator matched cached response"
                );
                return Ok(RenderOutcome::NotModified { item });
            }
            return Ok(RenderOutcome::Cached {
                status: render.status,
                item,
            });
        }

        let body = self.execute(&render)?;
        let etag = content_etag(&body);
        let item = Arc::new(CachedItem::new(body, etag, HTML_CONTENT_TYPE));
        self.cache.add(key, Arc::clone(&item));

        Ok(RenderOutcome::Rendered {
            status: render.status,
            item,
        })
    }

    fn reload_if_development(&self) {
        if !self.mode.is_development() {
            return;
        }

        if let Err(err) = self.reload_templates() {
            warn!(
                target = "vellum::render",
                op = "reload",
                result = "error",
                pattern = %self.pattern,
                error = %err,
                "Template reload failed; serving previous template set"
            );
        }
    }

    /// Re-parse the template set and, on success, empty the cache.
    ///
    /// On failure the previous template set and the cache are left as they were.
    pub fn reload_templates(&self) -> Result<(), TemplateError> {
        match self.templates.reload(&self.pattern, &self.functions) {
            Ok(()) => {
                counter!(METRIC_TEMPLATE_RELOAD_TOTAL, "result" => "ok").increment(1);
                self.cache.purge();
                Ok(())
            }
            Err(err) => {
                counter!(METRIC_TEMPLATE_RELOAD_TOTAL, "result" => "error").increment(1);
                Err(err)
            }
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<CachedItem>> {
        let Some(item) = self.cache.get(key) else {
            counter!(METRIC_CACHE_MISS_TOTAL).increment(1);
            debug!(target = "vellum::render", op = "lookup", result = "miss", key = %key);
            return None;
        };

        if item.is_fresh_at(Instant::now(), self.ttl) {
            counter!(METRIC_CACHE_HIT_TOTAL).increment(1);
            debug!(target = "vellum::render", op = "lookup", result = "hit", key = %key);
            return Some(item);
        }

        self.cache.remove_entry(key, &item);
        counter!(METRIC_CACHE_EXPIRED_TOTAL).increment(1);
        debug!(target = "vellum::render", op = "lookup", result = "expired", key = %key);
        None
    }

    fn execute(&self, render: &RenderRequest) -> Result<Bytes, RenderFailure> {
        let Some(templates) = self.templates.load() else {
            error!(
                target = "vellum::render",
                op = "execute",
                template = %render.template,
                "No template set loaded"
            );
            return Err(RenderFailure::MissingTemplateSet);
        };

        let mut buffer = Vec::new();
        if let Err(err) = execute_template(&templates, &render.template, &render.context, &mut buffer)
        {
            error!(
                target = "vellum::render",
                op = "execute",
                template = %render.template,
                error = %err,
                "Template execution failed"
            );
            return Err(RenderFailure::Execution(err));
        }

        Ok(self.minifier.transform(HTML_MEDIA_TYPE, Bytes::from(buffer)))
    }

    /// The key a render of `template` for `path?query` is stored under.
    pub fn cache_key(&self, path: &str, query: &str, template: &str) -> CacheKey {
        CacheKey::new(path, query, template, self.version.as_str())
    }

    /// Drop every cached response. The cache stays enabled.
    pub fn clear_cache(&self) {
        self.cache.purge();
    }

    /// Drop every cached response and stop caching for the rest of the process.
    pub fn disable_cache(&self) {
        self.cache.disable();
    }

    pub fn invalidate_key(&self, key: &CacheKey) {
        self.cache.remove(key);
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn into_response(outcome: Result<RenderOutcome, RenderFailure>) -> Response {
    match outcome {
        Ok(outcome) => outcome.into_response(),
        Err(failure) => failure.into_response(),
    }
}
