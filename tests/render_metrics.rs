use std::collections::HashSet;
use std::fs;
use std::thread;
use std::time::Duration;

use axum::http::{Request, header::IF_NONE_MATCH};
use metrics_util::debugging::DebuggingRecorder;
use tempfile::TempDir;
use vellum::{
    CacheConfig, FixedMode, MethodPolicy, Minifier, MinifyEngine, MinifyError, RenderRequest,
    Renderer, RendererOptions, infra::minify::HTML_MEDIA_TYPE,
};

struct FailingEngine;

impl MinifyEngine for FailingEngine {
    fn minify(&self, _input: &[u8]) -> Result<Vec<u8>, MinifyError> {
        Err(MinifyError::Rewrite {
            message: "forced failure".to_string(),
        })
    }
}

fn get(uri: &str) -> Request<()> {
    Request::builder()
        .uri(uri)
        .body(())
        .expect("request should build")
}

#[test]
fn render_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("index.html"), "<p>metrics</p>").expect("write template");
    let pattern = format!("{}/**/*.html", dir.path().display());

    let renderer = Renderer::new(RendererOptions::new(pattern.clone(), "v1").with_cache(
        CacheConfig {
            capacity: 1,
            ttl: Duration::from_secs(60),
        },
    ))
    .expect("renderer builds");

    // miss, hit, 304, then an eviction when a second page displaces the first
    let first = renderer
        .resolve(&get("/"), RenderRequest::new("index.html"), MethodPolicy::AnyMethod)
        .expect("renders");
    renderer
        .resolve(&get("/"), RenderRequest::new("index.html"), MethodPolicy::AnyMethod)
        .expect("renders");
    let revalidate = Request::builder()
        .uri("/")
        .header(
            IF_NONE_MATCH,
            format!("W/\"{}\"", first.etag().expect("etag")),
        )
        .body(())
        .expect("request should build");
    renderer
        .resolve(&revalidate, RenderRequest::new("index.html"), MethodPolicy::AnyMethod)
        .expect("renders");
    renderer
        .resolve(&get("/other"), RenderRequest::new("index.html"), MethodPolicy::AnyMethod)
        .expect("renders");

    // expiry
    let expiring = Renderer::new(RendererOptions::new(pattern.clone(), "v1").with_cache(
        CacheConfig {
            capacity: 4,
            ttl: Duration::from_millis(1),
        },
    ))
    .expect("renderer builds");
    for _ in 0..2 {
        expiring
            .resolve(&get("/"), RenderRequest::new("index.html"), MethodPolicy::AnyMethod)
            .expect("renders");
        thread::sleep(Duration::from_millis(10));
    }

    // successful and failed reloads, minify fallback
    renderer.reload_templates().expect("reload succeeds");
    let fallback = Renderer::new(RendererOptions::new(pattern, "v1"))
        .expect("renderer builds")
        .with_minifier(Minifier::empty().with_engine(HTML_MEDIA_TYPE, FailingEngine))
        .with_mode(FixedMode(true));
    fs::write(dir.path().join("broken.html"), "{% if %}").expect("write broken");
    fallback
        .resolve(&get("/"), RenderRequest::new("index.html"), MethodPolicy::AnyMethod)
        .expect("renders");

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "vellum_cache_hit_total",
        "vellum_cache_miss_total",
        "vellum_cache_expired_total",
        "vellum_cache_evict_total",
        "vellum_cache_not_modified_total",
        "vellum_template_reload_total",
        "vellum_minify_fallback_total",
        "vellum_render_ms",
    ];
    for name in expected {
        assert!(names.contains(name), "missing metric `{name}` in {names:?}");
    }

    let reload_results: HashSet<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| {
            composite_key.key().name() == "vellum_template_reload_total"
        })
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "result")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(reload_results.contains("ok"));
    assert!(reload_results.contains("error"));
}
