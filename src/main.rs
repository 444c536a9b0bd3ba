use std::{collections::HashMap, future::IntoFuture, process, sync::Arc};

use tera::Value;
use time::OffsetDateTime;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vellum::{
    application::error::AppError,
    application::render::{FixedMode, Renderer, RendererOptions},
    cache::CacheConfig,
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    presentation::FunctionMap,
};

const SITE_NAME: &str = "vellum";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let options = RendererOptions::new(
        settings.templates.pattern.clone(),
        settings.templates.version.clone(),
    )
    .with_cache(CacheConfig::from(&settings.cache))
    .with_functions(site_functions());

    let renderer =
        Renderer::new(options)?.with_mode(FixedMode(settings.templates.dev_mode));

    info!(
        target = "vellum::serve",
        pattern = %settings.templates.pattern,
        version = %settings.templates.version,
        dev_mode = settings.templates.dev_mode,
        cache_enabled = renderer.cache().is_enabled(),
        cache_capacity = renderer.cache().capacity(),
        ttl_seconds = renderer.ttl().as_secs(),
        "Renderer ready"
    );

    let state = HttpState::new(Arc::new(renderer), SITE_NAME);
    serve_http(&settings, state).await
}

fn site_functions() -> FunctionMap {
    FunctionMap::new().with(
        "current_year",
        |_args: &HashMap<String, Value>| -> tera::Result<Value> {
            Ok(Value::from(OffsetDateTime::now_utc().year()))
        },
    )
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "vellum::serve",
        address = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = {
        let shutdown = Arc::clone(&shutdown);
        async move {
            wait_for_ctrl_c().await;
            shutdown.notify_one();
        }
    };

    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(signal)
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => return server_result(joined),
        _ = shutdown.notified() => {}
    }

    let grace = settings.server.graceful_shutdown;
    info!(
        target = "vellum::serve",
        grace_seconds = grace.as_secs(),
        "Shutdown signal received, draining connections"
    );

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(
                target = "vellum::serve",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "vellum::serve",
            error = %err,
            "Failed to install ctrl-c handler; shutdown only by termination"
        );
        std::future::pending::<()>().await;
    }
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => {
            info!(target = "vellum::serve", "Server shut down cleanly");
            Ok(())
        }
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}
