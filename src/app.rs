/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (AccessController, FailureRecorder) → Router 組み立て
 * - Middleware の適用 (access guard / failure recorder / http)
 * - axum::serve() で起動 (graceful shutdown)
 */
use std::panic;

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::services::auth::build_access_controller;
use crate::services::dead_letter::{build_failure_recorder, build_sink};
use crate::{api, config::Config, middleware, state::AppState};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,access_guard=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Handler panics are also turned into dead letters by the failure
        // middleware; this makes panics outside a request visible too.
        tracing::error!(%info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    init_panic_hook();

    let config = Config::from_env()?;

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let access = build_access_controller(config, api::v1::role_requirements());

    let sink = build_sink(config).await?;
    let recorder = build_failure_recorder(config, sink);

    Ok(AppState::new(
        access,
        recorder,
        config.request_body_limit_bytes,
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new().nest("/api/v1", api::v1::routes(state.clone()));

    // failure recorder は access guard の外側 (guard の reject も記録対象)
    let router = middleware::failure::apply(router, state.clone()).with_state(state);

    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
