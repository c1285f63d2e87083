use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod fetch;
mod handlers;
mod middleware;
mod sampler;
mod server;
mod store;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Opens a fresh cache connection per probe; holds no per-probe state.
    pub sampler: sampler::Sampler,

    /// Whole-invocation deadline for `POST /api/test`.
    pub probe_timeout: Duration,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("cache latency probe starting");

    // ── 1. Configuration ─────────────────────────────────────────
    let cfg = config::Config::from_env()?;
    info!(
        redis_url = %cfg.redis_url,
        rounds = cfg.probe.rounds.get(),
        probe_timeout = ?cfg.probe_timeout,
        "configuration loaded"
    );

    // ── 2. Backends (the cache store is dialled per probe) ───────
    let store = store::from_url(&cfg.redis_url, cfg.redis_connect_timeout)?;
    let fetcher = Arc::new(fetch::HttpFetcher::new(cfg.fetch_timeout)?);

    // ── 3. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState {
        sampler: sampler::Sampler::new(store, fetcher, cfg.probe),
        probe_timeout: cfg.probe_timeout,
    });

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", cfg.bind_addr))?;

    info!(addr = %cfg.bind_addr, "dashboard → http://{}", cfg.bind_addr);
    info!("probe endpoint → POST http://{}/api/test", cfg.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
