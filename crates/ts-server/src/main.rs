use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ts_data::{Feed, MemoryStore, ReplayFeed, SimulatedFeed, SimulationConfig, Store};
use ts_scanner::ScannerService;
use ts_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    let feed = build_feed(&config)?;
    let store = build_store(&config)?;
    info!(feed = feed.name(), store = store.name(), "backends ready");

    let scanner = Arc::new(ScannerService::new(feed, store, config.scan_loop()));
    let app = router(AppState::new(Arc::clone(&scanner), config.subscriber_buffer));

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("cannot bind {}", config.addr))?;
    info!(addr = %config.addr, "TokenScope listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scanner.stop_scan().await;
    info!("server closed");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn build_feed(config: &ServerConfig) -> anyhow::Result<Box<dyn Feed>> {
    if let Some(path) = &config.replay_file {
        let feed = ReplayFeed::from_json_lines(path)
            .with_context(|| format!("cannot load replay file {}", path.display()))?
            .restamped();
        return Ok(Box::new(feed));
    }

    Ok(Box::new(SimulatedFeed::new(SimulationConfig {
        seed: config.feed_seed,
        ..Default::default()
    })))
}

#[cfg(feature = "duckdb")]
fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn Store>> {
    match &config.db_path {
        Some(path) => {
            let store = ts_data::DuckDbStore::open(path)
                .with_context(|| format!("cannot open database {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(not(feature = "duckdb"))]
fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn Store>> {
    if let Some(path) = &config.db_path {
        anyhow::bail!(
            "{} is set to {} but this build has no duckdb support; rebuild with --features duckdb",
            ts_server::config::ENV_DB_PATH,
            path.display()
        );
    }
    Ok(Arc::new(MemoryStore::new()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
