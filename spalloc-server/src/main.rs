//! The spalloc-server binary (spec §4, ambient): loads configuration, opens
//! the Catalogue Store's pool, starts the Allocation Engine tick loop, the
//! job expiry sweep, one task per BMP, and the health surface; waits for a
//! shutdown signal and gives every loop a grace period to stop cleanly.
//!
//! Grounded on `knhk-sidecar::main` (teacher: `seanchatmangpt-knhk`): env/
//! CLI configuration read up front, `tracing_subscriber::fmt` initialised
//! first thing, a single `start_server`-style async entry point.

mod cli;
mod health;

use clap::Parser;
use spalloc_epoch::EpochManager;
use spalloc_jobs::JobService;
use spalloc_store::{RetryPolicy, Store};
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = cli::Args::parse();
    let config = spalloc_config::load_config(args.config.as_deref())?;
    info!(db_url = %redact(&config.db.url), "configuration loaded");

    let retry = RetryPolicy {
        tries: config.db.lock_tries,
        delay: Duration::from_millis(config.db.lock_failed_delay_ms),
    };
    let store = Store::connect(&config.db.url, Duration::from_secs(config.db.timeout_secs), retry).await?;
    let epochs = EpochManager::new();

    let alloc_engine =
        std::sync::Arc::new(spalloc_alloc::AllocationEngine::new(store.clone(), epochs.clone(), config.allocator));
    let jobs = JobService::new(store.clone(), epochs.clone(), config.keepalive);
    let bmp_controller =
        spalloc_bmp::BmpController::start(store.clone(), epochs.clone(), config.transceiver).await?;

    let alloc_handle = {
        let engine = alloc_engine.clone();
        tokio::spawn(async move { engine.start().await })
    };
    let jobs = std::sync::Arc::new(jobs);
    let sweep_handle = {
        let jobs = jobs.clone();
        tokio::spawn(async move { jobs.start_expiry_sweep().await })
    };

    let health = axum::serve(
        tokio::net::TcpListener::bind(&args.health_addr).await?,
        health::router(health::HealthState { store: store.clone() }),
    );
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health.await {
            error!("health surface failed: {e}");
        }
    });
    info!(addr = %args.health_addr, "health surface listening");

    // The Admission API itself is wired here so a future transport layer
    // has a concrete, already-constructed implementation to depend on;
    // nothing in this binary calls it directly yet (spec §1 Non-goals: no
    // REST/auth layer in this repo).
    let _admission =
        spalloc_admission::CoreAdmission::new(store.clone(), epochs.clone(), (*jobs).clone());

    shutdown_signal().await;
    info!("shutdown signal received, stopping loops");

    alloc_engine.stop();
    jobs.stop();
    bmp_controller.stop();
    health_handle.abort();

    let grace = Duration::from_secs(args.shutdown_grace_secs);
    let joined = tokio::time::timeout(grace, async {
        let _ = alloc_handle.await;
        let _ = sweep_handle.await;
        bmp_controller.join().await;
    })
    .await;
    if joined.is_err() {
        error!(grace_secs = args.shutdown_grace_secs, "loops did not stop within the grace period, exiting anyway");
    }

    info!("spalloc-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Strips credentials from a connection URL before it is logged.
fn redact(url: &str) -> String {
    match url.find('@') {
        Some(at) => match url.find("://") {
            Some(scheme_end) => format!("{}://***{}", &url[..scheme_end], &url[at..]),
            None => "***".to_string(),
        },
        None => url.to_string(),
    }
}
