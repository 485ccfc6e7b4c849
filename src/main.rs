//! virtual-storage server entry point.
//!
//! Prepares the storage directories, connects to PostgreSQL and serves the
//! REST API until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;

use virtual_storage::api;
use virtual_storage::app_state::AppState;
use virtual_storage::config::StorageConfig;
use virtual_storage::logging;
use virtual_storage::persistence::postgres::{self, PgFileRepository, PgFolderRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; logging settings come from it
    let mut config = StorageConfig::from_env()?;
    logging::init(&config.log_level, config.log_format);
    tracing::info!(
        service = %config.service_name,
        addr = %config.listen_addr,
        "starting virtual-storage"
    );

    // Storage roots must exist before paths are canonicalised
    for dir in [&config.storage_base_path, &config.staging_path] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    config.storage_base_path = tokio::fs::canonicalize(&config.storage_base_path).await?;
    config.staging_path = tokio::fs::canonicalize(&config.staging_path).await?;
    tracing::info!(
        base = %config.storage_base_path.display(),
        staging = %config.staging_path.display(),
        "storage ready"
    );

    // Database
    let pool = postgres::connect_lazy(&config)?;
    match postgres::ping(&pool).await {
        Ok(()) => {
            tracing::info!("database reachable");
            if config.run_migrations {
                postgres::run_migrations(&pool)
                    .await
                    .context("applying migrations")?;
                tracing::info!("migrations applied");
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "database unreachable, continuing without migrations");
        }
    }

    // Build application
    let app_state = AppState::new(
        &config,
        Arc::new(PgFolderRepository::new(pool.clone())),
        Arc::new(PgFileRepository::new(pool.clone())),
    );
    let app = api::build_app(app_state, config.max_upload_bytes);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
