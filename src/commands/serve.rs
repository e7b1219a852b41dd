//! Serve command - Starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::{AuditWriteMode, Config};
use crate::domain::Argon2Hasher;
use crate::errors::{AppError, AppResult};
use crate::infra::{AuditStore, Cache, Database};
use crate::services::{AuditService, AuditWriter, Directory, JwtAuthenticator, RoleRegistry};

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    let db = Arc::new(Database::connect(&config).await?);
    let cache = connect_cache(&config).await;

    let stores = RoleRegistry::from_connection(db.get_connection());
    let mut directory = Directory::new(stores, Arc::new(Argon2Hasher));
    if config.username_lock_enabled {
        match &cache {
            Some(cache) => {
                directory = directory.with_username_lock(cache.clone());
                tracing::info!("Cross-role username lock enabled");
            }
            None => tracing::warn!("USERNAME_LOCK_ENABLED is set but Redis is not configured"),
        }
    }

    let audit_repository = Arc::new(AuditStore::new(db.get_connection()));
    let (audit, writer) = match config.audit_write_mode {
        AuditWriteMode::Inline => (AuditService::new(audit_repository), None),
        AuditWriteMode::Queued => {
            let (service, writer) =
                AuditService::queued(audit_repository, config.audit_queue_capacity);
            (service, Some(writer))
        }
    };
    tracing::info!(mode = ?config.audit_write_mode, "Audit ledger ready");

    let mut app_state = AppState::new(
        Arc::new(directory),
        Arc::new(audit),
        Arc::new(JwtAuthenticator::new(&config)),
    )
    .with_database(db);
    if let Some(cache) = cache {
        app_state = app_state.with_cache(cache);
    }

    let app = create_router(app_state);

    // Start server
    let host = args.host.unwrap_or_else(|| config.server_host.clone());
    let port = args.port.unwrap_or(config.server_port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // The router (and with it every ledger handle) is gone; flush the outbox.
    drain(writer).await;

    tracing::info!("Server stopped");
    Ok(())
}

/// Connect to Redis when configured. Failure is logged, not fatal.
async fn connect_cache(config: &Config) -> Option<Arc<Cache>> {
    let url = config.redis_url.as_deref()?;

    match Cache::try_connect(url).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, continuing without it");
            None
        }
    }
}

async fn drain(writer: Option<AuditWriter>) {
    if let Some(writer) = writer {
        tracing::info!("Draining queued audit entries...");
        writer.finished().await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
