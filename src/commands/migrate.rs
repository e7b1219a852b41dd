//! Migrate command - Database migration management.

use sea_orm::DbErr;

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    tracing::info!(action = ?args.action, "Running migration command...");

    // Connect without auto-running migrations for manual control
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match args.action {
        MigrateAction::Up => {
            db.run_migrations().await.map_err(migration_error)?;
            tracing::info!("Account and audit tables are up to date");
        }
        MigrateAction::Down => {
            db.rollback_migration().await.map_err(migration_error)?;
            tracing::info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await.map_err(migration_error)?;
            for (name, applied) in status {
                println!("{}: {}", name, if applied { "applied" } else { "pending" });
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping account and audit tables, then re-running all migrations");
            db.fresh_migrations().await.map_err(migration_error)?;
            tracing::info!("Fresh migrations completed");
        }
    }

    Ok(())
}

fn migration_error(e: DbErr) -> AppError {
    AppError::internal(format!("Migration failed: {}", e))
}
