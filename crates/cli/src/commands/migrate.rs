//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cv-cli migrate
//! ```
//!
//! Migrations are embedded in the inventory crate
//! (`crates/inventory/migrations/`) and applied to the database named by
//! `DATABASE_URL`.

use cardvault_inventory::{InventoryError, create_pool, run_migrations};

use crate::config::{CliConfig, ConfigError};

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    let config = CliConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
