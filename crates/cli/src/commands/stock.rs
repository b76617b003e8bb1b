//! Stock management commands.
//!
//! Each command connects with the pool defaults from the inventory crate,
//! runs one repository operation, and reports through tracing. Business
//! errors (`EmptyImport`, `CannotDeleteAllocated`) surface verbatim.

use std::io::Read;
use std::path::Path;

use cardvault_core::{ProductId, StockUnitId};
use cardvault_inventory::{ImportOptions, InventoryError, StockRepository, create_pool};
use sqlx::SqlitePool;

use crate::config::{CliConfig, ConfigError};

/// Errors that can occur while managing stock.
#[derive(Debug, thiserror::Error)]
pub enum StockCommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

async fn connect() -> Result<SqlitePool, StockCommandError> {
    let config = CliConfig::from_env()?;
    Ok(create_pool(&config.database_url).await?)
}

/// Import stock units from a file, or from stdin when no file is given.
///
/// # Errors
///
/// Returns `StockCommandError` on I/O failure, empty import, or store
/// failure.
pub async fn import(
    product: i64,
    file: Option<&Path>,
    options: &ImportOptions,
) -> Result<(), StockCommandError> {
    let raw_text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let pool = connect().await?;
    let repo = StockRepository::new(&pool);
    let units = repo
        .import(ProductId::new(product), &raw_text, options)
        .await?;

    tracing::info!(
        product,
        imported = units.len(),
        batch = options.batch_name.as_deref().unwrap_or("-"),
        "import complete"
    );
    Ok(())
}

/// Add a single stock unit.
///
/// # Errors
///
/// Returns `StockCommandError` on blank content or store failure.
pub async fn add(
    product: i64,
    content: &str,
    options: &ImportOptions,
) -> Result<(), StockCommandError> {
    let pool = connect().await?;
    let repo = StockRepository::new(&pool);
    let unit = repo
        .add_unit(ProductId::new(product), content, options)
        .await?;

    tracing::info!(product, unit_id = %unit.id, "stock unit added");
    Ok(())
}

/// Delete an unused stock unit by id.
///
/// # Errors
///
/// Returns `StockCommandError::Inventory` with `CannotDeleteAllocated` when
/// the unit is consumed by an order.
pub async fn delete(id: i64) -> Result<(), StockCommandError> {
    let pool = connect().await?;
    let repo = StockRepository::new(&pool);

    if repo.delete_unit(StockUnitId::new(id)).await? {
        tracing::info!(unit_id = id, "stock unit deleted");
    } else {
        tracing::warn!(unit_id = id, "stock unit not found");
    }
    Ok(())
}

/// Show availability stats for one or more products.
///
/// # Errors
///
/// Returns `StockCommandError` on store failure.
pub async fn stats(products: &[i64]) -> Result<(), StockCommandError> {
    let pool = connect().await?;
    let repo = StockRepository::new(&pool);

    let ids: Vec<ProductId> = products.iter().copied().map(ProductId::new).collect();
    let stats = repo.batch_stats_for(&ids).await?;

    for id in &ids {
        let Some(counts) = stats.get(id) else { continue };
        tracing::info!(
            product = %id,
            total = counts.total,
            used = counts.used,
            available = counts.available,
            expired = counts.expired,
            usage_rate = %format!("{:.1}%", counts.usage_rate),
            "stock stats"
        );
    }
    Ok(())
}

/// Delete expired unused units, optionally for one product.
///
/// # Errors
///
/// Returns `StockCommandError` on store failure.
pub async fn sweep(product: Option<i64>) -> Result<(), StockCommandError> {
    let pool = connect().await?;
    let repo = StockRepository::new(&pool);

    let swept = repo.sweep_expired(product.map(ProductId::new)).await?;
    tracing::info!(swept, "sweep complete");
    Ok(())
}
