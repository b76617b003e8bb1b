//! Stock store: persistence layer for digital inventory units.
//!
//! # Table
//!
//! - `stock_units` - one row per allocatable unit; see
//!   `migrations/0001_create_stock_units.sql`
//!
//! # Mutation discipline
//!
//! Only the allocator flips units available -> used, and only the releaser
//! flips them back. The importer only inserts; stats only read. Counts are
//! never cached in memory - staleness here directly causes overselling.
//!
//! # Migrations
//!
//! Migrations are embedded at compile time and run via [`run_migrations`]
//! (or `cv-cli migrate`).

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, SqlitePool};

use cardvault_core::{ProductId, StockUnitId};

use crate::error::InventoryError;
use crate::models::StockUnit;
use crate::query::StockQuery;

mod allocate;
mod import;
mod release;
mod stats;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Bounded retry for the allocate/release write path. Transient store errors
/// (SQLITE_BUSY family, pool timeouts) are retried up to this many attempts
/// with exponential backoff starting at [`WRITE_RETRY_BASE_DELAY`].
pub(crate) const WRITE_RETRY_ATTEMPTS: u32 = 5;
pub(crate) const WRITE_RETRY_BASE_DELAY: Duration = Duration::from_millis(25);

/// Columns selected by every stock unit query, in `StockUnitRow` order.
pub(crate) const STOCK_COLUMNS: &str = "id, product_id, content, batch_name, priority, \
     is_used, used_order_id, used_at, expires_at, created_at, created_by";

/// Create a SQLite connection pool with sensible defaults.
///
/// WAL journaling keeps stats reads from blocking the allocator's writes, and
/// the busy timeout lets concurrent writers queue on SQLite's single-writer
/// lock instead of failing immediately.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Run schema migrations to the latest version.
///
/// # Errors
///
/// Returns `InventoryError::Migration` if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), InventoryError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for stock unit queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StockUnitRow {
    id: i64,
    product_id: i64,
    content: String,
    batch_name: Option<String>,
    priority: i32,
    is_used: bool,
    used_order_id: Option<String>,
    used_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
}

impl TryFrom<StockUnitRow> for StockUnit {
    type Error = InventoryError;

    /// Decode a row, enforcing the consumption-state invariant:
    /// `is_used` iff `used_order_id` is set iff `used_at` is set.
    ///
    /// A violated row is corruption; it is reported, never repaired by
    /// guessing which side is correct.
    fn try_from(row: StockUnitRow) -> Result<Self, InventoryError> {
        let consistent = row.is_used == row.used_order_id.is_some()
            && row.is_used == row.used_at.is_some();
        if !consistent {
            tracing::error!(
                unit_id = row.id,
                is_used = row.is_used,
                has_order = row.used_order_id.is_some(),
                has_used_at = row.used_at.is_some(),
                "stock unit violates consumption-state consistency"
            );
            return Err(InventoryError::DataCorruption(format!(
                "stock unit {}: is_used={} but used_order_id set={} and used_at set={}",
                row.id,
                row.is_used,
                row.used_order_id.is_some(),
                row.used_at.is_some()
            )));
        }

        Ok(Self {
            id: StockUnitId::new(row.id),
            product_id: ProductId::new(row.product_id),
            content: row.content,
            batch_name: row.batch_name,
            priority: row.priority,
            is_used: row.is_used,
            used_order_id: row.used_order_id,
            used_at: row.used_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            created_by: row.created_by,
        })
    }
}

/// Decode a batch of rows, failing on the first corrupt one.
pub(crate) fn units_from_rows(rows: Vec<StockUnitRow>) -> Result<Vec<StockUnit>, InventoryError> {
    rows.into_iter().map(StockUnit::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock unit database operations.
pub struct StockRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StockRepository<'a> {
    /// Create a new stock repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a stock unit by ID.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::DataCorruption` if the row violates the
    /// consumption-state invariant, `InventoryError::Database` if the query
    /// fails.
    pub async fn get_unit(&self, id: StockUnitId) -> Result<Option<StockUnit>, InventoryError> {
        let row = sqlx::query_as::<_, StockUnitRow>(
            "SELECT id, product_id, content, batch_name, priority, \
                 is_used, used_order_id, used_at, expires_at, created_at, created_by \
             FROM stock_units \
             WHERE id = ?",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(StockUnit::try_from).transpose()
    }

    /// List stock units matching a typed query.
    ///
    /// Reads fail fast: no retry, and the result reflects committed state at
    /// query time.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Database` if the query fails,
    /// `InventoryError::DataCorruption` on an invariant-violating row.
    pub async fn list_units(&self, query: &StockQuery) -> Result<Vec<StockUnit>, InventoryError> {
        let now = Utc::now();
        let mut builder = QueryBuilder::new(format!("SELECT {STOCK_COLUMNS} FROM stock_units"));
        query.push_clauses(&mut builder, now);

        let rows = builder
            .build_query_as::<StockUnitRow>()
            .fetch_all(self.pool)
            .await?;

        units_from_rows(rows)
    }

    /// Delete an unused stock unit.
    ///
    /// Allocated units must be released first; this is a hard constraint, not
    /// a convenience check.
    ///
    /// # Returns
    ///
    /// Returns `true` if the unit was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::CannotDeleteAllocated` if the unit is
    /// currently consumed by an order, `InventoryError::Database` if the
    /// query fails.
    pub async fn delete_unit(&self, id: StockUnitId) -> Result<bool, InventoryError> {
        // The guard keeps the check and the delete in one atomic statement.
        let result = sqlx::query("DELETE FROM stock_units WHERE id = ? AND is_used = 0")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing deleted: either the unit is missing or the guard skipped an
        // allocated row.
        let existing = sqlx::query_scalar::<_, bool>("SELECT is_used FROM stock_units WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        match existing {
            None => Ok(false),
            Some(_) => Err(InventoryError::CannotDeleteAllocated(id)),
        }
    }

    /// Delete unused units past their soft expiry, optionally restricted to
    /// one product.
    ///
    /// # Returns
    ///
    /// The number of units removed.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Database` if the query fails.
    pub async fn sweep_expired(
        &self,
        product_id: Option<ProductId>,
    ) -> Result<u64, InventoryError> {
        let now = Utc::now();
        let mut builder = QueryBuilder::new(
            "DELETE FROM stock_units WHERE is_used = 0 AND expires_at IS NOT NULL AND expires_at <= ",
        );
        builder.push_bind(now);
        if let Some(product_id) = product_id {
            builder.push(" AND product_id = ");
            builder.push_bind(product_id.as_i64());
        }

        let result = builder.build().execute(self.pool).await?;
        if result.rows_affected() > 0 {
            tracing::info!(swept = result.rows_affected(), "removed expired stock units");
        }
        Ok(result.rows_affected())
    }
}
