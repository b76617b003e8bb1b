//! Integration tests for CardVault.
//!
//! Every test runs against a real SQLite database: a fresh temp-directory
//! file per [`TestContext`], WAL mode, migrations applied. No mocks - the
//! allocation guarantees under test only mean something against the real
//! store.
//!
//! # Test Categories
//!
//! - `allocate` - allocation ordering, atomicity, and the no-oversell property
//! - `release` - refund-path idempotence and round-trips
//! - `stats` - per-product and batched aggregation
//! - `import` - bulk loading, dedup, add/delete/sweep

use cardvault_core::ProductId;
use cardvault_inventory::{
    ImportOptions, StockRepository, StockUnit, create_pool, run_migrations,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// A connected, migrated, empty database for one test.
///
/// The temp directory (and the database in it) lives as long as the context.
pub struct TestContext {
    /// Connection pool with the production pool defaults.
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestContext {
    /// Create a fresh database and run migrations.
    ///
    /// # Panics
    ///
    /// Panics when the database cannot be created; tests cannot proceed
    /// without one.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("cardvault-test.db");
        let url = SecretString::from(format!("sqlite://{}", db_path.display()));

        let pool = create_pool(&url).await.expect("connect test database");
        run_migrations(&pool).await.expect("run migrations");

        Self { pool, _dir: dir }
    }

    /// Repository over this context's pool.
    #[must_use]
    pub fn repo(&self) -> StockRepository<'_> {
        StockRepository::new(&self.pool)
    }

    /// Seed one unit with explicit priority and expiry.
    pub async fn seed_unit(
        &self,
        product_id: ProductId,
        content: &str,
        priority: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> StockUnit {
        let options = ImportOptions {
            priority,
            expires_at,
            ..ImportOptions::default()
        };
        self.repo()
            .add_unit(product_id, content, &options)
            .await
            .expect("seed stock unit")
    }

    /// Seed `count` plain units (priority 0, no expiry) for a product.
    pub async fn seed_units(&self, product_id: ProductId, count: usize) -> Vec<StockUnit> {
        let mut units = Vec::with_capacity(count);
        for i in 0..count {
            units.push(
                self.seed_unit(product_id, &format!("CODE-{product_id}-{i}"), 0, None)
                    .await,
            );
        }
        units
    }
}

/// A unique order identifier, the way the order workflow would mint one.
#[must_use]
pub fn order_id() -> String {
    format!("order-{}", Uuid::new_v4())
}
