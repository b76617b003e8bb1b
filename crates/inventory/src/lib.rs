//! CardVault Inventory - Digital stock store and allocation engine.
//!
//! This crate is the one piece of CardVault with a hard correctness
//! requirement: two concurrent purchases of the last unit of stock must never
//! receive the same code, and a refund must free exactly the units consumed by
//! that order.
//!
//! # Components
//!
//! - [`store::StockRepository`] - repository over a SQLite pool with:
//!   - `allocate` - atomically reserve N units for an order
//!   - `release` - idempotently return an order's units to the pool
//!   - `stats_for` / `batch_stats_for` / `batch_summaries` - availability counters
//!   - `import` / `add_unit` - bulk-load stock from pasted text
//!   - `get_unit` / `list_units` / `delete_unit` / `sweep_expired`
//! - [`query::StockQuery`] - typed filter/order/pagination specification
//! - [`error::InventoryError`] - business and store error taxonomy
//!
//! # Concurrency
//!
//! Allocation marks units with a single conditional `UPDATE ... WHERE id IN
//! (SELECT ... LIMIT n) RETURNING` statement inside a transaction. SQLite
//! admits one writer at a time, so selection and marking cannot interleave
//! between two allocations; a writer that lost the race retries the whole
//! transaction. Availability is never cached in memory - counts always
//! reflect committed state at query time.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), cardvault_inventory::InventoryError> {
//! use cardvault_core::ProductId;
//! use cardvault_inventory::{ImportOptions, StockRepository, create_pool, run_migrations};
//! use secrecy::SecretString;
//!
//! let url = SecretString::from("sqlite://cardvault.db".to_string());
//! let pool = create_pool(&url).await?;
//! run_migrations(&pool).await?;
//!
//! let repo = StockRepository::new(&pool);
//! let product = ProductId::new(1);
//! repo.import(product, "CODE-AAAA\nCODE-BBBB\n", &ImportOptions::default())
//!     .await?;
//!
//! // Checkout path: reserve one unit for an order.
//! let units = repo.allocate(product, "order-1001", 1).await?;
//! assert_eq!(units.len(), 1);
//!
//! // Refund path: return whatever the order consumed.
//! repo.release("order-1001").await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod models;
pub mod query;
pub mod store;

pub use error::InventoryError;
pub use models::{BatchStats, ImportOptions, StockStats, StockUnit};
pub use query::{StockOrder, StockQuery, StockState};
pub use store::{MIGRATOR, StockRepository, create_pool, run_migrations};
