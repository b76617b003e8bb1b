//! Error taxonomy for the inventory subsystem.
//!
//! Business errors (`InsufficientInventory`, `EmptyImport`,
//! `CannotDeleteAllocated`) surface to the API layer as 4xx responses.
//! Transient store errors are retried a bounded number of times on the
//! allocate/release write path and only then propagate; reads fail fast.

use cardvault_core::{ProductId, StockUnitId};
use thiserror::Error;

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Fewer eligible units exist than the order requested. Not retriable
    /// without new stock; the caller must not proceed as paid/delivered.
    #[error(
        "insufficient inventory for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientInventory {
        /// Product the allocation was for.
        product_id: ProductId,
        /// Units the order asked for.
        requested: u32,
        /// Eligible units at the time of the attempt.
        available: u64,
    },

    /// An import contained no usable lines after trimming and deduplication.
    #[error("import contains no usable lines")]
    EmptyImport,

    /// The unit is allocated to an order; release it before deleting.
    #[error("stock unit {0} is allocated to an order and cannot be deleted")]
    CannotDeleteAllocated(StockUnitId),

    /// A row violates the used/order/timestamp consistency invariant.
    /// Never auto-repaired; surfaced so an operator can inspect the row.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl InventoryError {
    /// Whether this error is worth retrying with backoff.
    ///
    /// Covers the SQLITE_BUSY/SQLITE_LOCKED family (another writer held the
    /// database), pool acquire timeouts, and I/O failures. Business errors
    /// and corruption are never transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db_err)) => is_busy_code(db_err.code().as_deref()),
            Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }

    /// Whether this is an expected business condition (maps to 4xx upstream)
    /// rather than an internal failure.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(
            self,
            Self::InsufficientInventory { .. } | Self::EmptyImport | Self::CannotDeleteAllocated(_)
        )
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6) primary result codes plus their
/// extended forms; sqlx reports SQLite codes as decimal strings.
fn is_busy_code(code: Option<&str>) -> bool {
    matches!(code, Some("5" | "6" | "261" | "262" | "517"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_codes_classified_transient() {
        assert!(is_busy_code(Some("5")));
        assert!(is_busy_code(Some("517")));
        assert!(!is_busy_code(Some("1")));
        assert!(!is_busy_code(None));
    }

    #[test]
    fn test_business_errors_are_not_transient() {
        let err = InventoryError::InsufficientInventory {
            product_id: ProductId::new(1),
            requested: 2,
            available: 1,
        };
        assert!(err.is_business());
        assert!(!err.is_transient());

        assert!(InventoryError::EmptyImport.is_business());
        assert!(!InventoryError::DataCorruption("bad row".to_string()).is_business());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = InventoryError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
        assert!(!err.is_business());
    }

    #[test]
    fn test_insufficient_inventory_message() {
        let err = InventoryError::InsufficientInventory {
            product_id: ProductId::new(7),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient inventory for product 7: requested 3, available 1"
        );
    }
}
