//! Atomic allocation of stock units to orders.

use cardvault_core::ProductId;
use chrono::Utc;

use crate::error::InventoryError;
use crate::models::StockUnit;

use super::{StockRepository, StockUnitRow, WRITE_RETRY_ATTEMPTS, WRITE_RETRY_BASE_DELAY, units_from_rows};

impl StockRepository<'_> {
    /// Atomically reserve `quantity` available units of `product_id` for
    /// `order_id`.
    ///
    /// Eligible units are unused, not past their soft expiry, and belong to
    /// the product. They are consumed by `priority` descending, then oldest
    /// `created_at` first within a tier. All-or-nothing: if fewer than
    /// `quantity` eligible units exist, nothing is marked.
    ///
    /// `quantity = 0` allocates nothing and returns an empty list.
    ///
    /// Transient store errors are retried internally with backoff;
    /// `InsufficientInventory` is a final answer and never retried.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::InsufficientInventory` when fewer than
    /// `quantity` eligible units exist, `InventoryError::Database` when the
    /// store fails after retries.
    pub async fn allocate(
        &self,
        product_id: ProductId,
        order_id: &str,
        quantity: u32,
    ) -> Result<Vec<StockUnit>, InventoryError> {
        if quantity == 0 {
            return Ok(Vec::new());
        }

        let mut attempt = 1;
        loop {
            match self.try_allocate(product_id, order_id, quantity).await {
                Err(err) if err.is_transient() && attempt < WRITE_RETRY_ATTEMPTS => {
                    let delay = WRITE_RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        %product_id,
                        order_id,
                        attempt,
                        error = %err,
                        "allocation hit transient store error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_allocate(
        &self,
        product_id: ProductId,
        order_id: &str,
        quantity: u32,
    ) -> Result<Vec<StockUnit>, InventoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Selection and marking are one conditional UPDATE. SQLite admits a
        // single writer, so two allocations can never mark the same row: the
        // later statement executes against the earlier one's committed state,
        // where the row is already consumed.
        let rows = sqlx::query_as::<_, StockUnitRow>(
            "UPDATE stock_units \
             SET is_used = 1, used_order_id = ?, used_at = ? \
             WHERE id IN ( \
                 SELECT id FROM stock_units \
                 WHERE product_id = ? \
                   AND is_used = 0 \
                   AND (expires_at IS NULL OR expires_at > ?) \
                 ORDER BY priority DESC, created_at ASC, id ASC \
                 LIMIT ? \
             ) \
             RETURNING id, product_id, content, batch_name, priority, \
                 is_used, used_order_id, used_at, expires_at, created_at, created_by",
        )
        .bind(order_id)
        .bind(now)
        .bind(product_id.as_i64())
        .bind(now)
        .bind(i64::from(quantity))
        .fetch_all(&mut *tx)
        .await?;

        if (rows.len() as u64) < u64::from(quantity) {
            // The guarded UPDATE swept up every eligible unit; all-or-nothing
            // means none of them may stay marked.
            let available = rows.len() as u64;
            tx.rollback().await?;
            return Err(InventoryError::InsufficientInventory {
                product_id,
                requested: quantity,
                available,
            });
        }

        // Decode before commit so a corrupt row rolls the marks back.
        let mut units = units_from_rows(rows)?;
        tx.commit().await?;

        // RETURNING row order is unspecified; report units in allocation order.
        units.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        tracing::info!(
            %product_id,
            order_id,
            allocated = units.len(),
            "allocated stock units"
        );
        Ok(units)
    }
}
