//! Releasing an order's units back to the available pool.

use crate::error::InventoryError;
use crate::models::StockUnit;

use super::{StockRepository, StockUnitRow, WRITE_RETRY_ATTEMPTS, WRITE_RETRY_BASE_DELAY, units_from_rows};

impl StockRepository<'_> {
    /// Release every unit consumed by `order_id`, returning them to the
    /// available pool.
    ///
    /// Idempotent: a second call for the same order (or a call for an order
    /// that never allocated anything) returns an empty list, not an error.
    /// That is what makes refunds safe to retry.
    ///
    /// Whether the order *should* be released (paid vs refunded) is the
    /// calling workflow's decision; this method does not check order status.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Database` when the store fails after retries.
    pub async fn release(&self, order_id: &str) -> Result<Vec<StockUnit>, InventoryError> {
        let mut attempt = 1;
        loop {
            match self.try_release(order_id).await {
                Err(err) if err.is_transient() && attempt < WRITE_RETRY_ATTEMPTS => {
                    let delay = WRITE_RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        order_id,
                        attempt,
                        error = %err,
                        "release hit transient store error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_release(&self, order_id: &str) -> Result<Vec<StockUnit>, InventoryError> {
        // One conditional UPDATE keyed on the consuming order: atomic, and
        // naturally a no-op on repeat calls.
        let rows = sqlx::query_as::<_, StockUnitRow>(
            "UPDATE stock_units \
             SET is_used = 0, used_order_id = NULL, used_at = NULL \
             WHERE used_order_id = ? \
             RETURNING id, product_id, content, batch_name, priority, \
                 is_used, used_order_id, used_at, expires_at, created_at, created_by",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        let mut units = units_from_rows(rows)?;
        units.sort_by_key(|unit| unit.id);

        if !units.is_empty() {
            tracing::info!(
                order_id,
                released = units.len(),
                "released stock units back to the pool"
            );
        }
        Ok(units)
    }
}
