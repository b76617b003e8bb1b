//! Availability and usage aggregation.
//!
//! The batch form issues a single grouped query no matter how many products
//! are asked about - an admin dashboard over a large catalog must not fan out
//! one query per product. Stats are reads: they fail fast, are never retried,
//! and always reflect committed state at query time.

use std::collections::HashMap;

use cardvault_core::ProductId;
use chrono::Utc;
use sqlx::QueryBuilder;

use crate::error::InventoryError;
use crate::models::{BatchStats, StockStats};

use super::StockRepository;

/// Internal row type for per-product grouped counts.
#[derive(Debug, sqlx::FromRow)]
struct ProductCountsRow {
    product_id: i64,
    total: i64,
    used: i64,
    available: i64,
    expired: i64,
}

/// Internal row type for per-batch grouped counts.
#[derive(Debug, sqlx::FromRow)]
struct BatchCountsRow {
    batch_name: Option<String>,
    total: i64,
    used: i64,
    available: i64,
    expired: i64,
}

impl StockRepository<'_> {
    /// Availability counters for one product.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Database` if the query fails.
    pub async fn stats_for(&self, product_id: ProductId) -> Result<StockStats, InventoryError> {
        let stats = self.batch_stats_for(&[product_id]).await?;
        Ok(stats.get(&product_id).copied().unwrap_or_else(StockStats::empty))
    }

    /// Availability counters for any number of products in one grouped query.
    ///
    /// Every requested product appears in the result map; products with no
    /// stock units get all-zero stats rather than being silently omitted.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Database` if the query fails.
    pub async fn batch_stats_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, StockStats>, InventoryError> {
        let mut results: HashMap<ProductId, StockStats> = product_ids
            .iter()
            .map(|id| (*id, StockStats::empty()))
            .collect();
        if product_ids.is_empty() {
            return Ok(results);
        }

        let now = Utc::now();
        let mut builder = QueryBuilder::new(
            "SELECT product_id, \
                 COUNT(*) AS total, \
                 SUM(CASE WHEN is_used = 1 THEN 1 ELSE 0 END) AS used, \
                 SUM(CASE WHEN is_used = 0 AND (expires_at IS NULL OR expires_at > ",
        );
        builder.push_bind(now);
        builder.push(
            ") THEN 1 ELSE 0 END) AS available, \
             SUM(CASE WHEN is_used = 0 AND expires_at IS NOT NULL AND expires_at <= ",
        );
        builder.push_bind(now);
        builder.push(" THEN 1 ELSE 0 END) AS expired FROM stock_units WHERE product_id IN (");
        {
            let mut ids = builder.separated(", ");
            for product_id in product_ids {
                ids.push_bind(product_id.as_i64());
            }
        }
        builder.push(") GROUP BY product_id");

        let rows = builder
            .build_query_as::<ProductCountsRow>()
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            results.insert(
                ProductId::new(row.product_id),
                StockStats::from_counts(row.total, row.used, row.available, row.expired),
            );
        }
        Ok(results)
    }

    /// Per-batch counters within one product, one grouped query.
    ///
    /// Units imported without a batch name are grouped into a `None` bucket,
    /// listed last.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Database` if the query fails.
    pub async fn batch_summaries(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<BatchStats>, InventoryError> {
        let now = Utc::now();
        let rows = sqlx::query_as::<_, BatchCountsRow>(
            "SELECT batch_name, \
                 COUNT(*) AS total, \
                 SUM(CASE WHEN is_used = 1 THEN 1 ELSE 0 END) AS used, \
                 SUM(CASE WHEN is_used = 0 AND (expires_at IS NULL OR expires_at > ?) \
                     THEN 1 ELSE 0 END) AS available, \
                 SUM(CASE WHEN is_used = 0 AND expires_at IS NOT NULL AND expires_at <= ? \
                     THEN 1 ELSE 0 END) AS expired \
             FROM stock_units \
             WHERE product_id = ? \
             GROUP BY batch_name \
             ORDER BY batch_name IS NULL, batch_name ASC",
        )
        .bind(now)
        .bind(now)
        .bind(product_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BatchStats {
                batch_name: row.batch_name,
                stats: StockStats::from_counts(row.total, row.used, row.available, row.expired),
            })
            .collect())
    }
}
