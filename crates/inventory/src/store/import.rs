//! Bulk import of stock units from pasted or uploaded text.

use std::collections::HashSet;

use cardvault_core::ProductId;
use chrono::Utc;
use sqlx::QueryBuilder;

use crate::error::InventoryError;
use crate::models::{ImportOptions, StockUnit};

use super::{StockRepository, StockUnitRow, units_from_rows};

/// Rows per INSERT statement. Each row binds 7 parameters; the chunk size
/// keeps a statement well below SQLite's host-parameter limit.
const IMPORT_CHUNK_ROWS: usize = 500;

/// Split raw import text into usable content lines: trimmed, non-empty, and
/// deduplicated exactly (case-sensitive) within this one text. First
/// occurrence wins; input order is preserved.
///
/// Duplicates against already-stored units are deliberately not checked -
/// cross-batch duplicate codes are permitted.
fn clean_lines(raw_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for line in raw_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if seen.insert(line) {
            lines.push(line.to_string());
        }
    }
    lines
}

impl StockRepository<'_> {
    /// Create one stock unit per usable line of `raw_text`.
    ///
    /// Lines are trimmed, blank lines dropped, and exact duplicates within
    /// this call collapsed to one unit. All created units share the batch
    /// name, priority, expiry, and provenance from `options`. Inserts are
    /// bulk multi-row statements in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::EmptyImport` when no usable lines remain
    /// after cleaning, `InventoryError::Database` if an insert fails.
    pub async fn import(
        &self,
        product_id: ProductId,
        raw_text: &str,
        options: &ImportOptions,
    ) -> Result<Vec<StockUnit>, InventoryError> {
        let lines = clean_lines(raw_text);
        if lines.is_empty() {
            return Err(InventoryError::EmptyImport);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut units = Vec::with_capacity(lines.len());

        for chunk in lines.chunks(IMPORT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO stock_units \
                 (product_id, content, batch_name, priority, expires_at, created_at, created_by) ",
            );
            builder.push_values(chunk, |mut row, content| {
                row.push_bind(product_id.as_i64())
                    .push_bind(content.as_str())
                    .push_bind(options.batch_name.as_deref())
                    .push_bind(options.priority)
                    .push_bind(options.expires_at)
                    .push_bind(now)
                    .push_bind(options.created_by.as_deref());
            });
            builder.push(
                " RETURNING id, product_id, content, batch_name, priority, \
                 is_used, used_order_id, used_at, expires_at, created_at, created_by",
            );

            let rows = builder
                .build_query_as::<StockUnitRow>()
                .fetch_all(&mut *tx)
                .await?;
            units.extend(units_from_rows(rows)?);
        }

        tx.commit().await?;

        // RETURNING row order is unspecified; ids follow insertion order.
        units.sort_by_key(|unit| unit.id);

        tracing::info!(
            %product_id,
            imported = units.len(),
            batch = options.batch_name.as_deref().unwrap_or("-"),
            "imported stock units"
        );
        Ok(units)
    }

    /// Add a single stock unit: an import with a one-line batch.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::EmptyImport` when `content` is blank or
    /// spans multiple lines, `InventoryError::Database` if the insert fails.
    pub async fn add_unit(
        &self,
        product_id: ProductId,
        content: &str,
        options: &ImportOptions,
    ) -> Result<StockUnit, InventoryError> {
        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.lines().count() != 1 {
            return Err(InventoryError::EmptyImport);
        }

        let mut units = self.import(product_id, trimmed, options).await?;
        units.pop().ok_or_else(|| {
            InventoryError::DataCorruption("single-line import returned no rows".to_string())
        })
    }
}
