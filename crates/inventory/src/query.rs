//! Typed query specification for stock listings.
//!
//! Filters are a typed value consumed by a single SQL-construction function.
//! A filter that is set always contributes a clause; one that is unset
//! contributes nothing, so a query can never silently degenerate into an
//! always-true `WHERE`.

use cardvault_core::ProductId;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// Usage/expiry state filter.
///
/// The three states partition a product's units: a unit is either consumed
/// (`Used`), unconsumed and allocatable (`Available`), or unconsumed but past
/// its soft expiry (`Expired`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockState {
    /// Unused and not past expiry.
    Available,
    /// Consumed by an order, regardless of expiry.
    Used,
    /// Unused but past its soft expiry.
    Expired,
}

/// Result ordering for stock listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockOrder {
    /// Allocation order: priority descending, oldest first within a tier.
    #[default]
    Allocation,
    /// Oldest units first.
    CreatedAsc,
    /// Newest units first.
    CreatedDesc,
}

impl StockOrder {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Allocation => " ORDER BY priority DESC, created_at ASC, id ASC",
            Self::CreatedAsc => " ORDER BY created_at ASC, id ASC",
            Self::CreatedDesc => " ORDER BY created_at DESC, id DESC",
        }
    }
}

/// A typed stock query: filters, ordering, and pagination.
///
/// The default query matches every unit in allocation order.
#[derive(Debug, Clone, Default)]
pub struct StockQuery {
    /// Restrict to one product.
    pub product_id: Option<ProductId>,
    /// Restrict to one import batch.
    pub batch_name: Option<String>,
    /// Restrict by usage/expiry state.
    pub state: Option<StockState>,
    /// Result ordering.
    pub order: StockOrder,
    /// Page size.
    pub limit: Option<i64>,
    /// Page offset; only meaningful together with `limit`.
    pub offset: Option<i64>,
}

impl StockQuery {
    /// Query for every unit of one product, in allocation order.
    #[must_use]
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    /// Restrict this query by usage/expiry state.
    #[must_use]
    pub fn with_state(mut self, state: StockState) -> Self {
        self.state = Some(state);
        self
    }

    /// Paginate this query.
    #[must_use]
    pub fn paged(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Append `WHERE`/`ORDER BY`/`LIMIT` clauses to `builder`.
    ///
    /// `now` anchors the expiry comparisons so every clause of one query sees
    /// the same instant.
    pub(crate) fn push_clauses(&self, builder: &mut QueryBuilder<'_, Sqlite>, now: DateTime<Utc>) {
        let mut prefix = ClausePrefix::new();

        if let Some(product_id) = self.product_id {
            builder.push(prefix.next());
            builder.push("product_id = ");
            builder.push_bind(product_id.as_i64());
        }

        if let Some(batch_name) = &self.batch_name {
            builder.push(prefix.next());
            builder.push("batch_name = ");
            builder.push_bind(batch_name.clone());
        }

        match self.state {
            Some(StockState::Available) => {
                builder.push(prefix.next());
                builder.push("is_used = 0 AND (expires_at IS NULL OR expires_at > ");
                builder.push_bind(now);
                builder.push(")");
            }
            Some(StockState::Used) => {
                builder.push(prefix.next());
                builder.push("is_used = 1");
            }
            Some(StockState::Expired) => {
                builder.push(prefix.next());
                builder.push("is_used = 0 AND expires_at IS NOT NULL AND expires_at <= ");
                builder.push_bind(now);
            }
            None => {}
        }

        builder.push(self.order.as_sql());

        if let Some(limit) = self.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
            if let Some(offset) = self.offset {
                builder.push(" OFFSET ");
                builder.push_bind(offset);
            }
        }
    }
}

/// Emits ` WHERE ` for the first clause and ` AND ` for the rest.
struct ClausePrefix {
    first: bool,
}

impl ClausePrefix {
    const fn new() -> Self {
        Self { first: true }
    }

    fn next(&mut self) -> &'static str {
        if self.first {
            self.first = false;
            " WHERE "
        } else {
            " AND "
        }
    }
}
