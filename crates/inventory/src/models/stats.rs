//! Availability and usage counters.

use serde::{Deserialize, Serialize};

/// Availability/usage counters for a product.
///
/// `available` and `expired` partition the unused units by expiry; `used`
/// counts consumed units regardless of expiry, so `total = used + available +
/// expired` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockStats {
    /// All units of the product.
    pub total: i64,
    /// Consumed units.
    pub used: i64,
    /// Unused units that are not past expiry.
    pub available: i64,
    /// Unused units past their soft expiry.
    pub expired: i64,
    /// `used / total * 100`; 0 when the product has no units.
    pub usage_rate: f64,
}

impl StockStats {
    /// All-zero stats for a product with no stock units.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            total: 0,
            used: 0,
            available: 0,
            expired: 0,
            usage_rate: 0.0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn from_counts(total: i64, used: i64, available: i64, expired: i64) -> Self {
        let usage_rate = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        Self {
            total,
            used,
            available,
            expired,
            usage_rate,
        }
    }
}

/// Counters for one import batch within a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Batch label; `None` is the unbatched bucket.
    pub batch_name: Option<String>,
    /// Counters for the batch.
    pub stats: StockStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_rate_zero_when_empty() {
        let stats = StockStats::from_counts(0, 0, 0, 0);
        assert_eq!(stats, StockStats::empty());
        assert!((stats.usage_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_usage_rate_counts_used_over_total() {
        let stats = StockStats::from_counts(4, 3, 1, 0);
        assert!((stats.usage_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expired_units_do_not_count_as_used() {
        let stats = StockStats::from_counts(10, 2, 5, 3);
        assert_eq!(stats.used, 2);
        assert_eq!(stats.available, 5);
        assert_eq!(stats.expired, 3);
        assert!((stats.usage_rate - 20.0).abs() < f64::EPSILON);
    }
}
