//! Stock unit domain models for digital inventory.

use cardvault_core::{ProductId, StockUnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One allocatable unit of digital stock - a card code, download link, or
/// license string.
///
/// Consumption state is a consistent triple: `is_used`, `used_order_id`, and
/// `used_at` are set together by allocation and cleared together by release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUnit {
    /// Unique unit ID.
    pub id: StockUnitId,
    /// Product this unit belongs to.
    pub product_id: ProductId,
    /// Opaque payload delivered to the buyer. Never mutated after creation.
    pub content: String,
    /// Optional grouping label set at import time.
    pub batch_name: Option<String>,
    /// Allocation priority; higher values are consumed first.
    pub priority: i32,
    /// Whether this unit has been consumed by an order.
    pub is_used: bool,
    /// Consuming order, set iff `is_used`. The only key release uses.
    pub used_order_id: Option<String>,
    /// When the unit was consumed, set iff `is_used`.
    pub used_at: Option<DateTime<Utc>>,
    /// Soft expiry: past this instant the unit is not allocatable.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the unit was created.
    pub created_at: DateTime<Utc>,
    /// Who imported the unit.
    pub created_by: Option<String>,
}

impl StockUnit {
    /// Whether this unit is past its soft expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Whether the allocator could select this unit at `now`.
    #[must_use]
    pub fn is_allocatable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }
}

/// Options applied to every unit created by one import call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportOptions {
    /// Grouping label for this import batch.
    pub batch_name: Option<String>,
    /// Who is importing (admin username).
    pub created_by: Option<String>,
    /// Allocation priority for the imported units.
    #[serde(default)]
    pub priority: i32,
    /// Soft expiry applied to the imported units.
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn unit(expires_at: Option<DateTime<Utc>>, is_used: bool) -> StockUnit {
        StockUnit {
            id: StockUnitId::new(1),
            product_id: ProductId::new(1),
            content: "CODE-1".to_string(),
            batch_name: None,
            priority: 0,
            is_used,
            used_order_id: is_used.then(|| "order-1".to_string()),
            used_at: is_used.then(Utc::now),
            expires_at,
            created_at: Utc::now(),
            created_by: None,
        }
    }

    #[test]
    fn test_unit_without_expiry_is_allocatable() {
        let now = Utc::now();
        assert!(unit(None, false).is_allocatable_at(now));
    }

    #[test]
    fn test_expired_unit_is_not_allocatable() {
        let now = Utc::now();
        let expired = unit(Some(now - Duration::hours(1)), false);
        assert!(expired.is_expired_at(now));
        assert!(!expired.is_allocatable_at(now));
    }

    #[test]
    fn test_future_expiry_is_allocatable() {
        let now = Utc::now();
        let fresh = unit(Some(now + Duration::hours(1)), false);
        assert!(!fresh.is_expired_at(now));
        assert!(fresh.is_allocatable_at(now));
    }

    #[test]
    fn test_used_unit_is_not_allocatable() {
        let now = Utc::now();
        assert!(!unit(None, true).is_allocatable_at(now));
    }

    #[test]
    fn test_stock_unit_serializes_for_the_api_layer() {
        let json = serde_json::to_value(unit(None, false)).expect("serialize");
        assert_eq!(json["id"], 1);
        assert_eq!(json["content"], "CODE-1");
        assert_eq!(json["is_used"], false);
        assert!(json["used_order_id"].is_null());
    }
}
