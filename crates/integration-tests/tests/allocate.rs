//! Integration tests for stock allocation.
//!
//! These cover the properties the order workflow depends on: selection
//! ordering, all-or-nothing failure, expiry exclusion, and the no-oversell
//! guarantee under concurrent checkouts.

use cardvault_core::ProductId;
use cardvault_integration_tests::{TestContext, order_id};
use cardvault_inventory::{InventoryError, StockRepository};
use chrono::{Duration, Utc};

// =============================================================================
// Basic Allocation
// =============================================================================

#[tokio::test]
async fn test_allocate_marks_units_for_order() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    ctx.seed_units(product, 3).await;

    let order = order_id();
    let units = ctx.repo().allocate(product, &order, 2).await.expect("allocate");

    assert_eq!(units.len(), 2);
    for unit in &units {
        assert!(unit.is_used);
        assert_eq!(unit.used_order_id.as_deref(), Some(order.as_str()));
        assert!(unit.used_at.is_some());
    }

    let stats = ctx.repo().stats_for(product).await.expect("stats");
    assert_eq!(stats.used, 2);
    assert_eq!(stats.available, 1);
}

#[tokio::test]
async fn test_allocate_zero_quantity_is_a_noop() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    ctx.seed_units(product, 2).await;

    let units = ctx
        .repo()
        .allocate(product, &order_id(), 0)
        .await
        .expect("allocate nothing");
    assert!(units.is_empty());

    let stats = ctx.repo().stats_for(product).await.expect("stats");
    assert_eq!(stats.available, 2);
    assert_eq!(stats.used, 0);
}

#[tokio::test]
async fn test_allocate_insufficient_is_all_or_nothing() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    ctx.seed_units(product, 2).await;

    let err = ctx
        .repo()
        .allocate(product, &order_id(), 3)
        .await
        .expect_err("2 units cannot satisfy 3");
    match err {
        InventoryError::InsufficientInventory {
            product_id,
            requested,
            available,
        } => {
            assert_eq!(product_id, product);
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected InsufficientInventory, got {other}"),
    }

    // The failed call must not have consumed anything.
    let stats = ctx.repo().stats_for(product).await.expect("stats");
    assert_eq!(stats.available, 2);
    assert_eq!(stats.used, 0);

    // The same stock still satisfies a fitting request.
    let units = ctx
        .repo()
        .allocate(product, &order_id(), 2)
        .await
        .expect("allocate after failed attempt");
    assert_eq!(units.len(), 2);
}

#[tokio::test]
async fn test_allocate_does_not_cross_products() {
    let ctx = TestContext::new().await;
    let product_a = ProductId::new(1);
    let product_b = ProductId::new(2);
    ctx.seed_units(product_a, 1).await;
    ctx.seed_units(product_b, 1).await;

    let units = ctx
        .repo()
        .allocate(product_a, &order_id(), 1)
        .await
        .expect("allocate");
    assert_eq!(units[0].product_id, product_a);

    let stats = ctx.repo().stats_for(product_b).await.expect("stats");
    assert_eq!(stats.available, 1);
}

// =============================================================================
// Selection Ordering
// =============================================================================

#[tokio::test]
async fn test_allocate_prefers_higher_priority() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    // Seed out of priority order to make sure ordering comes from the query.
    ctx.seed_unit(product, "LOW", 0, None).await;
    ctx.seed_unit(product, "HIGH", 10, None).await;
    ctx.seed_unit(product, "MID", 5, None).await;

    let repo = ctx.repo();
    let first = repo.allocate(product, &order_id(), 1).await.expect("first");
    assert_eq!(first[0].content, "HIGH");

    let second = repo.allocate(product, &order_id(), 1).await.expect("second");
    assert_eq!(second[0].content, "MID");

    let third = repo.allocate(product, &order_id(), 1).await.expect("third");
    assert_eq!(third[0].content, "LOW");
}

#[tokio::test]
async fn test_allocate_is_fifo_within_priority_tier() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    let old = ctx.seed_unit(product, "OLD", 0, None).await;
    let new = ctx.seed_unit(product, "NEW", 0, None).await;
    assert!(old.id < new.id);

    let units = ctx
        .repo()
        .allocate(product, &order_id(), 1)
        .await
        .expect("allocate");
    assert_eq!(units[0].content, "OLD");
}

#[tokio::test]
async fn test_allocate_returns_units_in_allocation_order() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    ctx.seed_unit(product, "LOW", 0, None).await;
    ctx.seed_unit(product, "HIGH", 10, None).await;

    let units = ctx
        .repo()
        .allocate(product, &order_id(), 2)
        .await
        .expect("allocate");
    let contents: Vec<_> = units.iter().map(|unit| unit.content.as_str()).collect();
    assert_eq!(contents, ["HIGH", "LOW"]);
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test]
async fn test_allocate_excludes_expired_units() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    let past = Utc::now() - Duration::hours(1);
    // Higher priority than the fresh unit: expiry must win over priority.
    ctx.seed_unit(product, "EXPIRED", 10, Some(past)).await;
    ctx.seed_unit(product, "FRESH", 0, None).await;

    let err = ctx
        .repo()
        .allocate(product, &order_id(), 2)
        .await
        .expect_err("only one eligible unit");
    assert!(matches!(
        err,
        InventoryError::InsufficientInventory { available: 1, .. }
    ));

    let units = ctx
        .repo()
        .allocate(product, &order_id(), 1)
        .await
        .expect("allocate the fresh unit");
    assert_eq!(units[0].content, "FRESH");
}

#[tokio::test]
async fn test_allocate_accepts_future_expiry() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    let future = Utc::now() + Duration::hours(1);
    ctx.seed_unit(product, "FRESH", 0, Some(future)).await;

    let units = ctx
        .repo()
        .allocate(product, &order_id(), 1)
        .await
        .expect("allocate");
    assert_eq!(units[0].content, "FRESH");
}

// =============================================================================
// The §8-style Concrete Scenario
// =============================================================================

#[tokio::test]
async fn test_two_unit_checkout_refund_scenario() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    let first = ctx.seed_unit(product, "UNIT-T1", 0, None).await;
    let second = ctx.seed_unit(product, "UNIT-T2", 0, None).await;

    // First order takes the older unit.
    let units = ctx
        .repo()
        .allocate(product, "order-1", 1)
        .await
        .expect("first order");
    assert_eq!(units[0].id, first.id);

    // Second order wants 2 but only 1 remains: fails, allocates nothing.
    let err = ctx
        .repo()
        .allocate(product, "order-2", 2)
        .await
        .expect_err("insufficient");
    assert!(matches!(
        err,
        InventoryError::InsufficientInventory { available: 1, .. }
    ));

    // Refund of the first order frees its unit; the retry now succeeds.
    ctx.repo().release("order-1").await.expect("refund");
    let units = ctx
        .repo()
        .allocate(product, "order-2", 2)
        .await
        .expect("retry succeeds");
    let mut ids: Vec<_> = units.iter().map(|unit| unit.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![first.id, second.id]);
}

// =============================================================================
// No Oversell Under Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_oversell_under_concurrent_allocation() {
    let ctx = TestContext::new().await;
    let product = ProductId::new(1);
    ctx.seed_units(product, 3).await;

    // 4 concurrent checkouts race for 3 units over one pool.
    let mut handles = Vec::new();
    for i in 0..4 {
        let pool = ctx.pool.clone();
        handles.push(tokio::spawn(async move {
            let repo = StockRepository::new(&pool);
            repo.allocate(product, &format!("order-{i}"), 1).await
        }));
    }

    let mut allocations = Vec::new();
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.expect("allocation task") {
            Ok(units) => allocations.push(units),
            Err(InventoryError::InsufficientInventory {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
                insufficient += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(allocations.len(), 3);
    assert_eq!(insufficient, 1);

    // The successful allocations touch disjoint unit sets.
    let mut ids: Vec<_> = allocations
        .iter()
        .flatten()
        .map(|unit| unit.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    // And the store agrees: everything is consumed exactly once.
    let stats = ctx.repo().stats_for(product).await.expect("stats");
    assert_eq!(stats.used, 3);
    assert_eq!(stats.available, 0);
}
