//! Integration tests for checkout, order queries, and notification dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use checkout::{
    CheckoutCompleted, CheckoutError, CheckoutOrchestrator, CheckoutRequest, Clock,
    DiscountEngine, ErrorKind, FixedClock, HandlerError, InMemoryNotifier,
    NotificationDispatcher, NotificationHandler, NotificationTask, OrderListCache,
    OrderListInvalidation, OrderService, PostCommitHandler, StockDecrementHandler, TickOutcome,
    WorkQueue,
};
use domain::{
    CartLine, CustomerId, CustomerProfile, DiscountPolicy, Identity, Money, OrderStatus,
    ProductRecord, ShippingRates, pricing,
};
use store::{InMemoryStore, Store};
use views::{AvailabilityIndex, BoundedRecencyCache, StockError};

struct TestHarness {
    store: InMemoryStore,
    index: Arc<AvailabilityIndex>,
    queue: WorkQueue<NotificationTask>,
    lists: Arc<OrderListCache>,
    clock: Arc<FixedClock>,
    orchestrator: CheckoutOrchestrator,
    orders: OrderService,
    customer: CustomerId,
}

impl TestHarness {
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let customer = CustomerId::new();
        store
            .insert_customer(CustomerProfile::new(customer, "ana@example.com"))
            .await;
        store
            .insert_product(ProductRecord::new(
                "SKU-LAMP",
                "Desk lamp",
                Money::from_cents(100_000),
                10,
            ))
            .await;
        store
            .insert_product(ProductRecord::new(
                "SKU-MUG",
                "Mug",
                Money::from_cents(1_500),
                3,
            ))
            .await;

        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let index = Arc::new(AvailabilityIndex::new());
        index.rebuild(shared.as_ref()).await.unwrap();

        // 2026-10-19 is a Monday, so the day-of-week promotion stays off.
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        ));
        let queue = WorkQueue::new();
        let lists: Arc<OrderListCache> = Arc::new(BoundedRecencyCache::new(16).unwrap());
        let orders_cache = Arc::new(BoundedRecencyCache::new(16).unwrap());

        let orchestrator = CheckoutOrchestrator::new(
            shared.clone(),
            index.clone(),
            DiscountEngine::new(shared.clone(), DiscountPolicy::default(), clock.clone()),
            ShippingRates::default(),
            clock.clone(),
        )
        .with_handler(StockDecrementHandler::new(index.clone()))
        .with_handler(NotificationHandler::new(queue.clone()))
        .with_handler(OrderListInvalidation::new(lists.clone()));

        let orders = OrderService::new(shared, orders_cache, lists.clone(), clock.clone());

        Self {
            store,
            index,
            queue,
            lists,
            clock,
            orchestrator,
            orders,
            customer,
        }
    }

    fn me(&self) -> Identity {
        Identity::customer(self.customer)
    }

    fn request(&self, lines: Vec<CartLine>, mode: &str) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: self.customer,
            lines,
            shipping_mode: mode.to_string(),
            shipping_address: "12 Harbour Road".to_string(),
        }
    }

    fn stock(&self, id: &str) -> u32 {
        self.index.lookup(&id.into()).unwrap().stock
    }
}

#[tokio::test]
async fn first_purchase_with_standard_shipping() {
    let h = TestHarness::new().await;

    let receipt = h
        .orchestrator
        .checkout(
            &h.me(),
            h.request(vec![CartLine::new("SKU-LAMP", 2)], "standard"),
        )
        .await
        .unwrap();

    assert_eq!(receipt.subtotal, Money::from_cents(200_000));
    assert_eq!(receipt.discounts.len(), 1);
    assert_eq!(receipt.discounts[0].name, pricing::FIRST_PURCHASE);
    assert_eq!(receipt.discount_total, Money::from_cents(20_000));
    assert_eq!(receipt.shipping_cost, Money::from_cents(5_000));
    assert_eq!(receipt.total, Money::from_cents(185_000));

    let order = &receipt.order;
    assert_eq!(order.status(), OrderStatus::Processing);
    assert_eq!(order.history().len(), 1);
    assert_eq!(order.history()[0].actor, Some(h.customer));
    assert_eq!(order.created_at(), h.clock.now());

    assert_eq!(h.stock("SKU-LAMP"), 8);
    assert_eq!(h.store.product_stock(&"SKU-LAMP".into()).await, Some(8));
    assert_eq!(h.queue.len(), 1);

    let stored = h.store.get_order(order.id()).await.unwrap().unwrap();
    assert_eq!(stored.total(), Money::from_cents(185_000));
}

#[tokio::test]
async fn insufficient_stock_has_no_side_effects() {
    let h = TestHarness::new().await;

    let err = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-MUG", 5)], "pickup"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            requested: 5,
            available: 3,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(h.stock("SKU-MUG"), 3);
    assert_eq!(h.store.order_count().await, 0);
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn duplicate_lines_are_checked_combined() {
    let h = TestHarness::new().await;

    let err = h
        .orchestrator
        .checkout(
            &h.me(),
            h.request(
                vec![CartLine::new("SKU-MUG", 2), CartLine::new("SKU-MUG", 2)],
                "pickup",
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    let receipt = h
        .orchestrator
        .checkout(
            &h.me(),
            h.request(
                vec![CartLine::new("SKU-MUG", 1), CartLine::new("SKU-MUG", 2)],
                "pickup",
            ),
        )
        .await
        .unwrap();
    assert_eq!(receipt.order.items().len(), 1);
    assert_eq!(receipt.order.items()[0].quantity, 3);
    assert_eq!(h.stock("SKU-MUG"), 0);
}

#[tokio::test]
async fn captured_price_survives_later_price_change() {
    let h = TestHarness::new().await;
    let receipt = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-MUG", 2)], "pickup"))
        .await
        .unwrap();

    h.index.apply_external_update(ProductRecord::new(
        "SKU-MUG",
        "Mug",
        Money::from_cents(9_999),
        50,
    ));

    let order = h
        .orders
        .get_order(&h.me(), receipt.order.id())
        .await
        .unwrap();
    assert_eq!(order.items()[0].unit_price, Money::from_cents(1_500));
    assert_eq!(order.subtotal(), Money::from_cents(3_000));
}

#[tokio::test]
async fn validation_errors() {
    let h = TestHarness::new().await;
    let me = h.me();

    let cases = [
        (h.request(vec![], "standard"), ErrorKind::Validation),
        (
            h.request(vec![CartLine::new("SKU-MUG", 0)], "standard"),
            ErrorKind::Validation,
        ),
        (
            h.request(vec![CartLine::new("SKU-MUG", 1)], "teleport"),
            ErrorKind::Validation,
        ),
        (
            CheckoutRequest {
                shipping_address: "   ".to_string(),
                ..h.request(vec![CartLine::new("SKU-MUG", 1)], "standard")
            },
            ErrorKind::Validation,
        ),
        (
            h.request(vec![CartLine::new("SKU-NOPE", 1)], "standard"),
            ErrorKind::NotFound,
        ),
        (
            CheckoutRequest {
                customer_id: CustomerId::new(),
                ..h.request(vec![CartLine::new("SKU-MUG", 1)], "standard")
            },
            ErrorKind::Permission,
        ),
    ];

    for (request, kind) in cases {
        let err = h.orchestrator.checkout(&me, request).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{err}");
    }

    assert_eq!(h.store.order_count().await, 0);
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn overflowing_order_amount_is_rejected() {
    let h = TestHarness::new().await;
    let vault = ProductRecord::new("SKU-VAULT", "Vault", Money::from_cents(i64::MAX / 2 + 1), 5);
    h.store.insert_product(vault.clone()).await;
    h.index.apply_external_update(vault);

    let err = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-VAULT", 2)], "pickup"))
        .await
        .unwrap_err();

    assert!(matches!(&err, CheckoutError::Validation(msg) if msg == "order amount out of range"));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.stock("SKU-VAULT"), 5);
    assert_eq!(h.store.product_stock(&"SKU-VAULT".into()).await, Some(5));
    assert_eq!(h.store.order_count().await, 0);
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let h = TestHarness::new().await;
    let stranger = CustomerId::new();
    let admin = Identity::admin(CustomerId::new());

    let err = h
        .orchestrator
        .checkout(
            &admin,
            CheckoutRequest {
                customer_id: stranger,
                ..h.request(vec![CartLine::new("SKU-MUG", 1)], "pickup")
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::CustomerNotFound(id) if id == stranger));
}

#[tokio::test]
async fn commit_failure_leaves_everything_unchanged() {
    let h = TestHarness::new().await;
    h.store.set_fail_on_commit(true).await;

    let err = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-LAMP", 1)], "express"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(h.stock("SKU-LAMP"), 10);
    assert_eq!(h.store.product_stock(&"SKU-LAMP".into()).await, Some(10));
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn stale_index_is_caught_by_store_guard() {
    let h = TestHarness::new().await;
    // The index believes more stock exists than the store holds.
    h.index.apply_external_update(ProductRecord::new(
        "SKU-MUG",
        "Mug",
        Money::from_cents(1_500),
        100,
    ));

    let err = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-MUG", 5)], "pickup"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::StockConflict(_)));
    assert_eq!(h.store.product_stock(&"SKU-MUG".into()).await, Some(3));
    assert_eq!(h.stock("SKU-MUG"), 100);
}

/// Always fails, to check that later handlers still run.
struct FailingHandler;

#[async_trait]
impl PostCommitHandler for FailingHandler {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle(&self, _completed: &CheckoutCompleted) -> Result<(), HandlerError> {
        Err(StockError::UnknownProduct("SKU-GHOST".into()).into())
    }
}

#[tokio::test]
async fn handler_failure_does_not_fail_checkout() {
    let h = TestHarness::new().await;
    let shared: Arc<dyn Store> = Arc::new(h.store.clone());
    let orchestrator = CheckoutOrchestrator::new(
        shared.clone(),
        h.index.clone(),
        DiscountEngine::new(shared, DiscountPolicy::default(), h.clock.clone()),
        ShippingRates::default(),
        h.clock.clone(),
    )
    .with_handler(FailingHandler)
    .with_handler(StockDecrementHandler::new(h.index.clone()))
    .with_handler(NotificationHandler::new(h.queue.clone()));

    assert_eq!(
        orchestrator.handler_names(),
        ["failing", "stock_decrement", "notification"]
    );

    let receipt = orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-LAMP", 1)], "pickup"))
        .await
        .unwrap();

    assert_eq!(receipt.order.status(), OrderStatus::Processing);
    assert_eq!(h.stock("SKU-LAMP"), 9);
    assert_eq!(h.queue.len(), 1);
}

#[tokio::test]
async fn checkout_invalidates_customer_order_list() {
    let h = TestHarness::new().await;
    let me = h.me();

    h.orchestrator
        .checkout(&me, h.request(vec![CartLine::new("SKU-MUG", 1)], "pickup"))
        .await
        .unwrap();
    let before = h.orders.list_orders_for_customer(&me, h.customer).await.unwrap();
    assert_eq!(before.len(), 1);
    assert!(h.lists.contains(&h.customer));

    let second = h
        .orchestrator
        .checkout(&me, h.request(vec![CartLine::new("SKU-MUG", 1)], "pickup"))
        .await
        .unwrap();
    assert!(!h.lists.contains(&h.customer));

    let after = h.orders.list_orders_for_customer(&me, h.customer).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].id(), second.order.id());
}

#[tokio::test]
async fn second_order_loses_first_purchase_bonus() {
    let h = TestHarness::new().await;
    let me = h.me();

    let first = h
        .orchestrator
        .checkout(&me, h.request(vec![CartLine::new("SKU-MUG", 1)], "standard"))
        .await
        .unwrap();
    let second = h
        .orchestrator
        .checkout(&me, h.request(vec![CartLine::new("SKU-MUG", 1)], "standard"))
        .await
        .unwrap();

    assert_eq!(first.discounts.len(), 1);
    assert!(second.discounts.is_empty());
    assert_eq!(second.total, Money::from_cents(6_500));
}

#[tokio::test]
async fn completed_order_cannot_ship_again() {
    let h = TestHarness::new().await;
    let admin = Identity::admin(CustomerId::new());
    let receipt = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-MUG", 1)], "pickup"))
        .await
        .unwrap();
    let id = receipt.order.id();

    h.orders
        .update_status(&admin, id, OrderStatus::Shipped)
        .await
        .unwrap();
    let completed = h
        .orders
        .update_status(&admin, id, OrderStatus::Completed)
        .await
        .unwrap();

    let err = h
        .orders
        .update_status(&admin, id, OrderStatus::Shipped)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Shipped
        }
    ));
    let after = h.orders.get_order(&admin, id).await.unwrap();
    assert_eq!(*after, *completed);
    assert_eq!(after.history().len(), 3);
}

#[tokio::test]
async fn notifications_flow_through_dispatcher() {
    let h = TestHarness::new().await;
    let notifier = InMemoryNotifier::new();
    let dispatcher = NotificationDispatcher::new(
        h.queue.clone(),
        Arc::new(notifier.clone()),
        std::time::Duration::from_secs(5),
    );

    let receipt = h
        .orchestrator
        .checkout(&h.me(), h.request(vec![CartLine::new("SKU-LAMP", 2)], "standard"))
        .await
        .unwrap();

    assert_eq!(
        dispatcher.tick().await,
        TickOutcome::Drained {
            delivered: 1,
            failed: 0
        }
    );
    let delivered = notifier.delivered();
    assert_eq!(delivered[0].order_id, receipt.order.id());
    assert_eq!(delivered[0].contact, "ana@example.com");
    assert_eq!(delivered[0].total, Money::from_cents(185_000));
}
