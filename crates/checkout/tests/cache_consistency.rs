//! Cache fills that overlap a status change must not leave stale entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use checkout::{OrderCache, OrderListCache, OrderService, SystemClock};
use common::OrderId;
use domain::{
    CustomerId, CustomerOrderStats, CustomerProfile, Identity, Money, Order, OrderItem,
    OrderStatus, PlaceOrder, ProductRecord, ShippingAddress, ShippingMode,
};
use store::{InMemoryStore, Store, StoreTransaction};
use tokio::sync::Notify;
use views::BoundedRecencyCache;

/// Delegates to an in-memory store, but can hold the next order read open
/// after it has loaded its data.
struct GatedStore {
    inner: InMemoryStore,
    gate_list: AtomicBool,
    gate_get: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    async fn pause_if(&self, armed: &AtomicBool) {
        if armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl Store for GatedStore {
    async fn load_products(&self) -> store::Result<Vec<ProductRecord>> {
        self.inner.load_products().await
    }

    async fn customer_profile(
        &self,
        customer_id: CustomerId,
    ) -> store::Result<Option<CustomerProfile>> {
        self.inner.customer_profile(customer_id).await
    }

    async fn customer_order_stats(
        &self,
        customer_id: CustomerId,
    ) -> store::Result<CustomerOrderStats> {
        self.inner.customer_order_stats(customer_id).await
    }

    async fn get_order(&self, order_id: OrderId) -> store::Result<Option<Order>> {
        let order = self.inner.get_order(order_id).await;
        self.pause_if(&self.gate_get).await;
        order
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> store::Result<Vec<Order>> {
        let orders = self.inner.list_orders_for_customer(customer_id).await;
        self.pause_if(&self.gate_list).await;
        orders
    }

    async fn begin(&self) -> store::Result<Box<dyn StoreTransaction>> {
        self.inner.begin().await
    }
}

struct Harness {
    store: Arc<GatedStore>,
    service: Arc<OrderService>,
    orders: Arc<OrderCache>,
    lists: Arc<OrderListCache>,
    customer: CustomerId,
    order_id: OrderId,
}

impl Harness {
    async fn new() -> Self {
        let inner = InMemoryStore::new();
        let customer = CustomerId::new();
        inner
            .insert_customer(CustomerProfile::new(customer, "li@example.com"))
            .await;
        inner
            .insert_product(ProductRecord::new("SKU-PEN", "Pen", Money::from_cents(250), 20))
            .await;

        let order = Order::place(PlaceOrder {
            order_id: OrderId::new(),
            customer_id: customer,
            items: vec![OrderItem::new("SKU-PEN", "Pen", 2, Money::from_cents(250))],
            discount_total: Money::zero(),
            shipping_cost: Money::zero(),
            shipping_mode: ShippingMode::Pickup,
            shipping_address: ShippingAddress::parse("Front desk").unwrap(),
            placed_at: Utc::now(),
        })
        .unwrap();
        let mut tx = inner.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let store = Arc::new(GatedStore {
            inner,
            gate_list: AtomicBool::new(false),
            gate_get: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orders: Arc<OrderCache> = Arc::new(BoundedRecencyCache::new(8).unwrap());
        let lists: Arc<OrderListCache> = Arc::new(BoundedRecencyCache::new(8).unwrap());
        let service = Arc::new(OrderService::new(
            store.clone(),
            orders.clone(),
            lists.clone(),
            Arc::new(SystemClock),
        ));

        Self {
            store,
            service,
            orders,
            lists,
            customer,
            order_id: order.id(),
        }
    }

    fn me(&self) -> Identity {
        Identity::customer(self.customer)
    }

    async fn cancel_as_admin(&self) {
        let admin = Identity::admin(CustomerId::new());
        let cancelled = self
            .service
            .update_status(&admin, self.order_id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    }
}

#[tokio::test]
async fn list_read_overlapping_a_cancel_is_not_cached() {
    let h = Harness::new().await;
    h.store.gate_list.store(true, Ordering::SeqCst);

    let reader = tokio::spawn({
        let service = h.service.clone();
        let me = h.me();
        let customer = h.customer;
        async move { service.list_orders_for_customer(&me, customer).await }
    });
    h.store.entered.notified().await;

    h.cancel_as_admin().await;

    h.store.release.notify_one();
    let stale = reader.await.unwrap().unwrap();
    assert_eq!(stale[0].status(), OrderStatus::Processing);
    assert!(!h.lists.contains(&h.customer));

    let fresh = h
        .service
        .list_orders_for_customer(&h.me(), h.customer)
        .await
        .unwrap();
    assert_eq!(fresh[0].status(), OrderStatus::Cancelled);
    assert!(h.lists.contains(&h.customer));
}

#[tokio::test]
async fn order_read_overlapping_a_cancel_is_not_cached() {
    let h = Harness::new().await;
    h.store.gate_get.store(true, Ordering::SeqCst);

    let reader = tokio::spawn({
        let service = h.service.clone();
        let me = h.me();
        let order_id = h.order_id;
        async move { service.get_order(&me, order_id).await }
    });
    h.store.entered.notified().await;

    // The gate fires once, so the cancel's own read of the order goes through.
    h.cancel_as_admin().await;

    h.store.release.notify_one();
    let stale = reader.await.unwrap().unwrap();
    assert_eq!(stale.status(), OrderStatus::Processing);
    assert!(!h.orders.contains(&h.order_id));

    let fresh = h.service.get_order(&h.me(), h.order_id).await.unwrap();
    assert_eq!(fresh.status(), OrderStatus::Cancelled);
    assert_eq!(fresh.history().len(), 2);
    assert!(h.orders.contains(&h.order_id));
}

#[tokio::test]
async fn read_without_overlap_is_cached() {
    let h = Harness::new().await;

    h.service
        .list_orders_for_customer(&h.me(), h.customer)
        .await
        .unwrap();
    h.service.get_order(&h.me(), h.order_id).await.unwrap();

    assert!(h.lists.contains(&h.customer));
    assert!(h.orders.contains(&h.order_id));
}
