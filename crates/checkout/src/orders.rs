//! Order queries and status updates behind the recency caches.

use std::sync::Arc;

use common::OrderId;
use domain::{CustomerId, Identity, Order, OrderStatus, StatusChange};
use store::Store;
use views::BoundedRecencyCache;

use crate::clock::Clock;
use crate::error::{CheckoutError, Result};

/// Recently read orders by id.
pub type OrderCache = BoundedRecencyCache<OrderId, Arc<Order>>;

/// Recently read per-customer order lists, newest order first.
pub type OrderListCache = BoundedRecencyCache<CustomerId, Arc<Vec<Order>>>;

/// Read and update access to committed orders.
///
/// Reads go through the caches before the store. Any status change
/// invalidates the order's entry and its customer's list entry once the store
/// has committed it.
pub struct OrderService {
    store: Arc<dyn Store>,
    orders: Arc<OrderCache>,
    lists: Arc<OrderListCache>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn Store>,
        orders: Arc<OrderCache>,
        lists: Arc<OrderListCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            orders,
            lists,
            clock,
        }
    }

    /// Returns an order the caller is allowed to see.
    #[tracing::instrument(skip(self, identity))]
    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> Result<Arc<Order>> {
        let order = self.load(order_id).await?;
        if !identity.can_act_for(order.customer_id()) {
            return Err(CheckoutError::Permission(format!(
                "order {order_id} belongs to another customer"
            )));
        }
        Ok(order)
    }

    /// Lists a customer's orders, newest first.
    #[tracing::instrument(skip(self, identity))]
    pub async fn list_orders_for_customer(
        &self,
        identity: &Identity,
        customer_id: CustomerId,
    ) -> Result<Arc<Vec<Order>>> {
        if !identity.can_act_for(customer_id) {
            return Err(CheckoutError::Permission(
                "customers may only list their own orders".to_string(),
            ));
        }

        if let Some(orders) = self.lists.get(&customer_id) {
            metrics::counter!("order_cache_hits_total", "cache" => "order_list").increment(1);
            return Ok(orders);
        }
        metrics::counter!("order_cache_misses_total", "cache" => "order_list").increment(1);

        // Taken before the read so an invalidation racing it drops this fill.
        let generation = self.lists.generation();
        let orders = Arc::new(self.store.list_orders_for_customer(customer_id).await?);
        self.lists
            .put_if_generation(customer_id, generation, orders.clone());
        Ok(orders)
    }

    /// Moves an order to `to` and returns the updated order.
    ///
    /// Admins may apply any legal transition; customers may only cancel their
    /// own orders. Illegal transitions fail before anything is written.
    #[tracing::instrument(skip(self, identity), fields(actor = %identity.id))]
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        to: OrderStatus,
    ) -> Result<Arc<Order>> {
        // Always start from the store so the expected status is current.
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !identity.is_admin() {
            if identity.id != order.customer_id() {
                return Err(CheckoutError::Permission(format!(
                    "order {order_id} belongs to another customer"
                )));
            }
            if to != OrderStatus::Cancelled {
                return Err(CheckoutError::Permission(format!(
                    "customers may only cancel orders, not move them to {to}"
                )));
            }
        }

        let from = order.status();
        let change = order.transition(to, Some(identity.id), self.clock.now())?;

        let mut tx = self.store.begin().await?;
        if let Err(e) = tx.record_status_change(order_id, from, &change).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            return Err(e.into());
        }
        tx.commit().await?;

        order.apply_status_change(change);
        self.orders.invalidate(&order_id);
        self.lists.invalidate(&order.customer_id());

        metrics::counter!(
            "order_status_changes_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        tracing::info!(order_id = %order_id, %from, %to, "order status changed");

        Ok(Arc::new(order))
    }

    /// Returns the order's status history, oldest first.
    pub async fn get_status_history(
        &self,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<Vec<StatusChange>> {
        let order = self.get_order(identity, order_id).await?;
        Ok(order.history().to_vec())
    }

    async fn load(&self, order_id: OrderId) -> Result<Arc<Order>> {
        if let Some(order) = self.orders.get(&order_id) {
            metrics::counter!("order_cache_hits_total", "cache" => "order").increment(1);
            return Ok(order);
        }
        metrics::counter!("order_cache_misses_total", "cache" => "order").increment(1);

        let generation = self.orders.generation();
        let order = Arc::new(
            self.store
                .get_order(order_id)
                .await?
                .ok_or(CheckoutError::OrderNotFound(order_id))?,
        );
        self.orders
            .put_if_generation(order_id, generation, order.clone());
        Ok(order)
    }
}
