use async_trait::async_trait;
use common::OrderId;
use domain::{
    CustomerId, CustomerOrderStats, CustomerProfile, Order, OrderStatus, ProductRecord,
    StatusChange,
};

use crate::Result;

/// Core trait for the store of record.
///
/// Reads go straight to the store. Writes happen only inside a
/// [`StoreTransaction`] obtained from [`Store::begin`], which applies all of
/// its writes on commit or none of them. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Loads every product with its current stock and price.
    async fn load_products(&self) -> Result<Vec<ProductRecord>>;

    /// Returns the customer's contact profile, if the customer exists.
    async fn customer_profile(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>>;

    /// Counts the customer's past orders.
    async fn customer_order_stats(&self, customer_id: CustomerId) -> Result<CustomerOrderStats>;

    /// Loads an order with its line items and full status history.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a customer's orders, newest first.
    async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// An open all-or-nothing unit of work against the store.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Inserts a newly placed order with its line items and initial history.
    ///
    /// The store also takes each line's quantity from the product's stock and
    /// fails with [`StoreError::StockConstraint`](crate::StoreError::StockConstraint)
    /// rather than let stock go negative.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Appends a history entry and moves the order to `change.status`.
    ///
    /// Fails with a concurrency conflict unless the order is currently in
    /// `expected`.
    async fn record_status_change(
        &mut self,
        order_id: OrderId,
        expected: OrderStatus,
        change: &StatusChange,
    ) -> Result<()>;

    /// Makes every write in this transaction durable.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write in this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
