use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{
    CustomerId, CustomerOrderStats, CustomerProfile, Order, OrderStatus, ProductId,
    ProductRecord, StatusChange,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{Store, StoreTransaction},
};

#[derive(Debug, Default)]
struct InMemoryState {
    products: HashMap<ProductId, ProductRecord>,
    customers: HashMap<CustomerId, CustomerProfile>,
    orders: HashMap<OrderId, Order>,
    /// Order ids in insertion order.
    sequence: Vec<OrderId>,
    fail_on_commit: bool,
    unavailable: bool,
}

impl InMemoryState {
    fn ensure_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

/// In-memory store of record for testing.
///
/// Behaves like the PostgreSQL store: writes are staged in a transaction and
/// applied atomically on commit, stock is guarded against going negative, and
/// status changes are checked against the expected current status. Clones
/// share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub async fn insert_product(&self, product: ProductRecord) {
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Inserts or replaces a customer.
    pub async fn insert_customer(&self, customer: CustomerProfile) {
        self.state
            .write()
            .await
            .customers
            .insert(customer.id, customer);
    }

    /// Returns the stored stock of a product.
    pub async fn product_stock(&self, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .products
            .get(product_id)
            .map(|p| p.stock)
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes every subsequent commit fail until reset.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.state.write().await.fail_on_commit = fail;
    }

    /// Makes every read and `begin` fail as if the store were unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load_products(&self) -> Result<Vec<ProductRecord>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(products)
    }

    async fn customer_profile(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.customers.get(&customer_id).cloned())
    }

    async fn customer_order_stats(&self, customer_id: CustomerId) -> Result<CustomerOrderStats> {
        let state = self.state.read().await;
        state.ensure_available()?;
        let mut stats = CustomerOrderStats::default();
        for order in state.orders.values() {
            if order.customer_id() == customer_id {
                stats.prior_orders += 1;
                if order.status() == OrderStatus::Completed {
                    stats.completed_orders += 1;
                }
            }
        }
        Ok(stats)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state
            .sequence
            .iter()
            .rev()
            .filter_map(|id| state.orders.get(id))
            .filter(|order| order.customer_id() == customer_id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.state.read().await.ensure_available()?;
        Ok(Box::new(InMemoryTransaction {
            state: self.state.clone(),
            writes: Vec::new(),
        }))
    }
}

#[derive(Debug)]
enum StagedWrite {
    InsertOrder(Order),
    StatusChange {
        order_id: OrderId,
        expected: OrderStatus,
        change: StatusChange,
    },
}

struct InMemoryTransaction {
    state: Arc<RwLock<InMemoryState>>,
    writes: Vec<StagedWrite>,
}

/// Checks every staged write against current state without changing it.
///
/// Returns the stock levels the products will have after commit.
fn validate(writes: &[StagedWrite], state: &InMemoryState) -> Result<HashMap<ProductId, u32>> {
    let mut stock_after: HashMap<ProductId, u32> = HashMap::new();
    let mut status_after: HashMap<OrderId, OrderStatus> = HashMap::new();

    for write in writes {
        match write {
            StagedWrite::InsertOrder(order) => {
                let id = order.id();
                if state.orders.contains_key(&id) || status_after.contains_key(&id) {
                    return Err(StoreError::DuplicateOrder(id));
                }
                if !state.customers.contains_key(&order.customer_id()) {
                    return Err(StoreError::UnknownCustomer(order.customer_id()));
                }
                for item in order.items() {
                    let current = match stock_after.get(&item.product_id) {
                        Some(stock) => *stock,
                        None => state
                            .products
                            .get(&item.product_id)
                            .map(|p| p.stock)
                            .ok_or_else(|| StoreError::UnknownProduct(item.product_id.clone()))?,
                    };
                    let remaining = current
                        .checked_sub(item.quantity)
                        .ok_or_else(|| StoreError::StockConstraint(item.product_id.clone()))?;
                    stock_after.insert(item.product_id.clone(), remaining);
                }
                status_after.insert(id, order.status());
            }
            StagedWrite::StatusChange {
                order_id,
                expected,
                change,
            } => {
                let actual = match status_after.get(order_id) {
                    Some(status) => *status,
                    None => state
                        .orders
                        .get(order_id)
                        .map(Order::status)
                        .ok_or(StoreError::OrderNotFound(*order_id))?,
                };
                if actual != *expected {
                    return Err(StoreError::ConcurrencyConflict {
                        order_id: *order_id,
                        expected: *expected,
                        actual,
                    });
                }
                status_after.insert(*order_id, change.status);
            }
        }
    }

    Ok(stock_after)
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.writes.push(StagedWrite::InsertOrder(order.clone()));
        Ok(())
    }

    async fn record_status_change(
        &mut self,
        order_id: OrderId,
        expected: OrderStatus,
        change: &StatusChange,
    ) -> Result<()> {
        self.writes.push(StagedWrite::StatusChange {
            order_id,
            expected,
            change: change.clone(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { state, writes } = *self;
        let mut state = state.write().await;
        state.ensure_available()?;
        if state.fail_on_commit {
            return Err(StoreError::CommitFailed("injected commit failure".to_string()));
        }

        let stock_after = validate(&writes, &state)?;

        for (product_id, stock) in stock_after {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock = stock;
            }
        }

        for write in writes {
            match write {
                StagedWrite::InsertOrder(order) => {
                    state.sequence.push(order.id());
                    state.orders.insert(order.id(), order);
                }
                StagedWrite::StatusChange {
                    order_id, change, ..
                } => {
                    if let Some(order) = state.orders.get_mut(&order_id) {
                        order.apply_status_change(change);
                    }
                }
            }
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        tracing::debug!(staged = self.writes.len(), "rolling back in-memory transaction");
        Ok(())
    }
}
