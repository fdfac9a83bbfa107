//! Side effects that run after a checkout commits.
//!
//! Handlers run in registration order. A failing handler is logged by the
//! orchestrator and never stops the handlers after it, nor the checkout.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{CustomerProfile, Order};
use thiserror::Error;
use views::{AvailabilityIndex, StockError};

use crate::notifier::NotificationTask;
use crate::orders::OrderListCache;
use crate::queue::WorkQueue;

/// A committed checkout, as seen by post-commit handlers.
#[derive(Debug, Clone)]
pub struct CheckoutCompleted {
    pub order: Arc<Order>,
    pub customer: CustomerProfile,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The index disagrees with the store about stock.
    #[error("Availability index inconsistent: {0}")]
    IndexInconsistency(#[from] StockError),
}

#[async_trait]
pub trait PostCommitHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, completed: &CheckoutCompleted) -> Result<(), HandlerError>;
}

/// Takes the ordered quantities out of the availability index.
pub struct StockDecrementHandler {
    index: Arc<AvailabilityIndex>,
}

impl StockDecrementHandler {
    pub fn new(index: Arc<AvailabilityIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl PostCommitHandler for StockDecrementHandler {
    fn name(&self) -> &'static str {
        "stock_decrement"
    }

    async fn handle(&self, completed: &CheckoutCompleted) -> Result<(), HandlerError> {
        let mut first_error = None;

        // Every line is attempted even after a failure.
        for item in completed.order.items() {
            if let Err(e) = self.index.decrement(&item.product_id, item.quantity) {
                metrics::counter!("availability_index_inconsistencies_total").increment(1);
                tracing::warn!(
                    order_id = %completed.order.id(),
                    product_id = %item.product_id,
                    error = %e,
                    "availability index out of step with store"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Queues an order confirmation for the customer.
pub struct NotificationHandler {
    queue: WorkQueue<NotificationTask>,
}

impl NotificationHandler {
    pub fn new(queue: WorkQueue<NotificationTask>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl PostCommitHandler for NotificationHandler {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn handle(&self, completed: &CheckoutCompleted) -> Result<(), HandlerError> {
        self.queue.push(NotificationTask {
            order_id: completed.order.id(),
            customer_id: completed.order.customer_id(),
            contact: completed.customer.email.clone(),
            total: completed.order.total(),
        });
        Ok(())
    }
}

/// Drops the customer's cached order list so the new order shows up.
pub struct OrderListInvalidation {
    lists: Arc<OrderListCache>,
}

impl OrderListInvalidation {
    pub fn new(lists: Arc<OrderListCache>) -> Self {
        Self { lists }
    }
}

#[async_trait]
impl PostCommitHandler for OrderListInvalidation {
    fn name(&self) -> &'static str {
        "order_list_invalidation"
    }

    async fn handle(&self, completed: &CheckoutCompleted) -> Result<(), HandlerError> {
        self.lists.invalidate(&completed.order.customer_id());
        Ok(())
    }
}
