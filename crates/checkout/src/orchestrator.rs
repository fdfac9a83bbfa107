//! The checkout operation: validate, price, persist, then fan out side effects.

use std::sync::Arc;
use std::time::Instant;

use common::OrderId;
use domain::{
    AppliedDiscount, CartLine, CustomerId, Identity, Money, Order, OrderItem, PlaceOrder,
    ShippingAddress, ShippingRates, fold_itemized, merge_cart_lines,
};
use serde::{Deserialize, Serialize};
use store::Store;
use views::AvailabilityIndex;

use crate::clock::Clock;
use crate::discounts::DiscountEngine;
use crate::error::{CheckoutError, Result};
use crate::handlers::{CheckoutCompleted, PostCommitHandler};

/// A customer's request to turn a cart into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
    pub shipping_mode: String,
    pub shipping_address: String,
}

/// The committed order together with its price breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order: Arc<Order>,
    pub subtotal: Money,
    pub discounts: Vec<AppliedDiscount>,
    pub discount_total: Money,
    pub shipping_cost: Money,
    pub total: Money,
}

/// Runs checkout as one logical unit.
///
/// Validation and pricing have no side effects. The order is written in a
/// single store transaction; only after it commits do the registered
/// [`PostCommitHandler`]s run, in order.
pub struct CheckoutOrchestrator {
    store: Arc<dyn Store>,
    index: Arc<AvailabilityIndex>,
    discounts: DiscountEngine,
    shipping: ShippingRates,
    clock: Arc<dyn Clock>,
    handlers: Vec<Box<dyn PostCommitHandler>>,
}

impl CheckoutOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        index: Arc<AvailabilityIndex>,
        discounts: DiscountEngine,
        shipping: ShippingRates,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            index,
            discounts,
            shipping,
            clock,
            handlers: Vec::new(),
        }
    }

    /// Appends a handler to run after every successful commit.
    pub fn register(&mut self, handler: Box<dyn PostCommitHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: impl PostCommitHandler + 'static) -> Self {
        self.register(Box::new(handler));
        self
    }

    /// Names of the registered handlers, in run order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Places an order for the request's customer.
    #[tracing::instrument(skip(self, identity, request), fields(customer_id = %request.customer_id))]
    pub async fn checkout(
        &self,
        identity: &Identity,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();

        let result = self.place(identity, request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::counter!("checkout_failed_total", "kind" => e.kind().as_str()).increment(1);
            tracing::info!(kind = %e.kind(), error = %e, "checkout rejected");
        }
        result
    }

    async fn place(&self, identity: &Identity, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        if !identity.can_act_for(request.customer_id) {
            return Err(CheckoutError::Permission(
                "customers may only check out for themselves".to_string(),
            ));
        }

        // 1. Validate the request; nothing below this block has side effects
        // until the transaction opens.
        if request.lines.is_empty() {
            return Err(CheckoutError::Validation("cart is empty".to_string()));
        }
        if let Some(line) = request.lines.iter().find(|l| l.quantity == 0) {
            return Err(CheckoutError::Validation(format!(
                "quantity for {} must be greater than 0",
                line.product_id
            )));
        }
        let address = ShippingAddress::parse(&request.shipping_address)?;
        let strategy = self.shipping.strategy_for(&request.shipping_mode)?;

        let customer = self
            .store
            .customer_profile(request.customer_id)
            .await?
            .ok_or(CheckoutError::CustomerNotFound(request.customer_id))?;

        let lines = merge_cart_lines(&request.lines);
        let items = self.capture_items(&lines)?;

        // 2. Subtotal from the captured prices.
        let subtotal = items
            .iter()
            .map(OrderItem::checked_total_price)
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line?))
            .ok_or_else(|| CheckoutError::Validation("order amount out of range".to_string()))?;

        // 3. Discounts, folded in rule order.
        let discounts = self
            .discounts
            .applicable_discounts(customer.id, subtotal, &lines)
            .await?;
        let folded = fold_itemized(subtotal, &discounts);

        // 4. Shipping.
        let shipping_cost = strategy.cost(&lines)?;

        // 5. Total; the aggregate rejects a non-positive one.
        let order = Order::place(PlaceOrder {
            order_id: OrderId::new(),
            customer_id: customer.id,
            items,
            discount_total: folded.discount_total(),
            shipping_cost,
            shipping_mode: strategy.mode(),
            shipping_address: address,
            placed_at: self.clock.now(),
        })?;

        // 6. Persist atomically.
        self.persist(&order).await?;

        tracing::info!(
            order_id = %order.id(),
            total = %order.total(),
            items = order.items().len(),
            "order committed"
        );

        let order = Arc::new(order);
        self.run_handlers(&CheckoutCompleted {
            order: order.clone(),
            customer,
        })
        .await;

        Ok(CheckoutReceipt {
            subtotal: order.subtotal(),
            discounts: folded.applied,
            discount_total: order.discount_total(),
            shipping_cost: order.shipping_cost(),
            total: order.total(),
            order,
        })
    }

    /// Resolves every line against the index, capturing name and price.
    fn capture_items(&self, lines: &[CartLine]) -> Result<Vec<OrderItem>> {
        lines
            .iter()
            .map(|line| {
                let product = self
                    .index
                    .lookup(&line.product_id)
                    .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;

                if !self.index.has_stock(&line.product_id, line.quantity) {
                    return Err(CheckoutError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        requested: line.quantity,
                        available: product.stock,
                    });
                }

                Ok(OrderItem::new(
                    product.id,
                    product.name,
                    line.quantity,
                    product.unit_price,
                ))
            })
            .collect()
    }

    async fn persist(&self, order: &Order) -> Result<()> {
        let mut tx = self.store.begin().await?;

        if let Err(e) = tx.insert_order(order).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            tracing::error!(order_id = %order.id(), error = %e, "order insert failed");
            return Err(e.into());
        }

        tx.commit().await.map_err(|e| {
            tracing::error!(order_id = %order.id(), error = %e, "order commit failed");
            CheckoutError::from(e)
        })
    }

    async fn run_handlers(&self, completed: &CheckoutCompleted) {
        for handler in &self.handlers {
            if let Err(e) = handler.handle(completed).await {
                tracing::warn!(
                    handler = handler.name(),
                    order_id = %completed.order.id(),
                    error = %e,
                    "post-commit handler failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for CheckoutOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutOrchestrator")
            .field("handlers", &self.handler_names())
            .finish()
    }
}
