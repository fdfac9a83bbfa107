//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::pricing::ShippingMode;

use super::{CustomerId, OrderError, OrderItem, OrderStatus, ShippingAddress, StatusChange};

/// Everything needed to place a new order at checkout.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub discount_total: Money,
    pub shipping_cost: Money,
    pub shipping_mode: ShippingMode,
    pub shipping_address: ShippingAddress,
    pub placed_at: DateTime<Utc>,
}

/// Raw persisted fields of an order, used by stores to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_mode: ShippingMode,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub history: Vec<StatusChange>,
}

/// Order aggregate root.
///
/// Created only by a successful checkout and mutated only through status
/// transitions. Money fields are fixed at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    subtotal: Money,
    discount_total: Money,
    shipping_cost: Money,
    total: Money,
    status: OrderStatus,
    shipping_mode: ShippingMode,
    shipping_address: ShippingAddress,
    created_at: DateTime<Utc>,
    history: Vec<StatusChange>,
}

// Construction
impl Order {
    /// Places a new order in `processing` status.
    ///
    /// The subtotal and total are derived here from the captured line prices,
    /// so a constructed order always satisfies
    /// `total = (subtotal - discount_total) + shipping_cost` and `total > 0`.
    pub fn place(cmd: PlaceOrder) -> Result<Self, OrderError> {
        if cmd.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.to_string(),
                    price: item.unit_price.cents(),
                });
            }
        }

        let subtotal = checked_subtotal(&cmd.items).ok_or(OrderError::AmountOutOfRange)?;

        if cmd.discount_total.is_negative() || cmd.discount_total > subtotal {
            return Err(OrderError::DiscountExceedsSubtotal {
                discount: cmd.discount_total,
                subtotal,
            });
        }
        if cmd.shipping_cost.is_negative() {
            return Err(OrderError::NegativeShipping(cmd.shipping_cost));
        }

        let total = (subtotal - cmd.discount_total)
            .checked_add(cmd.shipping_cost)
            .ok_or(OrderError::AmountOutOfRange)?;
        if !total.is_positive() {
            return Err(OrderError::NonPositiveTotal(total));
        }

        let initial = StatusChange::new(
            OrderStatus::Processing,
            cmd.placed_at,
            Some(cmd.customer_id),
        );

        Ok(Self {
            id: cmd.order_id,
            customer_id: cmd.customer_id,
            items: cmd.items,
            subtotal,
            discount_total: cmd.discount_total,
            shipping_cost: cmd.shipping_cost,
            total,
            status: OrderStatus::Processing,
            shipping_mode: cmd.shipping_mode,
            shipping_address: cmd.shipping_address,
            created_at: cmd.placed_at,
            history: vec![initial],
        })
    }

    /// Rebuilds an order from persisted parts, re-checking its invariants.
    pub fn restore(parts: OrderParts) -> Result<Self, OrderError> {
        if parts.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let subtotal = checked_subtotal(&parts.items).ok_or_else(|| {
            OrderError::Corrupt("line items overflow the subtotal".to_string())
        })?;
        if subtotal != parts.subtotal {
            return Err(OrderError::Corrupt(format!(
                "subtotal {} does not match line items ({subtotal})",
                parts.subtotal
            )));
        }

        let total = (parts.subtotal - parts.discount_total)
            .checked_add(parts.shipping_cost)
            .ok_or_else(|| OrderError::Corrupt("price breakdown overflows the total".to_string()))?;
        if total != parts.total {
            return Err(OrderError::Corrupt(format!(
                "total {} does not match price breakdown ({total})",
                parts.total
            )));
        }

        match parts.history.last() {
            Some(last) if last.status == parts.status => {}
            Some(last) => {
                return Err(OrderError::Corrupt(format!(
                    "status {} does not match last history entry {}",
                    parts.status, last.status
                )));
            }
            None => return Err(OrderError::Corrupt("empty status history".to_string())),
        }

        Ok(Self {
            id: parts.id,
            customer_id: parts.customer_id,
            items: parts.items,
            subtotal: parts.subtotal,
            discount_total: parts.discount_total,
            shipping_cost: parts.shipping_cost,
            total: parts.total,
            status: parts.status,
            shipping_mode: parts.shipping_mode,
            shipping_address: parts.shipping_address,
            created_at: parts.created_at,
            history: parts.history,
        })
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the line items in checkout order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Sum of quantity times captured unit price, before discounts.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount_total(&self) -> Money {
        self.discount_total
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn shipping_mode(&self) -> ShippingMode {
        self.shipping_mode
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Chronological status history, oldest first.
    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Status transitions
impl Order {
    /// Validates a status change and returns the history entry it would record.
    ///
    /// Does not modify the order; pair with [`Order::apply_status_change`] once
    /// the change is durable.
    pub fn transition(
        &self,
        to: OrderStatus,
        actor: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, OrderError> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        Ok(StatusChange::new(to, at, actor))
    }

    /// Records a validated change: the history entry is appended first, then
    /// the status follows it.
    pub fn apply_status_change(&mut self, change: StatusChange) {
        let status = change.status;
        self.history.push(change);
        self.status = status;
    }

    /// Validates and applies a status change in one step.
    pub fn change_status(
        &mut self,
        to: OrderStatus,
        actor: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<&StatusChange, OrderError> {
        let change = self.transition(to, actor, at)?;
        self.apply_status_change(change);
        self.history
            .last()
            .ok_or_else(|| OrderError::Corrupt("empty status history".to_string()))
    }
}

fn checked_subtotal(items: &[OrderItem]) -> Option<Money> {
    items
        .iter()
        .try_fold(Money::zero(), |acc, item| acc.checked_add(item.checked_total_price()?))
}
