//! Order aggregate and related types.

mod aggregate;
mod history;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderParts, PlaceOrder};
pub use history::StatusChange;
pub use state::{OrderStatus, UnknownStatus};
pub use value_objects::{
    CartLine, CustomerId, OrderItem, ProductId, ShippingAddress, merge_cart_lines,
};

use thiserror::Error;

use crate::money::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The requested status change is not allowed by the state machine.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// Invalid price.
    #[error("Invalid price for {product_id}: {price} (must be greater than 0)")]
    InvalidPrice { product_id: String, price: i64 },

    /// Shipping address is blank.
    #[error("Shipping address is required")]
    MissingShippingAddress,

    /// Discounts exceed the subtotal they were applied to.
    #[error("Discount total {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Money, subtotal: Money },

    /// Shipping cost is negative.
    #[error("Shipping cost must not be negative: {0}")]
    NegativeShipping(Money),

    /// A line total, the subtotal, or the total does not fit in an amount.
    #[error("Order amount out of range")]
    AmountOutOfRange,

    /// The order would not charge anything.
    #[error("Order total must be positive, got {0}")]
    NonPositiveTotal(Money),

    /// Persisted parts do not satisfy the aggregate's invariants.
    #[error("Corrupt order record: {0}")]
    Corrupt(String),
}
