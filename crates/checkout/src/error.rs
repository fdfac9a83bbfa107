//! Checkout error types.

use common::OrderId;
use domain::{CustomerId, OrderError, OrderStatus, ProductId, ShippingError};
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// Machine-readable category of a [`CheckoutError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    Permission,
    InvalidTransition,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Permission => "permission",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by checkout and order operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request is malformed or would produce an invalid order.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A cart line references a product the index does not know.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The customer is not known to the store.
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Not enough stock to fill a cart line.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The store refused the order because stock ran out after validation.
    #[error("Stock for {0} ran out before the order was committed")]
    StockConflict(ProductId),

    /// The caller may not perform this operation.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The order's state machine does not allow this change.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order's status changed between read and write.
    #[error("Order {order_id} changed concurrently; current status is {actual}")]
    StatusConflict {
        order_id: OrderId,
        actual: OrderStatus,
    },

    /// The store of record failed.
    #[error("Persistence error: {0}")]
    Persistence(StoreError),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Validation(_) => ErrorKind::Validation,
            CheckoutError::ProductNotFound(_)
            | CheckoutError::CustomerNotFound(_)
            | CheckoutError::OrderNotFound(_) => ErrorKind::NotFound,
            CheckoutError::InsufficientStock { .. } | CheckoutError::StockConflict(_) => {
                ErrorKind::InsufficientStock
            }
            CheckoutError::Permission(_) => ErrorKind::Permission,
            CheckoutError::InvalidTransition { .. } | CheckoutError::StatusConflict { .. } => {
                ErrorKind::InvalidTransition
            }
            CheckoutError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => {
                CheckoutError::InvalidTransition { from, to }
            }
            other => CheckoutError::Validation(other.to_string()),
        }
    }
}

impl From<ShippingError> for CheckoutError {
    fn from(err: ShippingError) -> Self {
        CheckoutError::Validation(err.to_string())
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StockConstraint(product_id) => CheckoutError::StockConflict(product_id),
            StoreError::ConcurrencyConflict {
                order_id, actual, ..
            } => CheckoutError::StatusConflict { order_id, actual },
            StoreError::OrderNotFound(order_id) => CheckoutError::OrderNotFound(order_id),
            StoreError::UnknownCustomer(customer_id) => {
                CheckoutError::CustomerNotFound(customer_id)
            }
            StoreError::UnknownProduct(product_id) => CheckoutError::ProductNotFound(product_id),
            other => CheckoutError::Persistence(other),
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
