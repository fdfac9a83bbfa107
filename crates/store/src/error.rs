use common::OrderId;
use domain::{CustomerId, OrderError, OrderStatus, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the store of record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An order with this id already exists.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order was not found in the store.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order's customer is not known to the store.
    #[error("Unknown customer: {0}")]
    UnknownCustomer(CustomerId),

    /// A line item references a product the store does not know.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// Committing would drive a product's stock below zero.
    #[error("Stock constraint violated for product {0}")]
    StockConstraint(ProductId),

    /// The order's status changed since it was read.
    #[error("Concurrency conflict for order {order_id}: expected status {expected}, found {actual}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A commit was refused (used by the in-memory store's fault injection).
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// Persisted data does not form a valid aggregate.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<OrderError> for StoreError {
    fn from(err: OrderError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
