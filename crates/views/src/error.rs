//! Read-side error types.

use domain::ProductId;
use thiserror::Error;

/// Errors that can occur while rebuilding a view from the store.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The store of record could not be read.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),
}

/// Errors raised by stock operations on the availability index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// Fewer units are available than requested.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    Insufficient {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product is not in the index.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),
}

/// Errors raised when constructing a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Cache capacity must be greater than zero")]
    ZeroCapacity,
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
