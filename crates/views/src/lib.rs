//! In-memory read side of the checkout engine.
//!
//! This crate keeps the hot read path off the store of record:
//! - [`AvailabilityIndex`] mirrors product stock and price for checkout validation
//! - [`BoundedRecencyCache`] is a fixed-capacity LRU map used for order lookups
//!
//! Both are internally synchronized and meant to be shared behind an `Arc`.

pub mod availability;
pub mod error;
pub mod recency_cache;

pub use availability::AvailabilityIndex;
pub use error::{CacheError, Result, StockError, ViewError};
pub use recency_cache::BoundedRecencyCache;
