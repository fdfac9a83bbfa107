//! Checkout orchestration for the order engine.
//!
//! This crate ties the domain, the store of record, and the in-memory views
//! together:
//! - [`CheckoutOrchestrator`] validates, prices, and commits a cart as one order
//! - [`PostCommitHandler`]s update the index, queue notifications, and
//!   invalidate caches once the order is durable
//! - [`OrderService`] serves order reads through the recency caches and
//!   applies status transitions
//! - [`NotificationDispatcher`] drains the [`WorkQueue`] of confirmations in
//!   the background

pub mod clock;
pub mod discounts;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod orchestrator;
pub mod orders;
pub mod queue;

pub use clock::{Clock, FixedClock, SystemClock};
pub use discounts::DiscountEngine;
pub use dispatcher::{NotificationDispatcher, TickOutcome};
pub use error::{CheckoutError, ErrorKind, Result};
pub use handlers::{
    CheckoutCompleted, HandlerError, NotificationHandler, OrderListInvalidation,
    PostCommitHandler, StockDecrementHandler,
};
pub use notifier::{InMemoryNotifier, LogNotifier, NotificationTask, Notifier, NotifyError};
pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt, CheckoutRequest};
pub use orders::{OrderCache, OrderListCache, OrderService};
pub use queue::WorkQueue;
