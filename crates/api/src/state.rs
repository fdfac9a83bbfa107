//! Shared application state and its default wiring.

use std::sync::Arc;

use checkout::{
    CheckoutOrchestrator, Clock, DiscountEngine, LogNotifier, NotificationDispatcher,
    NotificationHandler, NotificationTask, Notifier, OrderListInvalidation, OrderService,
    StockDecrementHandler, SystemClock, WorkQueue,
};
use domain::DiscountPolicy;
use store::Store;
use views::{AvailabilityIndex, BoundedRecencyCache, CacheError};

use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub checkout: CheckoutOrchestrator,
    pub orders: OrderService,
    pub index: Arc<AvailabilityIndex>,
    pub notifications: WorkQueue<NotificationTask>,
    pub store: Arc<dyn Store>,
}

/// Wires the index, caches, queue, and post-commit handlers around `store`.
///
/// Confirmations are delivered through [`LogNotifier`] and discounts read the
/// system clock; use [`build_state`] to supply others. The index starts empty
/// and must be rebuilt before the first checkout.
pub fn create_default_state(
    store: Arc<dyn Store>,
    config: &Config,
) -> Result<(Arc<AppState>, NotificationDispatcher), CacheError> {
    build_state(store, config, Arc::new(LogNotifier), Arc::new(SystemClock))
}

pub fn build_state(
    store: Arc<dyn Store>,
    config: &Config,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
) -> Result<(Arc<AppState>, NotificationDispatcher), CacheError> {
    let index = Arc::new(AvailabilityIndex::new());
    let order_cache = Arc::new(BoundedRecencyCache::new(config.order_cache_capacity)?);
    let list_cache = Arc::new(BoundedRecencyCache::new(config.order_list_cache_capacity)?);
    let notifications = WorkQueue::new();

    let discounts = DiscountEngine::new(store.clone(), DiscountPolicy::default(), clock.clone());
    let checkout = CheckoutOrchestrator::new(
        store.clone(),
        index.clone(),
        discounts,
        config.shipping,
        clock.clone(),
    )
    .with_handler(StockDecrementHandler::new(index.clone()))
    .with_handler(NotificationHandler::new(notifications.clone()))
    .with_handler(OrderListInvalidation::new(list_cache.clone()));

    let orders = OrderService::new(store.clone(), order_cache, list_cache, clock);
    let dispatcher =
        NotificationDispatcher::new(notifications.clone(), notifier, config.notification_interval);

    let state = Arc::new(AppState {
        checkout,
        orders,
        index,
        notifications,
        store,
    });

    Ok((state, dispatcher))
}
