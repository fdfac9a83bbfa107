//! Customer notification delivery.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{CustomerId, Money};
use parking_lot::Mutex;
use thiserror::Error;

/// An order confirmation waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTask {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub contact: String,
    pub total: Money,
}

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Delivery to {contact} failed: {reason}")]
    Delivery { contact: String, reason: String },
}

/// Sends a notification to a customer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, task: &NotificationTask) -> Result<(), NotifyError>;
}

/// Writes each notification as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, task: &NotificationTask) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %task.order_id,
            customer_id = %task.customer_id,
            contact = %task.contact,
            total = %task.total,
            "order confirmation sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    delivered: Vec<NotificationTask>,
    attempts: usize,
    fail_on_deliver: bool,
}

/// Records deliveries in memory, for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail until reset.
    pub fn set_fail_on_deliver(&self, fail: bool) {
        self.state.lock().fail_on_deliver = fail;
    }

    /// Successfully delivered tasks, in delivery order.
    pub fn delivered(&self) -> Vec<NotificationTask> {
        self.state.lock().delivered.clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.state.lock().delivered.len()
    }

    /// Deliveries attempted, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn deliver(&self, task: &NotificationTask) -> Result<(), NotifyError> {
        let mut state = self.state.lock();
        state.attempts += 1;

        if state.fail_on_deliver {
            return Err(NotifyError::Delivery {
                contact: task.contact.clone(),
                reason: "mailbox unavailable".to_string(),
            });
        }

        state.delivered.push(task.clone());
        Ok(())
    }
}
