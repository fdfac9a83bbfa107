//! Append-only status history entries.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// One recorded status change of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// The status the order moved into.
    pub status: OrderStatus,

    /// When the change happened.
    pub at: DateTime<Utc>,

    /// Who requested the change; `None` for system-initiated changes.
    pub actor: Option<UserId>,
}

impl StatusChange {
    pub fn new(status: OrderStatus, at: DateTime<Utc>, actor: Option<UserId>) -> Self {
        Self { status, at, actor }
    }

    /// Returns true when no user requested this change.
    pub fn is_system(&self) -> bool {
        self.actor.is_none()
    }
}
