//! Store-backed discount evaluation.

use std::sync::Arc;

use chrono::Datelike;
use domain::{CartLine, CustomerId, Discount, DiscountContext, DiscountPolicy, Money};
use store::Store;

use crate::Result;
use crate::clock::Clock;

/// Decides which discounts a checkout earns.
///
/// Looks up the customer's order history in the store and the current
/// weekday (UTC) from the clock, then evaluates the [`DiscountPolicy`].
pub struct DiscountEngine {
    store: Arc<dyn Store>,
    policy: DiscountPolicy,
    clock: Arc<dyn Clock>,
}

impl DiscountEngine {
    pub fn new(store: Arc<dyn Store>, policy: DiscountPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &DiscountPolicy {
        &self.policy
    }

    /// Returns the discounts that apply, in the order they must be folded.
    #[tracing::instrument(skip(self, lines))]
    pub async fn applicable_discounts(
        &self,
        customer_id: CustomerId,
        subtotal: Money,
        lines: &[CartLine],
    ) -> Result<Vec<Discount>> {
        let stats = self.store.customer_order_stats(customer_id).await?;
        let ctx = DiscountContext {
            stats,
            subtotal,
            total_quantity: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            weekday: self.clock.now().weekday(),
        };

        let discounts = self.policy.evaluate(&ctx);
        tracing::debug!(count = discounts.len(), "discounts evaluated");
        Ok(discounts)
    }
}
