//! Business rules deciding which discounts a checkout earns.

use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

use super::Discount;

pub const FIRST_PURCHASE: &str = "first_purchase";
pub const VOLUME: &str = "volume";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const ITEM_COUNT: &str = "item_count";
pub const LOYALTY: &str = "loyalty";

/// What the store of record knows about a customer's past orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrderStats {
    /// Orders placed before this checkout, in any status.
    pub prior_orders: u64,

    /// Orders that reached `completed`.
    pub completed_orders: u64,
}

/// Inputs the rules are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct DiscountContext {
    pub stats: CustomerOrderStats,
    pub subtotal: Money,
    pub total_quantity: u64,
    pub weekday: Weekday,
}

/// Thresholds and amounts for the five discount rules.
///
/// Rules are independent; any subset may fire. They are always emitted in the
/// order first-purchase, volume, day-of-week, item-count, loyalty, and that is
/// the order they are folded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    pub first_purchase_percent: Decimal,
    pub volume_threshold: Money,
    pub volume_discount: Money,
    pub promotion_day: Weekday,
    pub promotion_percent: Decimal,
    pub item_count_threshold: u64,
    pub item_count_discount: Money,
    pub loyalty_completed_orders: u64,
    pub loyalty_percent: Decimal,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            first_purchase_percent: Decimal::from(10),
            volume_threshold: Money::from_cents(1_000_000),
            volume_discount: Money::from_cents(50_000),
            promotion_day: Weekday::Fri,
            promotion_percent: Decimal::from(5),
            item_count_threshold: 10,
            item_count_discount: Money::from_cents(10_000),
            loyalty_completed_orders: 5,
            loyalty_percent: Decimal::from(3),
        }
    }
}

impl DiscountPolicy {
    /// Returns every discount the context qualifies for, in application order.
    pub fn evaluate(&self, ctx: &DiscountContext) -> Vec<Discount> {
        let mut discounts = Vec::new();

        if ctx.stats.prior_orders == 0 {
            discounts.push(Discount::percentage(
                FIRST_PURCHASE,
                self.first_purchase_percent,
            ));
        }

        if ctx.subtotal >= self.volume_threshold {
            discounts.push(Discount::fixed(VOLUME, self.volume_discount));
        }

        if ctx.weekday == self.promotion_day {
            discounts.push(Discount::percentage(DAY_OF_WEEK, self.promotion_percent));
        }

        if ctx.total_quantity >= self.item_count_threshold {
            discounts.push(Discount::fixed(ITEM_COUNT, self.item_count_discount));
        }

        if ctx.stats.completed_orders >= self.loyalty_completed_orders {
            discounts.push(Discount::percentage(LOYALTY, self.loyalty_percent));
        }

        discounts
    }
}
