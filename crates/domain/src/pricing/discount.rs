//! Discounts and the fold that turns a subtotal into a discounted amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// How a discount reduces the running amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage (0..=100 scale) of the running amount at the point it is applied.
    Percentage(Decimal),

    /// Flat amount subtracted from the running amount.
    Fixed(Money),
}

/// A named price adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub name: String,
    pub kind: DiscountKind,
}

impl Discount {
    pub fn percentage(name: impl Into<String>, percent: Decimal) -> Self {
        Self {
            name: name.into(),
            kind: DiscountKind::Percentage(percent),
        }
    }

    pub fn fixed(name: impl Into<String>, amount: Money) -> Self {
        Self {
            name: name.into(),
            kind: DiscountKind::Fixed(amount),
        }
    }

    /// Amount this discount removes from `running`, bounded to `0..=running`.
    pub fn deduction_from(&self, running: Money) -> Money {
        let raw = match self.kind {
            DiscountKind::Percentage(percent) => running.percentage(percent),
            DiscountKind::Fixed(amount) => amount,
        };
        raw.max(Money::zero()).min(running.max(Money::zero()))
    }
}

/// A discount together with what it actually removed during a fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub name: String,
    pub kind: DiscountKind,
    pub deducted: Money,
}

/// Result of folding a discount list over a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldedPrice {
    /// Amount left after every discount, never negative.
    pub amount: Money,

    /// Each discount in application order with its deduction.
    pub applied: Vec<AppliedDiscount>,
}

impl FoldedPrice {
    /// Sum of all deductions.
    pub fn discount_total(&self) -> Money {
        self.applied.iter().map(|d| d.deducted).sum()
    }
}

/// Applies `discounts` to `subtotal` in list order and returns the final amount.
pub fn fold(subtotal: Money, discounts: &[Discount]) -> Money {
    fold_itemized(subtotal, discounts).amount
}

/// Applies `discounts` in list order, recording each deduction.
///
/// Percentages act on the running amount, so two 10% discounts remove 19% in
/// total. The running amount is clamped at zero after every step.
pub fn fold_itemized(subtotal: Money, discounts: &[Discount]) -> FoldedPrice {
    let start = subtotal.max(Money::zero());
    let mut applied = Vec::with_capacity(discounts.len());

    let amount = discounts.iter().fold(start, |running, discount| {
        let deducted = discount.deduction_from(running);
        applied.push(AppliedDiscount {
            name: discount.name.clone(),
            kind: discount.kind,
            deducted,
        });
        running.saturating_sub(deducted)
    });

    FoldedPrice { amount, applied }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(p: i64) -> Decimal {
        Decimal::from(p)
    }

    #[test]
    fn test_empty_list_returns_subtotal() {
        assert_eq!(fold(Money::from_cents(1234), &[]).cents(), 1234);
    }

    #[test]
    fn test_percentages_compound_on_running_amount() {
        let discounts = [
            Discount::percentage("a", pct(10)),
            Discount::percentage("b", pct(10)),
        ];
        // 100000 -> 90000 -> 81000
        assert_eq!(fold(Money::from_cents(100_000), &discounts).cents(), 81_000);
    }

    #[test]
    fn test_order_of_application_matters() {
        let fixed_first = [
            Discount::fixed("flat", Money::from_cents(10_000)),
            Discount::percentage("pct", pct(50)),
        ];
        let pct_first = [
            Discount::percentage("pct", pct(50)),
            Discount::fixed("flat", Money::from_cents(10_000)),
        ];
        let subtotal = Money::from_cents(100_000);

        assert_eq!(fold(subtotal, &fixed_first).cents(), 45_000);
        assert_eq!(fold(subtotal, &pct_first).cents(), 40_000);
    }

    #[test]
    fn test_fixed_larger_than_running_clamps_to_zero() {
        let discounts = [Discount::fixed("huge", Money::from_cents(500_000))];
        let folded = fold_itemized(Money::from_cents(1_000), &discounts);

        assert_eq!(folded.amount, Money::zero());
        assert_eq!(folded.applied[0].deducted.cents(), 1_000);
    }

    #[test]
    fn test_fold_never_negative_for_any_combination() {
        let pool = [
            Discount::percentage("p10", pct(10)),
            Discount::percentage("p100", pct(100)),
            Discount::percentage("p150", pct(150)),
            Discount::percentage("neg", pct(-20)),
            Discount::fixed("f1", Money::from_cents(1)),
            Discount::fixed("f50k", Money::from_cents(50_000)),
            Discount::fixed("negative", Money::from_cents(-5_000)),
        ];
        let subtotals = [0, 1, 99, 10_000, 200_000, 5_000_000];

        // Every ordered selection of up to three discounts from the pool.
        for subtotal in subtotals.map(Money::from_cents) {
            for a in &pool {
                for b in &pool {
                    for c in &pool {
                        let list = [a.clone(), b.clone(), c.clone()];
                        let folded = fold_itemized(subtotal, &list);
                        assert!(!folded.amount.is_negative(), "{list:?} on {subtotal}");
                        assert!(folded.amount <= subtotal);
                        assert_eq!(folded.amount + folded.discount_total(), subtotal);
                    }
                }
            }
        }
    }

    #[test]
    fn test_itemized_deductions_sum_to_discount_total() {
        let discounts = [
            Discount::percentage("first purchase", pct(10)),
            Discount::fixed("volume", Money::from_cents(5_000)),
        ];
        let folded = fold_itemized(Money::from_cents(200_000), &discounts);

        assert_eq!(folded.applied[0].deducted.cents(), 20_000);
        assert_eq!(folded.applied[1].deducted.cents(), 5_000);
        assert_eq!(folded.discount_total().cents(), 25_000);
        assert_eq!(folded.amount.cents(), 175_000);
    }
}
