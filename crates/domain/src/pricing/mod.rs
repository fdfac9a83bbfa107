//! Pricing: discount rules, discount folding, and shipping strategies.

mod discount;
mod policy;
mod shipping;

pub use discount::{AppliedDiscount, Discount, DiscountKind, FoldedPrice, fold, fold_itemized};
pub use policy::{
    CustomerOrderStats, DAY_OF_WEEK, DiscountContext, DiscountPolicy, FIRST_PURCHASE, ITEM_COUNT,
    LOYALTY, VOLUME,
};
pub use shipping::{
    ExpressShipping, PickupShipping, ShippingCostStrategy, ShippingError, ShippingMode,
    ShippingRates, StandardShipping,
};
