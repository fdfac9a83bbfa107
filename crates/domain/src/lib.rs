//! Domain layer for the checkout engine.
//!
//! This crate provides the pure business types:
//! - Money arithmetic in minor units
//! - Order aggregate with its status state machine and history
//! - Discount rules, discount folding, and shipping strategies
//! - Product availability records, customer profiles, and caller identity

pub mod catalog;
pub mod customer;
pub mod identity;
pub mod money;
pub mod order;
pub mod pricing;

pub use catalog::ProductRecord;
pub use customer::CustomerProfile;
pub use common::{OrderId, UserId};
pub use identity::{Identity, Role};
pub use money::Money;
pub use order::{
    CartLine, CustomerId, Order, OrderError, OrderItem, OrderParts, OrderStatus, PlaceOrder,
    ProductId, ShippingAddress, StatusChange, UnknownStatus, merge_cart_lines,
};
pub use pricing::{
    AppliedDiscount, CustomerOrderStats, Discount, DiscountContext, DiscountKind, DiscountPolicy,
    FoldedPrice, ShippingCostStrategy, ShippingError, ShippingMode, ShippingRates, fold,
    fold_itemized,
};
