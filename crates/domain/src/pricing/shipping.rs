//! Shipping cost strategies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;
use crate::order::CartLine;

/// Errors raised while resolving or applying a shipping strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShippingError {
    /// The requested mode is not one of the configured strategies.
    #[error("Unknown shipping mode: {0:?}")]
    UnknownMode(String),

    /// Shipping cannot be priced for an empty cart.
    #[error("Cannot compute shipping for an empty cart")]
    EmptyCart,
}

/// Delivery method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMode {
    Standard,
    Express,
    Pickup,
}

impl ShippingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMode::Standard => "standard",
            ShippingMode::Express => "express",
            ShippingMode::Pickup => "pickup",
        }
    }
}

impl std::fmt::Display for ShippingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShippingMode {
    type Err = ShippingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(ShippingMode::Standard),
            "express" => Ok(ShippingMode::Express),
            "pickup" => Ok(ShippingMode::Pickup),
            _ => Err(ShippingError::UnknownMode(s.to_string())),
        }
    }
}

/// Computes the shipping cost of a cart for one delivery mode.
///
/// Implementations are pure: same lines, same cost.
pub trait ShippingCostStrategy: Send + Sync + std::fmt::Debug {
    /// The mode this strategy prices.
    fn mode(&self) -> ShippingMode;

    /// Returns the shipping cost for `lines`; fails on an empty cart.
    fn cost(&self, lines: &[CartLine]) -> Result<Money, ShippingError>;
}

/// Flat-rate ground delivery.
#[derive(Debug, Clone, Copy)]
pub struct StandardShipping {
    pub rate: Money,
}

impl ShippingCostStrategy for StandardShipping {
    fn mode(&self) -> ShippingMode {
        ShippingMode::Standard
    }

    fn cost(&self, lines: &[CartLine]) -> Result<Money, ShippingError> {
        if lines.is_empty() {
            return Err(ShippingError::EmptyCart);
        }
        Ok(self.rate)
    }
}

/// Flat-rate next-day delivery.
#[derive(Debug, Clone, Copy)]
pub struct ExpressShipping {
    pub rate: Money,
}

impl ShippingCostStrategy for ExpressShipping {
    fn mode(&self) -> ShippingMode {
        ShippingMode::Express
    }

    fn cost(&self, lines: &[CartLine]) -> Result<Money, ShippingError> {
        if lines.is_empty() {
            return Err(ShippingError::EmptyCart);
        }
        Ok(self.rate)
    }
}

/// Customer collects in store; always free.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickupShipping;

impl ShippingCostStrategy for PickupShipping {
    fn mode(&self) -> ShippingMode {
        ShippingMode::Pickup
    }

    fn cost(&self, lines: &[CartLine]) -> Result<Money, ShippingError> {
        if lines.is_empty() {
            return Err(ShippingError::EmptyCart);
        }
        Ok(Money::zero())
    }
}

/// Configured flat rates; resolves a mode to its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRates {
    pub standard: Money,
    pub express: Money,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            standard: Money::from_cents(5_000),
            express: Money::from_cents(15_000),
        }
    }
}

impl ShippingRates {
    /// Returns the strategy for a known mode.
    pub fn strategy(&self, mode: ShippingMode) -> Box<dyn ShippingCostStrategy> {
        match mode {
            ShippingMode::Standard => Box::new(StandardShipping {
                rate: self.standard,
            }),
            ShippingMode::Express => Box::new(ExpressShipping { rate: self.express }),
            ShippingMode::Pickup => Box::new(PickupShipping),
        }
    }

    /// Parses `mode` and returns its strategy, rejecting unknown names.
    pub fn strategy_for(&self, mode: &str) -> Result<Box<dyn ShippingCostStrategy>, ShippingError> {
        let mode: ShippingMode = mode.parse()?;
        Ok(self.strategy(mode))
    }
}
