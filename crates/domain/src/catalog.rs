//! Product availability records.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::ProductId;

/// Stock and price of one product as known to the store of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub stock: u32,
}

impl ProductRecord {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            stock,
        }
    }

    /// Returns true if `quantity` units can be taken from current stock.
    pub fn can_supply(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}
