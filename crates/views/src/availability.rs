//! Product availability index: an in-memory mirror of stock and price.

use std::collections::HashMap;

use domain::{ProductId, ProductRecord};
use parking_lot::Mutex;
use store::Store;

use crate::Result;
use crate::error::StockError;

/// In-memory view of every product's stock and current price.
///
/// Checkout validates against the index instead of the store. Each operation
/// is a single critical section, so `decrement` is an atomic
/// check-and-subtract and concurrent callers can never drive stock below zero.
/// The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct AvailabilityIndex {
    products: Mutex<HashMap<ProductId, ProductRecord>>,
}

impl AvailabilityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index holding the given records.
    pub fn from_records(records: impl IntoIterator<Item = ProductRecord>) -> Self {
        let products = records.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: Mutex::new(products),
        }
    }

    /// Replaces the index contents with the products in the store.
    ///
    /// Products are loaded before the lock is taken and swapped in at once;
    /// on error the index keeps its previous contents.
    #[tracing::instrument(skip(self, store))]
    pub async fn rebuild(&self, store: &dyn Store) -> Result<usize> {
        let loaded: HashMap<_, _> = store
            .load_products()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let count = loaded.len();

        *self.products.lock() = loaded;

        metrics::gauge!("availability_index_products").set(count as f64);
        tracing::info!(products = count, "availability index rebuilt");
        Ok(count)
    }

    /// Returns a copy of the product's record.
    pub fn lookup(&self, product_id: &ProductId) -> Option<ProductRecord> {
        self.products.lock().get(product_id).cloned()
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn has_stock(&self, product_id: &ProductId, quantity: u32) -> bool {
        self.products
            .lock()
            .get(product_id)
            .is_some_and(|p| p.can_supply(quantity))
    }

    /// Takes `quantity` units from the product's stock, returning what remains.
    pub fn decrement(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> std::result::Result<u32, StockError> {
        let mut products = self.products.lock();
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| StockError::UnknownProduct(product_id.clone()))?;

        if !product.can_supply(quantity) {
            return Err(StockError::Insufficient {
                product_id: product_id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        Ok(product.stock)
    }

    /// Inserts or replaces one product, e.g. after an administrative edit.
    pub fn apply_external_update(&self, record: ProductRecord) {
        tracing::debug!(product_id = %record.id, stock = record.stock, "external product update");
        self.products.lock().insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.products.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.lock().is_empty()
    }

    /// Returns every record sorted by product id.
    pub fn snapshot(&self) -> Vec<ProductRecord> {
        let mut records: Vec<_> = self.products.lock().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

#[cfg(test)]
mod tests {
    use domain::Money;

    use super::*;

    fn index() -> AvailabilityIndex {
        AvailabilityIndex::from_records([
            ProductRecord::new("SKU-A", "Anvil", Money::from_cents(100_000), 10),
            ProductRecord::new("SKU-B", "Bucket", Money::from_cents(2_500), 0),
        ])
    }

    #[test]
    fn lookup_returns_copy() {
        let index = index();
        let mut record = index.lookup(&"SKU-A".into()).unwrap();
        record.stock = 0;

        assert_eq!(index.lookup(&"SKU-A".into()).unwrap().stock, 10);
        assert!(index.lookup(&"SKU-Z".into()).is_none());
    }

    #[test]
    fn has_stock_bounds() {
        let index = index();
        assert!(index.has_stock(&"SKU-A".into(), 10));
        assert!(!index.has_stock(&"SKU-A".into(), 11));
        assert!(!index.has_stock(&"SKU-B".into(), 1));
        assert!(!index.has_stock(&"SKU-Z".into(), 1));
    }

    #[test]
    fn decrement_returns_remaining() {
        let index = index();
        assert_eq!(index.decrement(&"SKU-A".into(), 2), Ok(8));
        assert_eq!(index.decrement(&"SKU-A".into(), 8), Ok(0));
    }

    #[test]
    fn decrement_refuses_to_go_negative() {
        let index = index();
        let err = index.decrement(&"SKU-A".into(), 11).unwrap_err();

        assert_eq!(
            err,
            StockError::Insufficient {
                product_id: "SKU-A".into(),
                requested: 11,
                available: 10,
            }
        );
        assert_eq!(index.lookup(&"SKU-A".into()).unwrap().stock, 10);
    }

    #[test]
    fn decrement_unknown_product() {
        assert_eq!(
            index().decrement(&"SKU-Z".into(), 1),
            Err(StockError::UnknownProduct("SKU-Z".into()))
        );
    }

    #[test]
    fn external_update_inserts_and_replaces() {
        let index = index();
        index.apply_external_update(ProductRecord::new(
            "SKU-B",
            "Bucket",
            Money::from_cents(3_000),
            4,
        ));
        index.apply_external_update(ProductRecord::new(
            "SKU-C",
            "Chisel",
            Money::from_cents(900),
            1,
        ));

        assert_eq!(index.len(), 3);
        let bucket = index.lookup(&"SKU-B".into()).unwrap();
        assert_eq!(bucket.stock, 4);
        assert_eq!(bucket.unit_price, Money::from_cents(3_000));
    }

    #[test]
    fn snapshot_is_sorted() {
        let ids: Vec<_> = index()
            .snapshot()
            .into_iter()
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(ids, ["SKU-A", "SKU-B"]);
    }
}
