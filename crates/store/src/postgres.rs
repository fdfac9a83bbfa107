use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::{
    CustomerId, CustomerOrderStats, CustomerProfile, Money, Order, OrderItem, OrderParts,
    OrderStatus, ProductId, ProductRecord, ShippingAddress, ShippingMode, StatusChange,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{Store, StoreTransaction},
};

const STOCK_CONSTRAINT: &str = "products_stock_non_negative";
const ORDERS_PKEY: &str = "orders_pkey";
const ORDERS_CUSTOMER_FKEY: &str = "orders_customer_id_fkey";

/// PostgreSQL-backed store of record.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts a product or overwrites its name, price, and stock.
    pub async fn upsert_product(&self, product: &ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, unit_price_cents, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                unit_price_cents = EXCLUDED.unit_price_cents,
                stock = EXCLUDED.stock
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(stock_to_db(product.stock)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts a customer or overwrites their email.
    pub async fn upsert_customer(&self, customer: &CustomerProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        let stock: i32 = row.try_get("stock")?;
        Ok(ProductRecord {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            stock: u32::try_from(stock)
                .map_err(|_| StoreError::Corrupt(format!("negative stock {stock}")))?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity}")))?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_status_change(row: PgRow) -> Result<StatusChange> {
        let status: String = row.try_get("status")?;
        let actor: Option<Uuid> = row.try_get("actor_id")?;
        Ok(StatusChange {
            status: parse_status(&status)?,
            at: row.try_get::<DateTime<Utc>, _>("changed_at")?,
            actor: actor.map(UserId::from_uuid),
        })
    }
}

fn parse_status(status: &str) -> Result<OrderStatus> {
    status
        .parse()
        .map_err(|e: domain::UnknownStatus| StoreError::Corrupt(e.to_string()))
}

fn stock_to_db(stock: u32) -> Result<i32> {
    i32::try_from(stock).map_err(|_| StoreError::Corrupt(format!("stock {stock} out of range")))
}

fn quantity_to_db(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity {quantity} out of range")))
}

#[async_trait]
impl Store for PostgresStore {
    async fn load_products(&self) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, unit_price_cents, stock
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn customer_profile(&self, customer_id: CustomerId) -> Result<Option<CustomerProfile>> {
        let row = sqlx::query("SELECT id, email FROM customers WHERE id = $1")
            .bind(customer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(CustomerProfile {
                id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }

    async fn customer_order_stats(&self, customer_id: CustomerId) -> Result<CustomerOrderStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS prior_orders,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed_orders
            FROM orders
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let prior: i64 = row.try_get("prior_orders")?;
        let completed: i64 = row.try_get("completed_orders")?;
        Ok(CustomerOrderStats {
            prior_orders: prior.max(0) as u64,
            completed_orders: completed.max(0) as u64,
        })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, customer_id, subtotal_cents, discount_cents, shipping_cents, total_cents,
                   status, shipping_mode, shipping_address, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_item)
        .collect::<Result<Vec<_>>>()?;

        let history = sqlx::query(
            r#"
            SELECT status, changed_at, actor_id
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_status_change)
        .collect::<Result<Vec<_>>>()?;

        let status: String = row.try_get("status")?;
        let mode: String = row.try_get("shipping_mode")?;
        let address: String = row.try_get("shipping_address")?;

        let order = Order::restore(OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            items,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            discount_total: Money::from_cents(row.try_get("discount_cents")?),
            shipping_cost: Money::from_cents(row.try_get("shipping_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            status: parse_status(&status)?,
            shipping_mode: mode
                .parse::<ShippingMode>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            shipping_address: ShippingAddress::parse(address)?,
            created_at: row.try_get("created_at")?,
            history,
        })?;

        Ok(Some(order))
    }

    async fn list_orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            // Rows deleted between the two queries are skipped.
            if let Some(order) = self.get_order(OrderId::from_uuid(id)).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// A database transaction implementing [`StoreTransaction`].
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let order_id = order.id();

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, subtotal_cents, discount_cents, shipping_cents,
                                total_cents, status, shipping_mode, shipping_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(order.subtotal().cents())
        .bind(order.discount_total().cents())
        .bind(order.shipping_cost().cents())
        .bind(order.total().cents())
        .bind(order.status().as_str())
        .bind(order.shipping_mode().as_str())
        .bind(order.shipping_address().as_str())
        .bind(order.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some(ORDERS_PKEY) => return StoreError::DuplicateOrder(order_id),
                    Some(ORDERS_CUSTOMER_FKEY) => {
                        return StoreError::UnknownCustomer(order.customer_id());
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items().iter().enumerate() {
            let quantity = quantity_to_db(item.quantity)?;

            let updated = sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(item.product_id.as_str())
                .bind(quantity)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some(STOCK_CONSTRAINT)
                    {
                        return StoreError::StockConstraint(item.product_id.clone());
                    }
                    StoreError::Database(e)
                })?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::UnknownProduct(item.product_id.clone()));
            }

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(&item.product_name)
            .bind(quantity)
            .bind(item.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        for (seq, change) in order.history().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_status_history (order_id, seq, status, changed_at, actor_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(seq as i32 + 1)
            .bind(change.status.as_str())
            .bind(change.at)
            .bind(change.actor.map(|a| a.as_uuid()))
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn record_status_change(
        &mut self,
        order_id: OrderId,
        expected: OrderStatus,
        change: &StatusChange,
    ) -> Result<()> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        let actual = match current {
            Some(status) => parse_status(&status)?,
            None => return Err(StoreError::OrderNotFound(order_id)),
        };

        if actual != expected {
            return Err(StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            });
        }

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(change.status.as_str())
            .execute(&mut *self.tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, seq, status, changed_at, actor_id)
            SELECT $1, COALESCE(MAX(seq), 0) + 1, $2, $3, $4
            FROM order_status_history
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(change.status.as_str())
        .bind(change.at)
        .bind(change.actor.map(|a| a.as_uuid()))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
