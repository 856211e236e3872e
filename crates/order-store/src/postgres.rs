//! PostgreSQL order store backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    CashierId, CustomerId, LineItems, Money, OrderId, ProductId, ProductStatus, ReceiptId,
};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    NewOrder, NewReceipt, Order, Product, Receipt, Result, StoreError,
    store::{OrderStore, StoreTransaction},
};

/// SQLSTATE `22003`, numeric_value_out_of_range.
fn is_out_of_range(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22003"))
}

const ORDER_COLUMNS: &str = "order_id, products::text AS products, price, discount, \
     discount_code, is_shipping, shipping_location, total_price, order_type, customer_id, \
     cashier_id, receipt_id, created_at, updated_at";

/// PostgreSQL-backed order store.
///
/// Runs at the server's default isolation level (READ COMMITTED). Stock is
/// adjusted with `UPDATE ... RETURNING`, which takes the product row lock
/// itself, so concurrent orders cannot lose each other's decrements.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
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

    fn row_to_order(row: PgRow) -> Result<Order> {
        let products: String = row.try_get("products")?;
        let products: LineItems = serde_json::from_str(&products)?;
        let order_type: String = row.try_get("order_type")?;

        Ok(Order {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            products,
            price: Money::from_cents(row.try_get("price")?),
            discount: Money::from_cents(row.try_get("discount")?),
            discount_code: row.try_get("discount_code")?,
            is_shipping: row.try_get("is_shipping")?,
            shipping_location: row.try_get("shipping_location")?,
            total_price: Money::from_cents(row.try_get("total_price")?),
            order_type: order_type.parse()?,
            customer_id: row
                .try_get::<Option<Uuid>, _>("customer_id")?
                .map(CustomerId::from_uuid),
            cashier_id: row
                .try_get::<Option<Uuid>, _>("cashier_id")?
                .map(CashierId::from_uuid),
            receipt_id: row
                .try_get::<Option<Uuid>, _>("receipt_id")?
                .map(ReceiptId::from_uuid),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_receipt(row: PgRow) -> Result<Receipt> {
        let payment_method: String = row.try_get("payment_method")?;

        Ok(Receipt {
            receipt_id: ReceiptId::from_uuid(row.try_get::<Uuid, _>("receipt_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            payment_method: payment_method.parse()?,
            price_paid: Money::from_cents(row.try_get("price_paid")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let status: String = row.try_get("status")?;

        Ok(Product {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            name: row.try_get("name")?,
            stock_quantity: row.try_get("stock_quantity")?,
            status: status.parse()?,
        })
    }
}

/// Transaction over a [`PostgresOrderStore`] connection.
///
/// Wraps a `sqlx` transaction, which rolls back and returns its connection
/// to the pool when dropped unfinished.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        let order_id = OrderId::new();

        let row = sqlx::query(
            r#"
            INSERT INTO orders (order_id, products, price, discount, discount_code, is_shipping,
                                shipping_location, total_price, order_type, customer_id, cashier_id)
            VALUES ($1, $2::json, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING created_at, updated_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(serde_json::to_string(&order.products)?)
        .bind(order.price.cents())
        .bind(order.discount.cents())
        .bind(&order.discount_code)
        .bind(order.is_shipping)
        .bind(&order.shipping_location)
        .bind(order.total_price.cents())
        .bind(order.order_type.as_str())
        .bind(order.customer_id.map(|id| id.as_uuid()))
        .bind(order.cashier_id.map(|id| id.as_uuid()))
        .fetch_one(&mut *self.tx)
        .await?;

        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        Ok(Order::from_new(order_id, order, created_at, updated_at))
    }

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> Result<Receipt> {
        let receipt_id = ReceiptId::new();

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO receipts (receipt_id, order_id, payment_method, price_paid)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(receipt_id.as_uuid())
        .bind(receipt.order_id.as_uuid())
        .bind(receipt.payment_method.as_str())
        .bind(receipt.price_paid.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Receipt {
            receipt_id,
            order_id: receipt.order_id,
            payment_method: receipt.payment_method,
            price_paid: receipt.price_paid,
            created_at,
        })
    }

    async fn attach_receipt(
        &mut self,
        order_id: OrderId,
        receipt_id: ReceiptId,
    ) -> Result<DateTime<Utc>> {
        let updated_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            UPDATE orders SET receipt_id = $2, updated_at = now()
            WHERE order_id = $1
            RETURNING updated_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(receipt_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        updated_at.ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn decrement_stock(&mut self, product_id: &ProductId, quantity: i32) -> Result<i32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now()
            WHERE product_id = $1
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id.as_str())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| {
            if is_out_of_range(&err) {
                StoreError::StockOutOfRange(product_id.clone())
            } else {
                StoreError::Database(err)
            }
        })?;

        remaining.ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))
    }

    async fn mark_out_of_stock(&mut self, product_id: &ProductId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET status = $2, updated_at = now()
            WHERE product_id = $1 AND stock_quantity <= 0 AND status <> $2
            "#,
        )
        .bind(product_id.as_str())
        .bind(ProductStatus::OutOfStock.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT receipt_id, order_id, payment_method, price_paid, created_at
            FROM receipts
            WHERE receipt_id = $1
            "#,
        )
        .bind(receipt_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_receipt).transpose()
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT product_id, name, stock_quantity, status
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, name, stock_quantity, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id) DO UPDATE SET
                name = EXCLUDED.name,
                stock_quantity = EXCLUDED.stock_quantity,
                status = EXCLUDED.status,
                updated_at = now()
            "#,
        )
        .bind(product.product_id.as_str())
        .bind(&product.name)
        .bind(product.stock_quantity)
        .bind(product.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
