//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use common::{LineItems, Money, OrderType, PaymentMethod, ProductId, ProductStatus};
use order_store::{
    NewOrder, NewReceipt, OrderStore, PostgresOrderStore, Product, StoreError, StoreTransaction,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, receipts, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn new_order(products: LineItems) -> NewOrder {
    NewOrder {
        products,
        price: Money::from_dollars(50),
        discount: Money::zero(),
        discount_code: Some("SPRING".to_string()),
        is_shipping: true,
        shipping_location: Some("12 Market St".to_string()),
        total_price: Money::from_dollars(50),
        order_type: OrderType::Online,
        customer_id: None,
        cashier_id: None,
    }
}

async fn stock_of(store: &PostgresOrderStore, id: &str) -> (i32, ProductStatus) {
    let product = store
        .get_product(&ProductId::new(id))
        .await
        .unwrap()
        .unwrap();
    (product.stock_quantity, product.status)
}

#[tokio::test]
#[serial]
async fn insert_order_and_receipt_then_link() {
    let store = get_test_store().await;
    let products = LineItems::new().with("P2", 1).with("P1", 2);

    let mut tx = store.begin().await.unwrap();
    let order = tx.insert_order(&new_order(products.clone())).await.unwrap();
    let receipt = tx
        .insert_receipt(&NewReceipt {
            order_id: order.order_id,
            payment_method: PaymentMethod::Card,
            price_paid: Money::from_dollars(50),
        })
        .await
        .unwrap();
    tx.attach_receipt(order.order_id, receipt.receipt_id)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let stored = store.get_order(order.order_id).await.unwrap().unwrap();
    assert_eq!(stored.receipt_id, Some(receipt.receipt_id));
    assert_eq!(stored.products, products);
    assert_eq!(stored.discount_code.as_deref(), Some("SPRING"));
    assert_eq!(stored.order_type, OrderType::Online);

    let stored_receipt = store.get_receipt(receipt.receipt_id).await.unwrap().unwrap();
    assert_eq!(stored_receipt.order_id, order.order_id);
    assert_eq!(stored_receipt.payment_method, PaymentMethod::Card);
}

#[tokio::test]
#[serial]
async fn rollback_discards_everything() {
    let store = get_test_store().await;
    store
        .upsert_product(&Product::new("P1", "Widget", 5))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let order = tx
        .insert_order(&new_order(LineItems::new().with("P1", 5)))
        .await
        .unwrap();
    tx.decrement_stock(&ProductId::new("P1"), 5).await.unwrap();
    tx.mark_out_of_stock(&ProductId::new("P1")).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(store.get_order(order.order_id).await.unwrap().is_none());
    assert_eq!(stock_of(&store, "P1").await, (5, ProductStatus::InStock));
}

#[tokio::test]
#[serial]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    store
        .upsert_product(&Product::new("P1", "Widget", 5))
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.decrement_stock(&ProductId::new("P1"), 3).await.unwrap();
    }

    assert_eq!(stock_of(&store, "P1").await, (5, ProductStatus::InStock));
}

#[tokio::test]
#[serial]
async fn decrement_returns_new_stock_and_may_go_negative() {
    let store = get_test_store().await;
    store
        .upsert_product(&Product::new("P1", "Widget", 2))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.decrement_stock(&ProductId::new("P1"), 3).await.unwrap(), -1);
    assert!(tx.mark_out_of_stock(&ProductId::new("P1")).await.unwrap());
    // Already out of stock: the guarded update changes nothing.
    assert!(!tx.mark_out_of_stock(&ProductId::new("P1")).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!(stock_of(&store, "P1").await, (-1, ProductStatus::OutOfStock));
}

#[tokio::test]
#[serial]
async fn mark_out_of_stock_ignores_products_with_stock() {
    let store = get_test_store().await;
    store
        .upsert_product(&Product::new("P1", "Widget", 4))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.decrement_stock(&ProductId::new("P1"), 1).await.unwrap();
    assert!(!tx.mark_out_of_stock(&ProductId::new("P1")).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!(stock_of(&store, "P1").await, (3, ProductStatus::InStock));
}

#[tokio::test]
#[serial]
async fn decrement_of_unknown_product_fails() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let result = tx.decrement_stock(&ProductId::new("MISSING"), 1).await;
    assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
}

#[tokio::test]
#[serial]
async fn receipt_requires_existing_order() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let result = tx
        .insert_receipt(&NewReceipt {
            order_id: common::OrderId::new(),
            payment_method: PaymentMethod::Cash,
            price_paid: Money::from_cents(100),
        })
        .await;
    assert!(matches!(result, Err(StoreError::Database(_))));
}

#[tokio::test]
#[serial]
async fn concurrent_decrements_do_not_lose_updates() {
    let store = get_test_store().await;
    store
        .upsert_product(&Product::new("P1", "Widget", 10))
        .await
        .unwrap();

    // The first transaction holds the row lock; the second blocks on its
    // decrement until the first commits, then subtracts from the new value.
    let mut first = store.begin().await.unwrap();
    assert_eq!(first.decrement_stock(&ProductId::new("P1"), 3).await.unwrap(), 7);

    let second_store = store.clone();
    let second = tokio::spawn(async move {
        let mut tx = second_store.begin().await.unwrap();
        let remaining = tx.decrement_stock(&ProductId::new("P1"), 3).await.unwrap();
        tx.commit().await.unwrap();
        remaining
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!second.is_finished());
    first.commit().await.unwrap();

    assert_eq!(second.await.unwrap(), 4);
    assert_eq!(stock_of(&store, "P1").await, (4, ProductStatus::InStock));
}

#[tokio::test]
#[serial]
async fn uncommitted_decrements_are_invisible_to_readers() {
    let store = get_test_store().await;
    store
        .upsert_product(&Product::new("P1", "Widget", 10))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.decrement_stock(&ProductId::new("P1"), 6).await.unwrap();

    assert_eq!(stock_of(&store, "P1").await, (10, ProductStatus::InStock));

    tx.commit().await.unwrap();
    assert_eq!(stock_of(&store, "P1").await, (4, ProductStatus::InStock));
}
