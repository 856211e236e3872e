//! In-memory order store with failure injection, for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, ProductStatus, ReceiptId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    NewOrder, NewReceipt, Order, Product, Receipt, Result, StoreError,
    store::{OrderStore, StoreTransaction},
};

/// A step at which the in-memory store can be told to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    InsertOrder,
    InsertReceipt,
    AttachReceipt,
    DecrementStock(ProductId),
    MarkOutOfStock(ProductId),
    Commit,
}

impl std::fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePoint::InsertOrder => write!(f, "insert_order"),
            FailurePoint::InsertReceipt => write!(f, "insert_receipt"),
            FailurePoint::AttachReceipt => write!(f, "attach_receipt"),
            FailurePoint::DecrementStock(id) => write!(f, "decrement_stock({id})"),
            FailurePoint::MarkOutOfStock(id) => write!(f, "mark_out_of_stock({id})"),
            FailurePoint::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    receipts: HashMap<ReceiptId, Receipt>,
    products: HashMap<ProductId, Product>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: Tables,
    unavailable: bool,
    fail_at: Option<FailurePoint>,
}

/// In-memory order store for testing and local runs.
///
/// A transaction holds the store-wide lock from `begin` until it commits,
/// rolls back or is dropped, so transactions are fully serialized. Writes go
/// to a private copy of the tables that only replaces the committed tables
/// on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for product in products {
                state
                    .tables
                    .products
                    .insert(product.product_id.clone(), product);
            }
        }
        store
    }

    /// Makes `begin` fail, as if no connection could be acquired.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Makes every transaction fail when it reaches the given step.
    pub async fn fail_at(&self, point: FailurePoint) {
        self.state.lock().await.fail_at = Some(point);
    }

    /// Clears any configured failure.
    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.unavailable = false;
        state.fail_at = None;
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.tables.orders.len()
    }

    /// Returns the number of committed receipts.
    pub async fn receipt_count(&self) -> usize {
        self.state.lock().await.tables.receipts.len()
    }

    /// Returns every committed product.
    pub async fn products(&self) -> Vec<Product> {
        let state = self.state.lock().await;
        let mut products: Vec<_> = state.tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        products
    }
}

/// Transaction over an [`InMemoryOrderStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: Tables,
}

impl InMemoryTransaction {
    fn check(&self, point: FailurePoint) -> Result<()> {
        if self.guard.fail_at.as_ref() == Some(&point) {
            return Err(StoreError::Unavailable(format!(
                "simulated failure at {point}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        self.check(FailurePoint::InsertOrder)?;

        let now = Utc::now();
        let order = Order::from_new(OrderId::new(), order, now, now);
        self.working.orders.insert(order.order_id, order.clone());
        Ok(order)
    }

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> Result<Receipt> {
        self.check(FailurePoint::InsertReceipt)?;

        if !self.working.orders.contains_key(&receipt.order_id) {
            return Err(StoreError::OrderNotFound(receipt.order_id));
        }

        let receipt = Receipt {
            receipt_id: ReceiptId::new(),
            order_id: receipt.order_id,
            payment_method: receipt.payment_method,
            price_paid: receipt.price_paid,
            created_at: Utc::now(),
        };
        self.working
            .receipts
            .insert(receipt.receipt_id, receipt.clone());
        Ok(receipt)
    }

    async fn attach_receipt(
        &mut self,
        order_id: OrderId,
        receipt_id: ReceiptId,
    ) -> Result<DateTime<Utc>> {
        self.check(FailurePoint::AttachReceipt)?;

        let order = self
            .working
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.receipt_id = Some(receipt_id);
        order.updated_at = Utc::now();
        Ok(order.updated_at)
    }

    async fn decrement_stock(&mut self, product_id: &ProductId, quantity: i32) -> Result<i32> {
        self.check(FailurePoint::DecrementStock(product_id.clone()))?;

        let product = self
            .working
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        product.stock_quantity = product
            .stock_quantity
            .checked_sub(quantity)
            .ok_or_else(|| StoreError::StockOutOfRange(product_id.clone()))?;
        Ok(product.stock_quantity)
    }

    async fn mark_out_of_stock(&mut self, product_id: &ProductId) -> Result<bool> {
        self.check(FailurePoint::MarkOutOfStock(product_id.clone()))?;

        let product = self
            .working
            .products
            .get_mut(product_id)
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        if product.stock_quantity > 0 || product.status == ProductStatus::OutOfStock {
            return Ok(false);
        }
        product.status = ProductStatus::OutOfStock;
        Ok(true)
    }

    async fn commit(self) -> Result<()> {
        self.check(FailurePoint::Commit)?;

        let InMemoryTransaction { mut guard, working } = self;
        guard.tables = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        // Dropping the guard discards the working copy.
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        let guard = self.state.clone().lock_owned().await;
        if guard.unavailable {
            return Err(StoreError::Unavailable(
                "no connection available".to_string(),
            ));
        }

        let working = guard.tables.clone();
        Ok(InMemoryTransaction { guard, working })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.tables.orders.get(&order_id).cloned())
    }

    async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>> {
        let state = self.state.lock().await;
        Ok(state.tables.receipts.get(&receipt_id).cloned())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.tables.products.get(product_id).cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .tables
            .products
            .insert(product.product_id.clone(), product.clone());
        Ok(())
    }
}
