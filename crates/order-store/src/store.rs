//! Storage traits implemented by every order store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, ReceiptId};

use crate::{NewOrder, NewReceipt, Order, Product, Receipt, Result};

/// An open unit of work against the order store.
///
/// Statements issued through a transaction are all-or-nothing: nothing is
/// visible to other readers until [`commit`](Self::commit) succeeds.
/// Dropping a transaction without committing rolls it back and returns the
/// underlying connection, so every exit path releases its resources.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Inserts an order row and returns it with its generated identifier
    /// and timestamps. The returned order has no receipt yet.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order>;

    /// Inserts a receipt row for an order inserted earlier in this transaction.
    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> Result<Receipt>;

    /// Points an order at its receipt. Returns the order's new `updated_at`.
    async fn attach_receipt(
        &mut self,
        order_id: OrderId,
        receipt_id: ReceiptId,
    ) -> Result<DateTime<Utc>>;

    /// Subtracts `quantity` from a product's stock and returns the new stock.
    ///
    /// The subtraction is a single write that locks the product row until the
    /// transaction ends, so concurrent decrements of the same product are
    /// serialized instead of overwriting each other. Stock may go negative.
    async fn decrement_stock(&mut self, product_id: &ProductId, quantity: i32) -> Result<i32>;

    /// Marks a product out of stock if its stock is zero or below.
    ///
    /// Returns true if the status changed.
    async fn mark_out_of_stock(&mut self, product_id: &ProductId) -> Result<bool>;

    /// Makes every statement of this transaction durable.
    async fn commit(self) -> Result<()>;

    /// Discards every statement of this transaction.
    async fn rollback(self) -> Result<()>;
}

/// Storage adapter for orders, receipts and product stock.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Acquires a connection and opens a transaction on it.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Loads a committed order.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads a committed receipt.
    async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>>;

    /// Loads a product's committed stock state.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Inserts or replaces a product. Used to seed stock outside of orders.
    async fn upsert_product(&self, product: &Product) -> Result<()>;
}
