//! Transactional storage for orders, receipts and product stock.
//!
//! [`OrderStore`] opens [`StoreTransaction`]s whose statements commit or roll
//! back together. Two adapters are provided: [`PostgresOrderStore`] for
//! production and [`InMemoryOrderStore`] for tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{FailurePoint, InMemoryOrderStore, InMemoryTransaction};
pub use postgres::{PostgresOrderStore, PostgresTransaction};
pub use record::{NewOrder, NewReceipt, Order, Product, Receipt};
pub use store::{OrderStore, StoreTransaction};
