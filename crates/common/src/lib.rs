//! Shared identifiers and value objects for the order transaction system.

pub mod types;
pub mod value_objects;

pub use types::{CashierId, CustomerId, OrderId, ProductId, ReceiptId};
pub use value_objects::{
    LineItem, LineItems, Money, OrderType, ParseEnumError, PaymentMethod, ProductStatus,
};
