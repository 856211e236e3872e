//! Order placement: request validation, policies and the transaction processor.

mod policy;
mod processor;
mod request;

pub use policy::{LockOrder, ProcessorConfig, StockPolicy, UnknownPolicy};
pub use processor::{OrderProcessor, PlacedOrder};
pub use request::OrderRequest;

use common::ProductId;
use thiserror::Error;

/// Structural problems with an order request, found before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request has no line items.
    #[error("Order has no line items")]
    NoLineItems,

    /// A line item asks for zero or fewer units.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    NonPositiveQuantity { product_id: ProductId, quantity: i32 },

    /// The same product appears in more than one line item.
    #[error("Product {0} appears more than once")]
    DuplicateProduct(ProductId),

    /// A shipping order has no shipping location.
    #[error("Shipping location is required for shipping orders")]
    MissingShippingLocation,
}
