//! Domain error types.

use common::{OrderId, ProductId};
use order_store::StoreError;
use thiserror::Error;

use crate::order::ValidationError;

/// Errors that can occur while placing or loading an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request was rejected before a transaction was opened.
    #[error("Invalid order: {0}")]
    Validation(#[from] ValidationError),

    /// A statement inside the order transaction failed; nothing was written.
    #[error("Order transaction failed: {0}")]
    Transaction(#[source] StoreError),

    /// No storage connection could be acquired.
    #[error("Storage resource error: {0}")]
    Resource(#[source] StoreError),

    /// Strict stock policy: the order would take a product below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// A committed order has no receipt.
    #[error("Order {0} has no receipt")]
    MissingReceipt(OrderId),
}

impl OrderError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "validation",
            OrderError::Transaction(_) => "transaction",
            OrderError::Resource(_) => "resource",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::MissingReceipt(_) => "missing_receipt",
        }
    }

    /// Returns true if the caller may retry the same request.
    ///
    /// Failed orders leave no trace, so retrying a retryable failure never
    /// duplicates an order.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrderError::Resource(_) => true,
            OrderError::Transaction(err) => err.is_retryable(),
            _ => false,
        }
    }
}
