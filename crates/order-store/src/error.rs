use common::{OrderId, ParseEnumError, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stock adjustment referenced a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A stock adjustment would take a product beyond the representable range.
    #[error("Stock out of range for product: {0}")]
    StockOutOfRange(ProductId),

    /// The order to attach a receipt to does not exist in this transaction.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stored value could not be decoded into its domain type.
    #[error("Decode error: {0}")]
    Decode(#[from] ParseEnumError),

    /// The store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if the same call may succeed when issued again.
    ///
    /// Covers pool exhaustion and the PostgreSQL serialization failure
    /// (`40001`) and deadlock (`40P01`) codes.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::PoolTimedOut) => true,
            StoreError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001" | "40P01"))
            }
            StoreError::Unavailable(_) => true,
            _ => false,
        }
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
