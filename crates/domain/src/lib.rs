//! Domain layer for the order transaction system.
//!
//! This crate provides:
//! - `OrderRequest` and its structural validation
//! - `OrderProcessor`, which places an order, its receipt and the matching
//!   stock adjustments in a single store transaction
//! - Stock and lock-ordering policies

pub mod error;
pub mod order;

pub use error::OrderError;
pub use order::{
    LockOrder, OrderProcessor, OrderRequest, PlacedOrder, ProcessorConfig, StockPolicy,
    UnknownPolicy, ValidationError,
};
