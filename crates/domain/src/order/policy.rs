//! Tunable behaviour of the order processor.

use std::fmt;
use std::str::FromStr;

use common::{LineItem, LineItems};
use serde::{Deserialize, Serialize};

/// What to do when an order asks for more units than are in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Accept the order and let stock go negative.
    #[default]
    Lenient,
    /// Reject the order and roll it back if any product would go negative.
    Strict,
}

/// The sequence in which product rows are locked during stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockOrder {
    /// Sorted by product id, so concurrent orders over overlapping products
    /// always contend in the same sequence and cannot deadlock each other.
    #[default]
    Sorted,
    /// The order the line items were supplied in.
    Request,
}

impl LockOrder {
    /// Returns the line items in the order their rows should be locked.
    pub fn sequence<'a>(&self, items: &'a LineItems) -> Vec<&'a LineItem> {
        let mut sequence: Vec<&LineItem> = items.iter().collect();
        if *self == LockOrder::Sorted {
            sequence.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        }
        sequence
    }
}

/// Error returned when a policy name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy(pub String);

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown policy: '{}'", self.0)
    }
}

impl std::error::Error for UnknownPolicy {}

impl FromStr for StockPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(StockPolicy::Lenient),
            "strict" => Ok(StockPolicy::Strict),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

impl FromStr for LockOrder {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sorted" => Ok(LockOrder::Sorted),
            "request" => Ok(LockOrder::Request),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Configuration of an [`OrderProcessor`](super::OrderProcessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorConfig {
    pub stock_policy: StockPolicy,
    pub lock_order: LockOrder,
}

impl ProcessorConfig {
    pub fn strict() -> Self {
        Self {
            stock_policy: StockPolicy::Strict,
            ..Self::default()
        }
    }
}
