//! Rows the order store reads and writes.

use chrono::{DateTime, Utc};
use common::{
    CashierId, CustomerId, LineItems, Money, OrderId, OrderType, PaymentMethod, ProductId,
    ProductStatus, ReceiptId,
};
use serde::{Deserialize, Serialize};

/// Commercial facts of an order, as handed to the store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub products: LineItems,
    pub price: Money,
    pub discount: Money,
    pub discount_code: Option<String>,
    pub is_shipping: bool,
    pub shipping_location: Option<String>,
    pub total_price: Money,
    pub order_type: OrderType,
    pub customer_id: Option<CustomerId>,
    pub cashier_id: Option<CashierId>,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub products: LineItems,
    pub price: Money,
    pub discount: Money,
    pub discount_code: Option<String>,
    pub is_shipping: bool,
    pub shipping_location: Option<String>,
    pub total_price: Money,
    pub order_type: OrderType,
    pub customer_id: Option<CustomerId>,
    pub cashier_id: Option<CashierId>,
    /// Set once, in the same transaction that created the order.
    pub receipt_id: Option<ReceiptId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materializes a freshly inserted order from its insert payload.
    pub fn from_new(
        order_id: OrderId,
        new: &NewOrder,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            products: new.products.clone(),
            price: new.price,
            discount: new.discount,
            discount_code: new.discount_code.clone(),
            is_shipping: new.is_shipping,
            shipping_location: new.shipping_location.clone(),
            total_price: new.total_price,
            order_type: new.order_type,
            customer_id: new.customer_id,
            cashier_id: new.cashier_id,
            receipt_id: None,
            created_at,
            updated_at,
        }
    }
}

/// Payment data for a receipt, as handed to the store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceipt {
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    pub price_paid: Money,
}

/// A persisted payment receipt. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: ReceiptId,
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    pub price_paid: Money,
    pub created_at: DateTime<Utc>,
}

/// The slice of a catalog product this system reads and mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    /// May go negative: orders are accepted regardless of stock on hand.
    pub stock_quantity: i32,
    pub status: ProductStatus,
}

impl Product {
    /// Creates an in-stock product.
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, stock: i32) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            stock_quantity: stock,
            status: if stock > 0 {
                ProductStatus::InStock
            } else {
                ProductStatus::OutOfStock
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_new_starts_without_receipt() {
        let new = NewOrder {
            products: LineItems::new().with("P1", 1),
            price: Money::from_cents(500),
            discount: Money::zero(),
            discount_code: None,
            is_shipping: false,
            shipping_location: None,
            total_price: Money::from_cents(500),
            order_type: OrderType::Online,
            customer_id: Some(CustomerId::new()),
            cashier_id: None,
        };
        let now = Utc::now();
        let order = Order::from_new(OrderId::new(), &new, now, now);

        assert_eq!(order.receipt_id, None);
        assert_eq!(order.products, new.products);
        assert_eq!(order.customer_id, new.customer_id);
    }

    #[test]
    fn new_product_status_follows_stock() {
        assert_eq!(Product::new("P1", "Widget", 3).status, ProductStatus::InStock);
        assert_eq!(
            Product::new("P2", "Gadget", 0).status,
            ProductStatus::OutOfStock
        );
    }
}
