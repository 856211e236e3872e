//! The order placement request.

use std::collections::HashSet;

use common::{
    CashierId, CustomerId, LineItems, Money, OrderId, OrderType, PaymentMethod,
};
use order_store::{NewOrder, NewReceipt};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Everything needed to place an order: line items, pricing, channel,
/// actors and payment.
///
/// `price`, `discount` and `total_price` are taken as computed by the
/// caller. They are stored as supplied and never recomputed from catalog
/// prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub products: LineItems,
    pub price: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub is_shipping: bool,
    #[serde(default)]
    pub shipping_location: Option<String>,
    pub total_price: Money,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub cashier_id: Option<CashierId>,
    pub payment_method: PaymentMethod,
    pub price_paid: Money,
}

impl OrderRequest {
    /// Creates an undiscounted in-store request where the list price equals
    /// the total and the customer pays it in full.
    pub fn new(products: LineItems, total_price: Money, payment_method: PaymentMethod) -> Self {
        Self {
            products,
            price: total_price,
            discount: Money::zero(),
            discount_code: None,
            is_shipping: false,
            shipping_location: None,
            total_price,
            order_type: OrderType::InStore,
            customer_id: None,
            cashier_id: None,
            payment_method,
            price_paid: total_price,
        }
    }

    /// Applies a discount. The caller remains responsible for `total_price`.
    pub fn with_discount(mut self, discount: Money, code: Option<String>) -> Self {
        self.discount = discount;
        self.discount_code = code;
        self
    }

    /// Marks the order for shipping to the given location.
    pub fn with_shipping(mut self, location: impl Into<String>) -> Self {
        self.is_shipping = true;
        self.shipping_location = Some(location.into());
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_cashier(mut self, cashier_id: CashierId) -> Self {
        self.cashier_id = Some(cashier_id);
        self
    }

    pub fn with_price_paid(mut self, price_paid: Money) -> Self {
        self.price_paid = price_paid;
        self
    }

    /// Checks the structural preconditions that need no storage access.
    ///
    /// Stock levels are deliberately not consulted here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.products.is_empty() {
            return Err(ValidationError::NoLineItems);
        }

        let mut seen = HashSet::with_capacity(self.products.len());
        for item in &self.products {
            if item.quantity <= 0 {
                return Err(ValidationError::NonPositiveQuantity {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                });
            }
            if !seen.insert(&item.product_id) {
                return Err(ValidationError::DuplicateProduct(item.product_id.clone()));
            }
        }

        if self.is_shipping
            && self
                .shipping_location
                .as_deref()
                .is_none_or(|location| location.trim().is_empty())
        {
            return Err(ValidationError::MissingShippingLocation);
        }

        Ok(())
    }

    /// The order row payload: every field except the payment data.
    pub fn to_new_order(&self) -> NewOrder {
        NewOrder {
            products: self.products.clone(),
            price: self.price,
            discount: self.discount,
            discount_code: self.discount_code.clone(),
            is_shipping: self.is_shipping,
            shipping_location: self.shipping_location.clone(),
            total_price: self.total_price,
            order_type: self.order_type,
            customer_id: self.customer_id,
            cashier_id: self.cashier_id,
        }
    }

    /// The receipt row payload for the order once it has an identifier.
    pub fn to_new_receipt(&self, order_id: OrderId) -> NewReceipt {
        NewReceipt {
            order_id,
            payment_method: self.payment_method,
            price_paid: self.price_paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;

    use super::*;

    fn request(products: LineItems) -> OrderRequest {
        OrderRequest::new(products, Money::from_dollars(50), PaymentMethod::Cash)
    }

    #[test]
    fn valid_request_passes() {
        let req = request(LineItems::new().with("P1", 2).with("P2", 1));
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn empty_products_rejected() {
        let req = request(LineItems::new());
        assert_eq!(req.validate(), Err(ValidationError::NoLineItems));
    }

    #[test]
    fn zero_quantity_rejected() {
        let req = request(LineItems::new().with("P1", 2).with("P2", 0));
        assert_eq!(
            req.validate(),
            Err(ValidationError::NonPositiveQuantity {
                product_id: ProductId::new("P2"),
                quantity: 0,
            })
        );
    }

    #[test]
    fn negative_quantity_rejected() {
        let req = request(LineItems::new().with("P1", -3));
        assert!(matches!(
            req.validate(),
            Err(ValidationError::NonPositiveQuantity { quantity: -3, .. })
        ));
    }

    #[test]
    fn duplicate_product_rejected() {
        let req = request(LineItems::new().with("P1", 1).with("P1", 2));
        assert_eq!(
            req.validate(),
            Err(ValidationError::DuplicateProduct(ProductId::new("P1")))
        );
    }

    #[test]
    fn shipping_requires_location() {
        let mut req = request(LineItems::new().with("P1", 1));
        req.is_shipping = true;
        assert_eq!(req.validate(), Err(ValidationError::MissingShippingLocation));

        req.shipping_location = Some("   ".to_string());
        assert_eq!(req.validate(), Err(ValidationError::MissingShippingLocation));

        let req = request(LineItems::new().with("P1", 1)).with_shipping("12 Market St");
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn location_without_shipping_is_allowed() {
        let mut req = request(LineItems::new().with("P1", 1));
        req.shipping_location = Some("12 Market St".to_string());
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn new_order_drops_payment_data() {
        let customer = CustomerId::new();
        let req = request(LineItems::new().with("P1", 1))
            .with_discount(Money::from_cents(500), Some("SAVE5".to_string()))
            .with_order_type(OrderType::Online)
            .with_customer(customer);

        let order = req.to_new_order();
        assert_eq!(order.discount, Money::from_cents(500));
        assert_eq!(order.discount_code.as_deref(), Some("SAVE5"));
        assert_eq!(order.order_type, OrderType::Online);
        assert_eq!(order.customer_id, Some(customer));

        let order_id = OrderId::new();
        let receipt = req.to_new_receipt(order_id);
        assert_eq!(receipt.order_id, order_id);
        assert_eq!(receipt.payment_method, PaymentMethod::Cash);
        assert_eq!(receipt.price_paid, Money::from_dollars(50));
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "products": {"P1": 2, "P2": 1},
            "price": 5000,
            "total_price": 5000,
            "payment_method": "cash",
            "price_paid": 5000
        }"#;
        let req: OrderRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.products.len(), 2);
        assert_eq!(req.discount, Money::zero());
        assert!(!req.is_shipping);
        assert_eq!(req.order_type, OrderType::InStore);
        assert_eq!(req.customer_id, None);
    }
}
