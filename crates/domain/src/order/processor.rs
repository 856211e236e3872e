//! The order transaction processor.

use std::time::Instant;

use common::{LineItem, OrderId};
use order_store::{Order, OrderStore, Receipt, StoreTransaction};
use serde::{Deserialize, Serialize};

use super::{OrderRequest, ProcessorConfig, StockPolicy};
use crate::error::OrderError;

/// A committed order together with its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub receipt: Receipt,
}

/// Places orders: writes the order and its receipt and adjusts product
/// stock, all inside one store transaction.
///
/// Either every write of an order becomes visible or none does. The
/// processor never retries; retry policy belongs to the caller.
pub struct OrderProcessor<S: OrderStore> {
    store: S,
    config: ProcessorConfig,
}

impl<S: OrderStore> OrderProcessor<S> {
    /// Creates a processor with the default (lenient, sorted) configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ProcessorConfig::default())
    }

    pub fn with_config(store: S, config: ProcessorConfig) -> Self {
        Self { store, config }
    }

    /// Places an order.
    ///
    /// 1. Validates the request; invalid requests never reach the store.
    /// 2. Inserts the order, then its receipt, then links the order to the
    ///    receipt.
    /// 3. Decrements stock for every line item, marking products whose stock
    ///    reaches zero or below as out of stock.
    /// 4. Commits.
    ///
    /// Any failure after validation rolls the whole transaction back.
    #[tracing::instrument(
        skip(self, request),
        fields(
            line_items = request.products.len(),
            order_type = %request.order_type,
            total_price = %request.total_price,
        )
    )]
    pub async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, OrderError> {
        let started = Instant::now();
        let result = self.execute(&request).await;

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                metrics::histogram!("order_transaction_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %placed.order.order_id,
                    receipt_id = %placed.receipt.receipt_id,
                    "order placed"
                );
            }
            Err(err) => {
                metrics::counter!("orders_failed_total", "reason" => err.reason()).increment(1);
                tracing::warn!(error = %err, reason = err.reason(), "order not placed");
            }
        }

        result
    }

    /// Loads a committed order and its receipt.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<PlacedOrder>, OrderError> {
        let Some(order) = self
            .store
            .get_order(order_id)
            .await
            .map_err(OrderError::Transaction)?
        else {
            return Ok(None);
        };

        let receipt_id = order
            .receipt_id
            .ok_or(OrderError::MissingReceipt(order_id))?;
        let receipt = self
            .store
            .get_receipt(receipt_id)
            .await
            .map_err(OrderError::Transaction)?
            .ok_or(OrderError::MissingReceipt(order_id))?;

        Ok(Some(PlacedOrder { order, receipt }))
    }

    async fn execute(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError> {
        request.validate()?;

        let mut tx = self.store.begin().await.map_err(OrderError::Resource)?;

        match self.write(&mut tx, request).await {
            Ok(placed) => {
                tx.commit().await.map_err(OrderError::Transaction)?;
                Ok(placed)
            }
            Err(err) => {
                // Dropping `tx` still releases the connection if this fails.
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn write(
        &self,
        tx: &mut S::Transaction,
        request: &OrderRequest,
    ) -> Result<PlacedOrder, OrderError> {
        let mut order = tx
            .insert_order(&request.to_new_order())
            .await
            .map_err(OrderError::Transaction)?;

        let receipt = tx
            .insert_receipt(&request.to_new_receipt(order.order_id))
            .await
            .map_err(OrderError::Transaction)?;

        order.updated_at = tx
            .attach_receipt(order.order_id, receipt.receipt_id)
            .await
            .map_err(OrderError::Transaction)?;
        order.receipt_id = Some(receipt.receipt_id);

        for item in self.config.lock_order.sequence(&request.products) {
            self.adjust_stock(tx, item).await?;
        }

        Ok(PlacedOrder { order, receipt })
    }

    async fn adjust_stock(
        &self,
        tx: &mut S::Transaction,
        item: &LineItem,
    ) -> Result<(), OrderError> {
        let remaining = tx
            .decrement_stock(&item.product_id, item.quantity)
            .await
            .map_err(OrderError::Transaction)?;

        tracing::debug!(
            product_id = %item.product_id,
            quantity = item.quantity,
            remaining,
            "stock decremented"
        );

        if remaining < 0 && self.config.stock_policy == StockPolicy::Strict {
            return Err(OrderError::InsufficientStock {
                product_id: item.product_id.clone(),
                requested: item.quantity,
                available: remaining + item.quantity,
            });
        }

        if remaining <= 0
            && tx
                .mark_out_of_stock(&item.product_id)
                .await
                .map_err(OrderError::Transaction)?
        {
            metrics::counter!("products_out_of_stock_total").increment(1);
            tracing::info!(product_id = %item.product_id, remaining, "product out of stock");
        }

        Ok(())
    }
}
