//! Order placement and lookup endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{OrderProcessor, OrderRequest, PlacedOrder};
use order_store::OrderStore;
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub processor: Arc<OrderProcessor<S>>,
    pub order_timeout: Duration,
}

impl<S: OrderStore> AppState<S> {
    pub fn new(processor: OrderProcessor<S>, order_timeout: Duration) -> Self {
        Self {
            processor: Arc::new(processor),
            order_timeout,
        }
    }
}

/// POST /orders: places an order with its receipt and stock adjustments.
///
/// The order runs in its own task, so a request that times out or whose
/// client disconnects never interrupts a transaction halfway; the
/// transaction still commits or rolls back on its own.
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let processor = state.processor.clone();
    let task = tokio::spawn(async move { processor.place_order(request).await });

    let placed = match tokio::time::timeout(state.order_timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => return Err(ApiError::Internal(join_err.to_string())),
        Err(_) => {
            tracing::warn!(timeout = ?state.order_timeout, "order timed out");
            return Err(ApiError::Timeout);
        }
    };

    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /orders/{id}: loads an order and its receipt.
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PlacedOrder>, ApiError> {
    let uuid =
        Uuid::parse_str(&id).map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    let order_id = OrderId::from_uuid(uuid);

    state
        .processor
        .get_order(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id} not found")))
}
