//! Order read and status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{CustomerId, Order, OrderItem, OrderStatus, StatusChange};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub discount_total_cents: i64,
    pub shipping_cost_cents: i64,
    pub total_cents: i64,
    pub shipping_mode: String,
    pub shipping_address: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct StatusChangeResponse {
    pub status: OrderStatus,
    pub at: String,
    pub actor: Option<String>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            status: order.status(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            subtotal_cents: order.subtotal().cents(),
            discount_total_cents: order.discount_total().cents(),
            shipping_cost_cents: order.shipping_cost().cents(),
            total_cents: order.total().cents(),
            shipping_mode: order.shipping_mode().to_string(),
            shipping_address: order.shipping_address().to_string(),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
        }
    }
}

impl From<&StatusChange> for StatusChangeResponse {
    fn from(change: &StatusChange) -> Self {
        Self {
            status: change.status,
            at: change.at.to_rfc3339(),
            actor: change.actor.map(|id| id.to_string()),
        }
    }
}

// -- Handlers --

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orders.get_order(&identity, order_id).await?;
    Ok(Json(OrderResponse::from(order.as_ref())))
}

/// GET /orders/{id}/history: status changes, oldest first.
#[tracing::instrument(skip(state))]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusChangeResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let history = state.orders.get_status_history(&identity, order_id).await?;
    Ok(Json(history.iter().map(StatusChangeResponse::from).collect()))
}

/// POST /orders/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let to: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))?;

    let order = state.orders.update_status(&identity, order_id, to).await?;
    Ok(Json(OrderResponse::from(order.as_ref())))
}

/// GET /customers/{id}/orders: newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_customer(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let customer_id = CustomerId::parse(&id)
        .map_err(|e| ApiError::BadRequest(format!("invalid customer id: {e}")))?;
    let orders = state
        .orders
        .list_orders_for_customer(&identity, customer_id)
        .await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))
}
