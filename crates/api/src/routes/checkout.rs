//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::{CheckoutReceipt, CheckoutRequest};
use domain::{AppliedDiscount, CartLine, CustomerId};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::routes::orders::OrderResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutBody {
    /// Defaults to the caller.
    pub customer_id: Option<String>,
    pub lines: Vec<CartLineBody>,
    pub shipping_mode: String,
    pub shipping_address: String,
}

#[derive(Deserialize)]
pub struct CartLineBody {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct ReceiptResponse {
    pub order: OrderResponse,
    pub subtotal_cents: i64,
    pub discounts: Vec<AppliedDiscount>,
    pub discount_total_cents: i64,
    pub shipping_cost_cents: i64,
    pub total_cents: i64,
}

impl From<CheckoutReceipt> for ReceiptResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        Self {
            order: OrderResponse::from(receipt.order.as_ref()),
            subtotal_cents: receipt.subtotal.cents(),
            discounts: receipt.discounts,
            discount_total_cents: receipt.discount_total.cents(),
            shipping_cost_cents: receipt.shipping_cost.cents(),
            total_cents: receipt.total.cents(),
        }
    }
}

/// POST /checkout: turns a cart into a committed order.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<ReceiptResponse>), ApiError> {
    let customer_id = match body.customer_id.as_deref() {
        Some(id) => CustomerId::parse(id)
            .map_err(|e| ApiError::BadRequest(format!("invalid customer_id: {e}")))?,
        None => identity.id,
    };

    let request = CheckoutRequest {
        customer_id,
        lines: body
            .lines
            .into_iter()
            .map(|line| CartLine::new(line.product_id, line.quantity))
            .collect(),
        shipping_mode: body.shipping_mode,
        shipping_address: body.shipping_address,
    };

    let receipt = state.checkout.checkout(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}
