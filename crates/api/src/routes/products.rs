//! Product availability endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::CheckoutError;
use domain::{Money, ProductRecord};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: u32,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: u32,
}

impl From<ProductRecord> for ProductResponse {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            unit_price_cents: record.unit_price.cents(),
            stock: record.stock,
        }
    }
}

/// GET /products: the availability index, sorted by product id.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Caller(_): Caller,
) -> Json<Vec<ProductResponse>> {
    Json(
        state
            .index
            .snapshot()
            .into_iter()
            .map(ProductResponse::from)
            .collect(),
    )
}

/// PUT /products/{id}: replaces the indexed price and stock of a product
/// after an administrative edit in the store of record.
#[tracing::instrument(skip(state, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    if !identity.is_admin() {
        return Err(CheckoutError::Permission("only admins may edit products".to_string()).into());
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("product name must not be empty".to_string()));
    }
    if req.unit_price_cents <= 0 {
        return Err(ApiError::BadRequest(
            "unit_price_cents must be greater than 0".to_string(),
        ));
    }

    let record = ProductRecord::new(
        id,
        req.name.trim(),
        Money::from_cents(req.unit_price_cents),
        req.stock,
    );
    state.index.apply_external_update(record.clone());
    tracing::info!(product_id = %record.id, stock = record.stock, "product availability updated");

    Ok(Json(record.into()))
}
