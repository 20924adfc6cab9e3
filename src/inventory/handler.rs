//! HTTP Handlers for the Inventory API

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::Response,
};
use serde::{Deserialize, Serialize};

use super::store::PRODUCT_NOT_FOUND;
use super::{Inventory, Product, ProductInput, Totals};
use crate::api::{Message, QueryPairs, first_value};
use crate::error::{ApiError, ApiResult};
use crate::handler::AppState;
use crate::model::parse_json_body;
use crate::{created_response, good_response, parse_id};

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedProduct {
    pub message: String,
    pub product: Product,
}

pub async fn list_products(State(state): State<AppState>, Query(pairs): Query<QueryPairs>) -> ApiResult<Response> {
    let lib = Inventory::new(&state.db);
    let search = first_value(&pairs, "search").filter(|s| !s.is_empty());

    let products = lib.find_all(search.as_deref()).await?;
    let totals = lib.totals().await?;

    tracing::info!(count = products.len(), total_products = totals.total_products, "got products");
    Ok(good_response(ProductList { products, totals }))
}

pub async fn create_product(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let input = parse_json_body::<ProductInput>(&body)?.validate()?;
    let product = Inventory::new(&state.db).insert(input).await?;

    tracing::info!(id = product.id, "created product");
    Ok(created_response(SavedProduct {
        message: "Product created successfully".to_owned(),
        product,
    }))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    let id = parse_id(&id, PRODUCT_NOT_FOUND)?;
    let lib = Inventory::new(&state.db);

    if lib.find_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(PRODUCT_NOT_FOUND));
    }

    let input = parse_json_body::<ProductInput>(&body)?.validate()?;
    let product = lib.update(id, input).await?;

    tracing::info!(id = product.id, "updated product");
    Ok(good_response(SavedProduct {
        message: "Product updated successfully".to_owned(),
        product,
    }))
}

pub async fn delete_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let id = parse_id(&id, PRODUCT_NOT_FOUND)?;
    Inventory::new(&state.db).delete(id).await?;

    tracing::info!(id, "deleted product");
    Ok(good_response(Message {
        message: "Product deleted successfully".to_owned(),
    }))
}
