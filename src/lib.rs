use crate::api::APIResponse;
use crate::error::{ApiError, ApiResult};
use crate::handler::{AppState, create_book, delete_book, get_books, healthcheck, search_books, update_book};
use axum::{
    Json, Router,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod inventory;
pub mod model;
pub mod school;
pub mod seed;

pub fn good_response<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(APIResponse::success(payload))).into_response()
}

pub fn created_response<T: Serialize>(payload: T) -> Response {
    (StatusCode::CREATED, Json(APIResponse::success(payload))).into_response()
}

/// Path ids only match unsigned decimal integers; anything else resolves to
/// no record at all.
pub fn parse_id(raw: &str, not_found: &str) -> ApiResult<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::not_found(not_found));
    }
    raw.parse::<i64>().map_err(|_| ApiError::not_found(not_found))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .route("/api/books", get(get_books))
        .route("/api/books", post(create_book))
        .route("/api/books/search", get(search_books))
        .route("/api/books/:id", put(update_book))
        .route("/api/books/:id", delete(delete_book))
        .nest("/api/products", inventory::routes())
        .nest("/api/school", school::routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
