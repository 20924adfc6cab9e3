use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_products))
        .route("/", post(handler::create_product))
        .route("/:id", put(handler::update_product))
        .route("/:id", delete(handler::delete_product))
}
