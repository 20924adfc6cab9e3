use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};

use tracing::info;

use crate::api::{APIResponse, BookList, ListParams, Message, QueryPairs, SavedBook, SearchParams, SearchResults, Status};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::model::{CreateBook, UpdateBook, parse_json_body};
use crate::{created_response, good_response, parse_id};

const BOOK_NOT_FOUND: &str = "Book not found";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub default_per_page: u32,
    pub max_per_page: Option<u32>,
}

impl AppState {
    pub fn new(db: Arc<Database>, cfg: &Config) -> Self {
        AppState {
            db,
            default_per_page: cfg.app.default_per_page,
            max_per_page: cfg.app.max_per_page,
        }
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(APIResponse::success(Status {
        status: "ok".to_owned(),
    }))
}

pub async fn get_books(State(state): State<AppState>, Query(pairs): Query<QueryPairs>) -> ApiResult<Response> {
    let req = ListParams::from(pairs).into_page_request(state.default_per_page, state.max_per_page);
    let page = Catalog::new(&state.db).find_all(&req).await?;

    info!(page = req.page, per_page = req.per_page, total = page.total, "got books");
    Ok(good_response(BookList {
        page: req.page,
        per_page: req.per_page,
        total: page.total,
        books: page.books,
    }))
}

pub async fn create_book(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let new_book = parse_json_body::<CreateBook>(&body)?.validate()?;
    let book = Catalog::new(&state.db).insert(new_book).await?;

    info!(id = book.id, "created book");
    Ok(created_response(SavedBook {
        message: "Book created successfully".to_owned(),
        book,
    }))
}

pub async fn update_book(State(state): State<AppState>, Path(id): Path<String>, body: Bytes) -> ApiResult<Response> {
    let id = parse_id(&id, BOOK_NOT_FOUND)?;
    let catalog = Catalog::new(&state.db);

    // An unknown id is reported before the body is looked at.
    if catalog.find_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(BOOK_NOT_FOUND));
    }

    let patch = parse_json_body::<UpdateBook>(&body)?.validate()?;
    let book = catalog.update(id, patch).await?;

    info!(id = book.id, "updated book");
    Ok(good_response(SavedBook {
        message: "Book updated successfully".to_owned(),
        book,
    }))
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let id = parse_id(&id, BOOK_NOT_FOUND)?;
    Catalog::new(&state.db).delete(id).await?;

    info!(id, "deleted book");
    Ok(good_response(Message {
        message: "Book deleted successfully".to_owned(),
    }))
}

pub async fn search_books(State(state): State<AppState>, Query(pairs): Query<QueryPairs>) -> ApiResult<Response> {
    let filter = SearchParams::from(pairs).into_filter()?;
    let books = Catalog::new(&state.db).search(&filter).await?;

    info!(count = books.len(), "searched books");
    Ok(good_response(SearchResults {
        count: books.len(),
        books,
    }))
}
