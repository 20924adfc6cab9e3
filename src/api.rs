use crate::model::{Book, PageRequest, SearchFilter, SortField, SortOrder};
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// Query string pairs in the order they were sent. Handlers extract this
/// instead of a typed struct so a repeated key never rejects the request.
pub type QueryPairs = Vec<(String, String)>;

/// First value sent for `key`; repeats are ignored.
pub(crate) fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Query string of `GET /api/books`. Everything is kept as raw text so that a
/// malformed value falls back to its default instead of rejecting the request.
#[derive(Debug, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
}

impl From<QueryPairs> for ListParams {
    fn from(pairs: QueryPairs) -> Self {
        ListParams {
            page: first_value(&pairs, "page"),
            per_page: first_value(&pairs, "per_page"),
            sort: first_value(&pairs, "sort"),
            order: first_value(&pairs, "order"),
        }
    }
}

impl From<QueryPairs> for SearchParams {
    fn from(pairs: QueryPairs) -> Self {
        SearchParams {
            q: first_value(&pairs, "q"),
            author: first_value(&pairs, "author"),
            year: first_value(&pairs, "year"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct APIResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> APIResponse<T> {
    pub fn success(payload: T) -> Self {
        APIResponse {
            success: true,
            payload,
        }
    }

    pub fn failure(payload: T) -> Self {
        APIResponse {
            success: false,
            payload,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookList {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedBook {
    pub message: String,
    pub book: Book,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub count: usize,
    pub books: Vec<Book>,
}

fn int_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(default)
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|v| !v.is_empty())
}

impl ListParams {
    /// `max_per_page` only applies when one is configured; otherwise the
    /// requested page size is honoured as is.
    pub fn into_page_request(self, default_per_page: u32, max_per_page: Option<u32>) -> PageRequest {
        let page = int_or(self.page.as_deref(), 1).max(1);
        let per_page = match int_or(self.per_page.as_deref(), default_per_page as i64) {
            n if n < 1 => default_per_page as i64,
            n => n.min(max_per_page.map_or(u32::MAX as i64, i64::from)),
        };

        PageRequest {
            page: page.min(u32::MAX as i64) as u32,
            per_page: per_page.min(u32::MAX as i64) as u32,
            sort: SortField::from_str(self.sort.as_deref().unwrap_or("id")),
            order: SortOrder::from_str(self.order.as_deref().unwrap_or("asc")),
        }
    }
}

impl SearchParams {
    pub fn into_filter(self) -> ApiResult<SearchFilter> {
        let year = match non_empty(self.year) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::validation(format!("Invalid year: {raw}")))?,
            ),
            None => None,
        };

        Ok(SearchFilter {
            title: non_empty(self.q),
            author: non_empty(self.author),
            year,
        })
    }
}
