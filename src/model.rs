use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: Option<i64>,
    pub isbn: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A validated book ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: Option<i64>,
    pub isbn: Option<String>,
}

/// Only the fields that were present in the request body. `Some(None)` on an
/// optional column clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<Option<i64>>,
    pub isbn: Option<Option<String>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.year.is_none() && self.isbn.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub isbn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub year: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub isbn: Option<Option<String>>,
}

// Distinguishes `"key": null` from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// An empty ISBN is stored as NULL so it never trips the unique index.
fn blank_to_none(isbn: Option<String>) -> Option<String> {
    isbn.filter(|s| !s.is_empty())
}

impl CreateBook {
    pub fn validate(self) -> ApiResult<NewBook> {
        match (self.title, self.author) {
            (Some(title), Some(author)) if !title.is_empty() && !author.is_empty() => Ok(NewBook {
                title,
                author,
                year: self.year,
                isbn: blank_to_none(self.isbn),
            }),
            _ => Err(ApiError::validation("Title and author are required")),
        }
    }
}

impl UpdateBook {
    pub fn validate(self) -> ApiResult<BookPatch> {
        let title = required_if_present(self.title, "Title cannot be empty")?;
        let author = required_if_present(self.author, "Author cannot be empty")?;

        Ok(BookPatch {
            title,
            author,
            year: self.year,
            isbn: self.isbn.map(blank_to_none),
        })
    }
}

fn required_if_present(field: Option<Option<String>>, msg: &str) -> ApiResult<Option<String>> {
    match field {
        None => Ok(None),
        Some(Some(value)) if !value.is_empty() => Ok(Some(value)),
        Some(_) => Err(ApiError::validation(msg)),
    }
}

/// Parses a JSON object body. An absent body, `null` and `{}` are all
/// reported as "No data provided".
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::validation("No data provided"));
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("Invalid JSON body: {e}")))?;

    match value {
        Value::Object(ref map) if map.is_empty() => Err(ApiError::validation("No data provided")),
        Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| ApiError::validation(format!("Invalid field: {e}")))
        }
        Value::Null => Err(ApiError::validation("No data provided")),
        _ => Err(ApiError::validation("Request body must be a JSON object")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Author,
    Year,
    Isbn,
    CreatedAt,
}

impl SortField {
    pub fn as_column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Year => "year",
            SortField::Isbn => "isbn",
            SortField::CreatedAt => "created_at",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "author" => Some(SortField::Author),
            "year" => Some(SortField::Year),
            "isbn" => Some(SortField::Isbn),
            "created_at" => Some(SortField::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn from_str(s: &str) -> Self {
        if s == "desc" { SortOrder::Desc } else { SortOrder::Asc }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    /// `None` when the requested field is not a book attribute; rows then come
    /// back in storage order.
    pub sort: Option<SortField>,
    pub order: SortOrder,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1).saturating_mul(self.per_page as i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
}
