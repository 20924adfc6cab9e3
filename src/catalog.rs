use anyhow::anyhow;
use chrono::Utc;
use libsql::Value;

use crate::db::{Database, format_timestamp, parse_timestamp};
use crate::error::{ApiError, ApiResult};
use crate::model::{Book, BookPatch, NewBook, PageRequest, SearchFilter};

const BOOK_COLUMNS: &str = "id, title, author, year, isbn, created_at";
const BOOK_NOT_FOUND: &str = "Book not found";
const DUPLICATE_ISBN: &str = "ISBN already exists";

#[derive(Debug)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
}

/// Storage access for book records.
pub struct Catalog<'a> {
    db: &'a Database,
}

impl<'a> Catalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> ApiResult<Option<Book>> {
        let _guard = self.db.lock().await;
        self.select_by_id(id).await
    }

    pub async fn count(&self) -> ApiResult<i64> {
        let _guard = self.db.lock().await;
        self.count_all().await
    }

    pub async fn exists_by_isbn(&self, isbn: &str) -> ApiResult<bool> {
        let _guard = self.db.lock().await;
        self.isbn_taken(isbn, None).await
    }

    /// One page of books plus the size of the whole collection. An unknown
    /// sort field leaves the rows in storage order.
    pub async fn find_all(&self, req: &PageRequest) -> ApiResult<BookPage> {
        let _guard = self.db.lock().await;

        let order_by = match req.sort {
            Some(field) => format!(" ORDER BY {} {}, id ASC", field.as_column(), req.order.as_sql()),
            None => String::new(),
        };
        let query = format!("SELECT {BOOK_COLUMNS} FROM books{order_by} LIMIT ? OFFSET ?");

        let total = self.count_all().await?;
        let mut rows = self
            .db
            .connection()
            .query(&query, libsql::params![req.per_page as i64, req.offset()])
            .await?;

        let mut books = Vec::new();
        while let Some(row) = rows.next().await? {
            books.push(row_to_book(&row)?);
        }

        Ok(BookPage { books, total })
    }

    pub async fn search(&self, filter: &SearchFilter) -> ApiResult<Vec<Book>> {
        let _guard = self.db.lock().await;

        let mut conditions = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        // instr() keeps the match literal, so '%' and '_' in the input are not wildcards.
        if let Some(title) = &filter.title {
            conditions.push("instr(lower(title), lower(?)) > 0");
            params.push(title.clone().into());
        }
        if let Some(author) = &filter.author {
            conditions.push("instr(lower(author), lower(?)) > 0");
            params.push(author.clone().into());
        }
        if let Some(year) = filter.year {
            conditions.push("year = ?");
            params.push(year.into());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query = format!("SELECT {BOOK_COLUMNS} FROM books{where_clause} ORDER BY id");

        let mut rows = self.db.connection().query(&query, params).await?;
        let mut books = Vec::new();
        while let Some(row) = rows.next().await? {
            books.push(row_to_book(&row)?);
        }

        Ok(books)
    }

    pub async fn insert(&self, book: NewBook) -> ApiResult<Book> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.insert_internal(book).await;
        self.db.finish(result).await
    }

    async fn insert_internal(&self, book: NewBook) -> ApiResult<Book> {
        if let Some(isbn) = &book.isbn {
            if self.isbn_taken(isbn, None).await? {
                return Err(ApiError::conflict(DUPLICATE_ISBN));
            }
        }

        let query = format!(
            "INSERT INTO books (title, author, year, isbn, created_at) VALUES (?, ?, ?, ?, ?) RETURNING {BOOK_COLUMNS}"
        );
        let created_at = format_timestamp(&Utc::now());

        let mut rows = self
            .db
            .connection()
            .query(
                &query,
                libsql::params![book.title, book.author, book.year, book.isbn, created_at],
            )
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE_ISBN))?;

        match rows.next().await.map_err(|e| ApiError::from_write(e, DUPLICATE_ISBN))? {
            Some(row) => row_to_book(&row),
            None => Err(anyhow!("insert returned no row").into()),
        }
    }

    /// Applies only the fields present in `patch`. A non-null ISBN held by a
    /// different book is rejected.
    pub async fn update(&self, id: i64, patch: BookPatch) -> ApiResult<Book> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.update_internal(id, patch).await;
        self.db.finish(result).await
    }

    async fn update_internal(&self, id: i64, patch: BookPatch) -> ApiResult<Book> {
        let existing = self
            .select_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(BOOK_NOT_FOUND))?;

        if let Some(Some(isbn)) = &patch.isbn {
            if self.isbn_taken(isbn, Some(id)).await? {
                return Err(ApiError::conflict(DUPLICATE_ISBN));
            }
        }

        let mut updates = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(title) = patch.title {
            updates.push("title = ?");
            params.push(title.into());
        }
        if let Some(author) = patch.author {
            updates.push("author = ?");
            params.push(author.into());
        }
        if let Some(year) = patch.year {
            updates.push("year = ?");
            params.push(year.map_or(Value::Null, Value::Integer));
        }
        if let Some(isbn) = patch.isbn {
            updates.push("isbn = ?");
            params.push(isbn.map_or(Value::Null, Value::Text));
        }

        if updates.is_empty() {
            return Ok(existing);
        }

        params.push(id.into());
        let query = format!("UPDATE books SET {} WHERE id = ?", updates.join(", "));
        self.db
            .connection()
            .execute(&query, params)
            .await
            .map_err(|e| ApiError::from_write(e, DUPLICATE_ISBN))?;

        self.select_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(BOOK_NOT_FOUND))
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = async {
            let affected = self
                .db
                .connection()
                .execute("DELETE FROM books WHERE id = ?", libsql::params![id])
                .await?;
            if affected == 0 {
                return Err(ApiError::not_found(BOOK_NOT_FOUND));
            }
            Ok::<(), ApiError>(())
        }
        .await;
        self.db.finish(result).await
    }

    async fn select_by_id(&self, id: i64) -> ApiResult<Option<Book>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?");
        let mut rows = self.db.connection().query(&query, libsql::params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_book(&row)?)),
            None => Ok(None),
        }
    }

    async fn count_all(&self) -> ApiResult<i64> {
        let mut rows = self.db.connection().query("SELECT COUNT(*) FROM books", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn isbn_taken(&self, isbn: &str, exclude_id: Option<i64>) -> ApiResult<bool> {
        let query = "SELECT 1 FROM books WHERE isbn = ? AND (? IS NULL OR id != ?) LIMIT 1";
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![isbn, exclude_id, exclude_id])
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

fn row_to_book(row: &libsql::Row) -> ApiResult<Book> {
    let created_at = row
        .get::<Option<String>>(5)?
        .map(|raw| parse_timestamp(&raw))
        .transpose()?;

    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        year: row.get(3)?,
        isbn: row.get(4)?,
        created_at,
    })
}
