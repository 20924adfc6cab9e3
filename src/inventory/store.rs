use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{ApiError, ApiResult};

const PRODUCT_COLUMNS: &str = "id, name, quantity, price";
pub(crate) const PRODUCT_NOT_FOUND: &str = "Product not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Request body for both create and update; update replaces every field.
#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
}

impl ProductInput {
    pub fn validate(self) -> ApiResult<NewProduct> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::validation("Name is required"))?;

        let price = self.price.ok_or_else(|| ApiError::validation("Price is required"))?;
        if !price.is_finite() || price < 0.0 {
            return Err(ApiError::validation("Price must be a non-negative number"));
        }

        let quantity = self.quantity.unwrap_or(0);
        if quantity < 0 {
            return Err(ApiError::validation("Quantity must not be negative"));
        }

        Ok(NewProduct { name, quantity, price })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_products: i64,
    pub total_value: f64,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct Inventory<'a> {
    db: &'a Database,
}

impl<'a> Inventory<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i64) -> ApiResult<Option<Product>> {
        let _guard = self.db.lock().await;
        self.select_by_id(id).await
    }

    /// All products ordered by id, optionally narrowed to names containing
    /// `search` (case-insensitive).
    pub async fn find_all(&self, search: Option<&str>) -> ApiResult<Vec<Product>> {
        let _guard = self.db.lock().await;
        let conn = self.db.connection();

        let mut rows = match search {
            Some(term) => {
                let query = format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE instr(lower(name), lower(?)) > 0 ORDER BY id"
                );
                conn.query(&query, libsql::params![term]).await?
            }
            None => {
                let query = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
                conn.query(&query, ()).await?
            }
        };

        let mut products = Vec::new();
        while let Some(row) = rows.next().await? {
            products.push(row_to_product(&row)?);
        }
        Ok(products)
    }

    pub async fn totals(&self) -> ApiResult<Totals> {
        let _guard = self.db.lock().await;
        let query = "SELECT COUNT(*), CAST(COALESCE(SUM(quantity * price), 0) AS REAL) FROM products";
        let mut rows = self.db.connection().query(query, ()).await?;

        match rows.next().await? {
            Some(row) => Ok(Totals {
                total_products: row.get(0)?,
                total_value: round_cents(row.get(1)?),
            }),
            None => Err(anyhow!("totals query returned no row").into()),
        }
    }

    pub async fn insert(&self, product: NewProduct) -> ApiResult<Product> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.insert_internal(product).await;
        self.db.finish(result).await
    }

    async fn insert_internal(&self, product: NewProduct) -> ApiResult<Product> {
        let query =
            format!("INSERT INTO products (name, quantity, price) VALUES (?, ?, ?) RETURNING {PRODUCT_COLUMNS}");
        let mut rows = self
            .db
            .connection()
            .query(&query, libsql::params![product.name, product.quantity, product.price])
            .await?;

        match rows.next().await? {
            Some(row) => row_to_product(&row),
            None => Err(anyhow!("insert returned no row").into()),
        }
    }

    /// Replaces every column of an existing product.
    pub async fn update(&self, id: i64, product: NewProduct) -> ApiResult<Product> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = self.update_internal(id, product).await;
        self.db.finish(result).await
    }

    async fn update_internal(&self, id: i64, product: NewProduct) -> ApiResult<Product> {
        let affected = self
            .db
            .connection()
            .execute(
                "UPDATE products SET name = ?, quantity = ?, price = ? WHERE id = ?",
                libsql::params![product.name, product.quantity, product.price, id],
            )
            .await?;
        if affected == 0 {
            return Err(ApiError::not_found(PRODUCT_NOT_FOUND));
        }

        self.select_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(PRODUCT_NOT_FOUND))
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let _guard = self.db.lock().await;
        self.db.begin().await?;
        let result = async {
            let affected = self
                .db
                .connection()
                .execute("DELETE FROM products WHERE id = ?", libsql::params![id])
                .await?;
            if affected == 0 {
                return Err(ApiError::not_found(PRODUCT_NOT_FOUND));
            }
            Ok::<(), ApiError>(())
        }
        .await;
        self.db.finish(result).await
    }

    async fn select_by_id(&self, id: i64) -> ApiResult<Option<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let mut rows = self.db.connection().query(&query, libsql::params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_product(&row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_product(row: &libsql::Row) -> ApiResult<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        quantity: row.get(2)?,
        price: row.get(3)?,
    })
}
