//! Inventory Module
//!
//! Product stock keeping with a running valuation: every product carries a
//! quantity and a unit price, and listings report the number of products and
//! the total stock value next to the (optionally filtered) rows.
//!
//! # Usage
//!
//! ```rust,ignore
//! use catalog::inventory;
//!
//! let app = Router::new()
//!     .nest("/api/products", inventory::routes())
//!     .with_state(app_state);
//!
//! let store = inventory::Inventory::new(&db);
//! let totals = store.totals().await?;
//! ```

mod handler;
mod routes;
mod store;

pub use routes::routes;
pub use store::*;

/// Schema for the `products` table, applied by [`crate::db::Database::open`].
pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[("inventory_001_schema.sql", include_str!("migrations/001_schema.sql"))]
}
