//! School Module
//!
//! A small relational roster: teachers teach courses and students enrol in
//! exactly one course. Both links are foreign keys enforced by SQLite, and
//! emails are unique per table. Teachers only come from seeding; courses can
//! be added, and students have full create/update/delete.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .nest("/api/school", school::routes())
//!     .with_state(app_state);
//! ```

mod handler;
mod routes;
mod store;

pub use routes::routes;
pub use store::*;

/// Schema for `teachers`, `courses` and `students`.
pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[("school_001_schema.sql", include_str!("migrations/001_schema.sql"))]
}
