use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/teachers", get(handler::list_teachers))
        .route("/courses", get(handler::list_courses))
        .route("/courses", post(handler::create_course))
        .route("/students", get(handler::list_students))
        .route("/students", post(handler::create_student))
        .route("/students/:id", put(handler::update_student))
        .route("/students/:id", delete(handler::delete_student))
        .route("/queries-demo", get(handler::student_name_queries))
}
