use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use catalog::api::{APIResponse, BookList};
use catalog::catalog::Catalog;
use catalog::config::Config;
use catalog::db::{Database, IN_MEMORY};
use catalog::handler::AppState;
use catalog::model::NewBook;
use catalog::seed::{seed_sample_books, seed_school};

async fn create_test_router() -> Router {
    let db = Database::open(IN_MEMORY)
        .await
        .expect("Failed to open test database");
    catalog::router(AppState::new(Arc::new(db), &Config::default()))
}

async fn create_seeded_router() -> Router {
    let db = Database::open(IN_MEMORY)
        .await
        .expect("Failed to open test database");
    seed_sample_books(&db).await.expect("Failed to seed");
    catalog::router(AppState::new(Arc::new(db), &Config::default()))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn send_raw(router: &Router, method: &str, uri: &str, body: &'static str) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))?;
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn test_healthcheck() -> Result<()> {
    let router = create_test_router().await;
    let (status, body) = send(&router, "GET", "/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "status": "ok"}));
    Ok(())
}

#[tokio::test]
async fn test_create_then_search() -> Result<()> {
    let router = create_test_router().await;

    let (status, body) = send(&router, "POST", "/api/books", Some(json!({"title": "Dune", "author": "Herbert"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Book created successfully");
    assert_eq!(body["book"]["id"], 1);
    assert_eq!(body["book"]["year"], Value::Null);
    assert_eq!(body["book"]["isbn"], Value::Null);
    assert!(body["book"]["created_at"].is_string());

    let (status, body) = send(&router, "GET", "/api/books/search?q=dun", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["books"][0]["title"], "Dune");

    let (_, body) = send(&router, "GET", "/api/books", None).await?;
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_create_validation_errors() -> Result<()> {
    let router = create_test_router().await;

    let (status, body) = send(&router, "POST", "/api/books", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "No data provided"}));

    let (status, body) = send(&router, "POST", "/api/books", Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");

    let (status, body) = send(&router, "POST", "/api/books", Some(json!({"title": "Dune"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Title and author are required"}));

    let (status, body) = send_raw(&router, "POST", "/api/books", "{\"title\": ").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = send(&router, "GET", "/api/books", None).await?;
    assert_eq!(body["total"], 0);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_isbn() -> Result<()> {
    let router = create_test_router().await;
    let book = json!({"title": "Clean Code", "author": "Robert C. Martin", "isbn": "978-0132350884"});

    let (status, _) = send(&router, "POST", "/api/books", Some(book.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&router, "POST", "/api/books", Some(book)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "ISBN already exists"}));

    let (_, body) = send(&router, "GET", "/api/books", None).await?;
    assert_eq!(body["total"], 1);
    Ok(())
}

#[tokio::test]
async fn test_pagination_boundaries() -> Result<()> {
    let router = create_test_router().await;
    for i in 0..7 {
        let (status, _) = send(
            &router,
            "POST",
            "/api/books",
            Some(json!({"title": format!("Book {i}"), "author": "Author", "year": 2000 + i})),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&router, "GET", "/api/books?page=2&per_page=3", None).await?;
    assert_eq!(status, StatusCode::OK);
    let list: APIResponse<BookList> = serde_json::from_value(body)?;
    assert!(list.success);
    assert_eq!(list.payload.page, 2);
    assert_eq!(list.payload.per_page, 3);
    assert_eq!(list.payload.total, 7);
    let ids: Vec<i64> = list.payload.books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![4, 5, 6]);

    // last page holds total mod per_page
    let (_, body) = send(&router, "GET", "/api/books?page=3&per_page=3", None).await?;
    assert_eq!(body["books"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(&router, "GET", "/api/books?page=9&per_page=3", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"], json!([]));
    assert_eq!(body["total"], 7);

    // defaults
    let (_, body) = send(&router, "GET", "/api/books?page=abc", None).await?;
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 5);
    assert_eq!(body["books"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn test_sorting() -> Result<()> {
    let router = create_seeded_router().await;

    let (_, body) = send(&router, "GET", "/api/books?sort=year&order=desc", None).await?;
    let years: Vec<i64> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b["year"].as_i64())
        .collect();
    assert_eq!(years, vec![2019, 2018, 2008]);

    let (_, body) = send(&router, "GET", "/api/books?sort=title", None).await?;
    assert_eq!(body["books"][0]["title"], "Clean Code");

    let (status, body) = send(&router, "GET", "/api/books?sort=bogus&order=desc", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["books"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_partial_update() -> Result<()> {
    let router = create_seeded_router().await;

    let (status, body) = send(&router, "PUT", "/api/books/3", Some(json!({"year": 2009}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully");
    assert_eq!(body["book"]["year"], 2009);
    assert_eq!(body["book"]["title"], "Clean Code");
    assert_eq!(body["book"]["author"], "Robert C. Martin");
    assert_eq!(body["book"]["isbn"], "978-0132350884");

    let (status, body) = send(&router, "PUT", "/api/books/3", Some(json!({"isbn": "978-1593279288"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ISBN already exists");

    let (status, body) = send(&router, "PUT", "/api/books/3", Some(json!({"title": ""}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(&router, "PUT", "/api/books/3", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");
    Ok(())
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found_before_body_checks() -> Result<()> {
    let router = create_test_router().await;

    let (status, body) = send(&router, "PUT", "/api/books/99", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "Book not found"}));

    let (status, _) = send(&router, "PUT", "/api/books/abc", Some(json!({"year": 1}))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_delete_then_lookup() -> Result<()> {
    let router = create_seeded_router().await;

    let (status, body) = send(&router, "DELETE", "/api/books/2", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Book deleted successfully"}));

    let (_, body) = send(&router, "GET", "/api/books/search?q=flask", None).await?;
    assert_eq!(body["count"], 0);

    let (_, body) = send(&router, "GET", "/api/books?per_page=10", None).await?;
    assert_eq!(body["total"], 2);
    assert!(body["books"].as_array().unwrap().iter().all(|b| b["id"] != 2));

    let (status, _) = send(&router, "DELETE", "/api/books/2", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, "PUT", "/api/books/2", Some(json!({"year": 1}))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_search_filters() -> Result<()> {
    let router = create_seeded_router().await;

    let (_, body) = send(&router, "GET", "/api/books/search", None).await?;
    assert_eq!(body["count"], 3);

    let (_, body) = send(&router, "GET", "/api/books/search?author=GRINBERG", None).await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["books"][0]["title"], "Flask Web Development");

    let (_, body) = send(&router, "GET", "/api/books/search?q=c&year=2008", None).await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["books"][0]["title"], "Clean Code");

    let (_, body) = send(&router, "GET", "/api/books/search?q=python&author=martin", None).await?;
    assert_eq!(body["count"], 0);

    let (status, body) = send(&router, "GET", "/api/books/search?year=recent", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_inventory_crud_and_totals() -> Result<()> {
    let router = create_test_router().await;

    let (status, body) = send(&router, "POST", "/api/products", Some(json!({"name": "Pencil", "quantity": 2, "price": 1.5}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["name"], "Pencil");
    let pencil = body["product"]["id"].as_i64().unwrap();

    let (status, _) = send(&router, "POST", "/api/products", Some(json!({"name": "Notebook", "quantity": 3, "price": 2.25}))).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&router, "GET", "/api/products?search=note", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["total_products"], 2);
    assert_eq!(body["total_value"], 9.75);

    let (status, body) = send(&router, "POST", "/api/products", Some(json!({"name": "", "price": 1}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let uri = format!("/api/products/{pencil}");
    let (status, body) = send(&router, "PUT", &uri, Some(json!({"name": "Pencil", "quantity": 4, "price": 1.5}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["quantity"], 4);

    let (_, body) = send(&router, "GET", "/api/products", None).await?;
    assert_eq!(body["total_value"], 12.75);

    let (status, _) = send(&router, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&router, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
    Ok(())
}

#[tokio::test]
async fn test_large_page_returns_full_slice() -> Result<()> {
    let db = Database::open(IN_MEMORY).await?;
    let books = Catalog::new(&db);
    for i in 0..150 {
        books
            .insert(NewBook {
                title: format!("Book {i}"),
                author: "Author".to_owned(),
                year: None,
                isbn: None,
            })
            .await?;
    }
    let router = catalog::router(AppState::new(Arc::new(db), &Config::default()));

    let (status, body) = send(&router, "GET", "/api/books?per_page=150", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["per_page"], 150);
    assert_eq!(body["total"], 150);
    assert_eq!(body["books"].as_array().map(Vec::len), Some(150));

    let (_, body) = send(&router, "GET", "/api/books?page=2&per_page=120", None).await?;
    assert_eq!(body["books"].as_array().map(Vec::len), Some(30));
    Ok(())
}

#[tokio::test]
async fn test_repeated_query_keys_use_first_value() -> Result<()> {
    let router = create_seeded_router().await;

    let (status, body) = send(&router, "GET", "/api/books?page=1&page=2&per_page=2", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["page"], 1);
    assert_eq!(body["books"].as_array().map(Vec::len), Some(2));

    let (status, body) = send(&router, "GET", "/api/books/search?q=clean&q=flask", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["books"][0]["title"], "Clean Code");

    let (status, body) = send(&router, "GET", "/api/products?search=a&search=b", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn test_school_roster() -> Result<()> {
    let db = Database::open(IN_MEMORY).await?;
    seed_school(&db).await?;
    let router = catalog::router(AppState::new(Arc::new(db), &Config::default()));

    let (status, body) = send(&router, "GET", "/api/school/teachers", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teachers"].as_array().map(Vec::len), Some(2));

    let (status, body) = send(&router, "GET", "/api/school/courses", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["courses"][1]["name"], "Web Development");
    assert_eq!(body["courses"][1]["teacher_name"], "Ms. Patil");

    let (status, body) = send(
        &router,
        "POST",
        "/api/school/students",
        Some(json!({"name": "Asha", "email": "asha@school.com", "course_id": 1})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["student"]["course_name"], "Python Basics");
    let asha = body["student"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &router,
        "POST",
        "/api/school/students",
        Some(json!({"name": "Asha Two", "email": "asha@school.com", "course_id": 2})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Email already exists"}));

    let (status, body) = send(
        &router,
        "POST",
        "/api/school/students",
        Some(json!({"name": "Ravi", "email": "ravi@school.com", "course_id": 99})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Course does not exist");

    let (status, body) = send(
        &router,
        "POST",
        "/api/school/courses",
        Some(json!({"name": "Rust", "teacher_id": 42})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Teacher does not exist");

    let (status, body) = send(
        &router,
        "POST",
        "/api/school/courses",
        Some(json!({"name": "Rust", "teacher_id": 2})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["course"]["description"], "");
    let rust = body["course"]["id"].as_i64().unwrap();

    let uri = format!("/api/school/students/{asha}");
    let (status, body) = send(
        &router,
        "PUT",
        &uri,
        Some(json!({"name": "Asha", "email": "asha@school.com", "course_id": rust})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["course_name"], "Rust");

    let (_, body) = send(&router, "GET", "/api/school/queries-demo", None).await?;
    assert_eq!(body["filter"], json!(["Asha"]));

    let (status, _) = send(&router, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&router, "PUT", &uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");

    let (_, body) = send(&router, "GET", "/api/school/students", None).await?;
    assert_eq!(body["students"], json!([]));
    Ok(())
}
