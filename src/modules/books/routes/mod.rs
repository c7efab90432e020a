//! HTTP handlers for the books module.
//!
//! Handlers validate request fields, then call the store on the blocking
//! pool and translate its outcome into a response.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shelf_db::{
    Book, BookFilter, BookUpdate, BorrowRequest, FieldProblem, LibraryStore, NewBook, SortKey,
    Statistics, StoreError,
};
use shelf_http::error::AppError;

use super::models::{ExpiringQuery, FilteredBooks, ListQuery};

type Store = Arc<LibraryStore>;

/// Routes mounted under `/api/books`.
pub fn router(store: Store) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/filter", get(filter_books))
        .route("/available", get(available_books))
        .route("/borrowed", get(borrowed_books))
        .route("/expiring", get(expiring_books))
        .route("/stats", get(statistics))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .route("/{id}/borrow", post(borrow_book))
        .route("/{id}/return", post(return_book))
        .with_state(store)
}

/// Runs a store operation on the blocking pool; the store does file I/O.
async fn with_store<T, F>(store: &Store, op: F) -> Result<T, AppError>
where
    F: FnOnce(&LibraryStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|err| AppError::Internal(anyhow::Error::new(err).context("store task failed")))
}

fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(id) => AppError::not_found(format!("book '{id}' not found")),
        StoreError::AlreadyBorrowed { id, borrower } => AppError::conflict(
            vec![json!({ "id": id, "borrower": borrower })],
            "book is already on loan; return it before lending it again",
        ),
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}

fn invalid(problems: Vec<FieldProblem>, message: &str) -> AppError {
    let details = problems
        .into_iter()
        .map(|problem| json!({ "field": problem.field, "error": problem.error }))
        .collect();
    AppError::validation(details, message)
}

fn listing_options(query: &ListQuery) -> Result<(BookFilter, SortKey), AppError> {
    let filter: BookFilter = query
        .filter
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|err: shelf_db::UnknownOption| AppError::bad_request(err.to_string()))?
        .unwrap_or_default();
    let sort: SortKey = query
        .sort
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|err: shelf_db::UnknownOption| AppError::bad_request(err.to_string()))?
        .unwrap_or_default();
    Ok((filter, sort))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(store): State<Store>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    let (filter, sort) = listing_options(&query)?;
    let books = with_store(&store, move |s| s.list_books(filter, sort)).await?;
    Ok(Json(books))
}

async fn filter_books(
    State(store): State<Store>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<FilteredBooks>, AppError> {
    let Query(query) = query?;
    let (filter, sort) = listing_options(&query)?;
    let (books, statistics) =
        with_store(&store, move |s| (s.list_books(filter, sort), s.statistics())).await?;
    Ok(Json(FilteredBooks::new(books, statistics, filter, sort)))
}

async fn available_books(State(store): State<Store>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(with_store(&store, |s| s.available_books()).await?))
}

async fn borrowed_books(State(store): State<Store>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(with_store(&store, |s| s.borrowed_books()).await?))
}

async fn expiring_books(
    State(store): State<Store>,
    query: Result<Query<ExpiringQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    let days = query
        .days
        .unwrap_or_else(|| store.policy().expiring_horizon_days);
    if days < 0 {
        return Err(AppError::bad_request("days must not be negative"));
    }
    Ok(Json(with_store(&store, move |s| s.expiring_books(days)).await?))
}

async fn statistics(State(store): State<Store>) -> Result<Json<Statistics>, AppError> {
    Ok(Json(with_store(&store, |s| s.statistics()).await?))
}

async fn get_book(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let lookup = id.clone();
    with_store(&store, move |s| s.book_by_id(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book '{id}' not found")))
}

async fn create_book(
    State(store): State<Store>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(new) = body?;
    let problems = new.validate();
    if !problems.is_empty() {
        return Err(invalid(problems, "all fields are required"));
    }

    let book = with_store(&store, move |s| s.add_book(new))
        .await?
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(store): State<Store>,
    Path(id): Path<String>,
    body: Result<Json<BookUpdate>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(update) = body?;
    if update.is_empty() {
        return Err(AppError::bad_request("no fields to update"));
    }
    let problems = update.validate();
    if !problems.is_empty() {
        return Err(invalid(problems, "invalid book fields"));
    }

    let book = with_store(&store, move |s| s.update_book(&id, update))
        .await?
        .map_err(store_error)?;
    Ok(Json(book))
}

async fn delete_book(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    with_store(&store, move |s| s.delete_book(&id))
        .await?
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn borrow_book(
    State(store): State<Store>,
    Path(id): Path<String>,
    body: Result<Json<BorrowRequest>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(request) = body?;
    let problems = request.validate();
    if !problems.is_empty() {
        return Err(invalid(problems, "borrower and due date are required"));
    }

    let book = with_store(&store, move |s| s.borrow_book(&id, request))
        .await?
        .map_err(store_error)?;
    Ok(Json(book))
}

async fn return_book(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let book = with_store(&store, move |s| s.return_book(&id))
        .await?
        .map_err(store_error)?;
    Ok(Json(book))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::Value;
    use shelf_db::{LendingPolicy, StoreOptions};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(temp: &TempDir) -> Router {
        router(Arc::new(LibraryStore::open(temp.path().join("books.json"))))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn list_is_sorted_by_title_by_default() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(&app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            titles,
            vec!["Dune", "Programming Rust", "The Rust Programming Language"]
        );
    }

    #[tokio::test]
    async fn unknown_listing_options_are_bad_requests() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(&app, Method::GET, "/?sort=isbn", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn filter_endpoint_reports_statistics() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(&app, Method::GET, "/filter?filter=borrowed&sort=dueDate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["books"].as_array().unwrap().len(), 1);
        assert_eq!(body["statistics"]["totalBooks"], 3);
        assert_eq!(body["statistics"]["borrowedBooks"], 1);
        assert_eq!(body["filter"], "borrowed");
        assert_eq!(body["sort"], "dueDate");
        assert_eq!(body["message"], "found 1 book");
    }

    #[tokio::test]
    async fn missing_book_is_404() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(&app, Method::GET, "/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, created) = send(
            &app,
            Method::POST,
            "/",
            Some(json!({ "title": "Neuromancer", "author": "William Gibson", "year": 1984, "genre": "Cyberpunk" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], "4");
        assert_eq!(created["isAvailable"], true);
        assert_eq!(created["borrower"], Value::Null);

        let (status, fetched) = send(&app, Method::GET, "/4", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(
            &app,
            Method::POST,
            "/",
            Some(json!({ "title": "", "author": "Anon", "year": 2000, "genre": "Essays" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "title");

        let (status, _) = send(&app, Method::POST, "/", Some(json!({ "title": "Only" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn patch_changes_only_supplied_fields() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (_, before) = send(&app, Method::GET, "/2", None).await;
        let (status, after) = send(&app, Method::PATCH, "/2", Some(json!({ "genre": "X" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(after["genre"], "X");
        for field in ["title", "author", "year", "isAvailable", "borrower", "dueDate"] {
            assert_eq!(after[field], before[field], "{field}");
        }
    }

    #[tokio::test]
    async fn patch_rejects_lending_fields() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, _) = send(&app, Method::PATCH, "/1", Some(json!({ "isAvailable": false }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, Method::PATCH, "/1", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PATCH, "/99", Some(json!({ "genre": "X" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn borrow_and_return_cycle() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(
            &app,
            Method::POST,
            "/1/borrow",
            Some(json!({ "borrower": "Alice", "dueDate": "2099-01-01", "readerEmail": "alice@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAvailable"], false);
        assert_eq!(body["borrower"], "Alice");

        let (status, body) = send(&app, Method::POST, "/1/return", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAvailable"], true);
        assert_eq!(body["borrower"], Value::Null);
        assert_eq!(body["dueDate"], Value::Null);
        assert_eq!(body["readerEmail"], Value::Null);
    }

    #[tokio::test]
    async fn borrow_requires_borrower_and_due_date() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, body) = send(
            &app,
            Method::POST,
            "/1/borrow",
            Some(json!({ "borrower": " ", "dueDate": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            Method::POST,
            "/77/borrow",
            Some(json!({ "borrower": "Bob", "dueDate": "2099-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn borrow_conflicts_when_reborrow_is_disabled() {
        let temp = TempDir::new().unwrap();
        let mut options = StoreOptions::new(temp.path().join("books.json"));
        options.policy = LendingPolicy {
            allow_reborrow: false,
            ..LendingPolicy::default()
        };
        let app = router(Arc::new(LibraryStore::new(options)));

        let (status, body) = send(
            &app,
            Method::POST,
            "/2/borrow",
            Some(json!({ "borrower": "Carol", "dueDate": "2099-02-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["details"][0]["borrower"], "Alice Johnson");
    }

    #[tokio::test]
    async fn delete_twice_is_404() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, _) = send(&app, Method::DELETE, "/3", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, "/3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, stats) = send(&app, Method::GET, "/stats", None).await;
        assert_eq!(stats["totalBooks"], 2);
    }

    #[tokio::test]
    async fn expiring_rejects_negative_horizon() {
        let temp = TempDir::new().unwrap();
        let app = app(&temp);

        let (status, _) = send(&app, Method::GET, "/expiring?days=-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/expiring", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
