pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use shelf_db::LibraryStore;
use shelf_kernel::{InitCtx, Module};

/// Catalog browsing and lending endpoints, mounted under `/api/books`
pub struct BooksModule {
    store: Arc<LibraryStore>,
}

impl BooksModule {
    pub fn new(store: Arc<LibraryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            data_file = %self.store.file().path().display(),
            allow_reborrow = self.store.policy().allow_reborrow,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.store))
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> Value {
    json_response(description, schema_ref("ErrorResponse"))
}

fn book_list(description: &str) -> Value {
    json_response(
        description,
        json!({ "type": "array", "items": schema_ref("Book") }),
    )
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" },
        "description": "Catalog id of the book"
    })
}

fn listing_parameters() -> Value {
    json!([
        {
            "name": "filter",
            "in": "query",
            "required": false,
            "schema": { "type": "string", "enum": ["all", "available", "borrowed", "expiring"] }
        },
        {
            "name": "sort",
            "in": "query",
            "required": false,
            "schema": { "type": "string", "enum": ["title", "author", "year", "dueDate", "none"] }
        }
    ])
}

fn openapi_fragment() -> Value {
    json!({
        "paths": paths(),
        "components": { "schemas": schemas() }
    })
}

fn paths() -> Value {
    json!({
        "/": {
            "get": {
                "summary": "List books",
                "tags": ["Books"],
                "parameters": listing_parameters(),
                "responses": {
                    "200": book_list("Filtered and sorted books"),
                    "400": error_response("Unknown filter or sort key")
                }
            },
            "post": {
                "summary": "Add a book",
                "tags": ["Books"],
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": schema_ref("NewBook") } }
                },
                "responses": {
                    "201": json_response("Book added", schema_ref("Book")),
                    "422": error_response("Missing or blank fields"),
                    "500": error_response("Catalog could not be written")
                }
            }
        },
        "/filter": {
            "get": {
                "summary": "List books with catalog statistics",
                "tags": ["Books"],
                "parameters": listing_parameters(),
                "responses": {
                    "200": json_response("Listing and statistics", schema_ref("FilteredBooks")),
                    "400": error_response("Unknown filter or sort key")
                }
            }
        },
        "/available": {
            "get": {
                "summary": "Books on the shelf",
                "tags": ["Books"],
                "responses": { "200": book_list("Available books") }
            }
        },
        "/borrowed": {
            "get": {
                "summary": "Books on loan",
                "tags": ["Books"],
                "responses": { "200": book_list("Borrowed books") }
            }
        },
        "/expiring": {
            "get": {
                "summary": "Loans due within the horizon",
                "tags": ["Books"],
                "parameters": [{
                    "name": "days",
                    "in": "query",
                    "required": false,
                    "schema": { "type": "integer", "minimum": 0 }
                }],
                "responses": {
                    "200": book_list("Borrowed books due in the next `days` days, overdue excluded"),
                    "400": error_response("Negative horizon")
                }
            }
        },
        "/stats": {
            "get": {
                "summary": "Catalog statistics",
                "tags": ["Books"],
                "responses": { "200": json_response("Statistics", schema_ref("Statistics")) }
            }
        },
        "/health": {
            "get": {
                "summary": "Books health check",
                "tags": ["Books"],
                "responses": {
                    "200": {
                        "description": "OK",
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        },
        "/{id}": {
            "get": {
                "summary": "Fetch a book",
                "tags": ["Books"],
                "parameters": [id_parameter()],
                "responses": {
                    "200": json_response("The book", schema_ref("Book")),
                    "404": error_response("Unknown id")
                }
            },
            "patch": {
                "summary": "Update bibliographic fields",
                "tags": ["Books"],
                "parameters": [id_parameter()],
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": schema_ref("BookUpdate") } }
                },
                "responses": {
                    "200": json_response("Updated book", schema_ref("Book")),
                    "400": error_response("Nothing to update"),
                    "404": error_response("Unknown id"),
                    "422": error_response("Unknown or blank fields")
                }
            },
            "delete": {
                "summary": "Remove a book",
                "tags": ["Books"],
                "parameters": [id_parameter()],
                "responses": {
                    "204": { "description": "Removed" },
                    "404": error_response("Unknown id")
                }
            }
        },
        "/{id}/borrow": {
            "post": {
                "summary": "Lend a book",
                "tags": ["Lending"],
                "parameters": [id_parameter()],
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": schema_ref("BorrowRequest") } }
                },
                "responses": {
                    "200": json_response("Borrowed book", schema_ref("Book")),
                    "404": error_response("Unknown id"),
                    "409": error_response("Already on loan and re-borrowing is disabled"),
                    "422": error_response("Missing borrower or due date")
                }
            }
        },
        "/{id}/return": {
            "post": {
                "summary": "Return a book",
                "tags": ["Lending"],
                "parameters": [id_parameter()],
                "responses": {
                    "200": json_response("Returned book", schema_ref("Book")),
                    "404": error_response("Unknown id")
                }
            }
        }
    })
}

fn schemas() -> Value {
    json!({
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Assigned by the catalog" },
                "title": { "type": "string" },
                "author": { "type": "string" },
                "year": { "type": "integer" },
                "genre": { "type": "string" },
                "isAvailable": { "type": "boolean" },
                "borrower": { "type": "string", "nullable": true },
                "readerEmail": { "type": "string", "nullable": true },
                "readerPhone": { "type": "string", "nullable": true },
                "dueDate": { "type": "string", "format": "date", "nullable": true },
                "addedDate": { "type": "string", "format": "date", "nullable": true },
                "borrowedDate": { "type": "string", "format": "date", "nullable": true }
            },
            "required": ["id", "title", "author", "year", "genre", "isAvailable"]
        },
        "NewBook": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "year": { "type": "integer" },
                "genre": { "type": "string" }
            },
            "required": ["title", "author", "year", "genre"]
        },
        "BookUpdate": {
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "year": { "type": "integer" },
                "genre": { "type": "string" }
            }
        },
        "BorrowRequest": {
            "type": "object",
            "properties": {
                "borrower": { "type": "string" },
                "dueDate": { "type": "string", "format": "date" },
                "readerEmail": { "type": "string", "format": "email" },
                "readerPhone": { "type": "string" }
            },
            "required": ["borrower", "dueDate"]
        },
        "Statistics": {
            "type": "object",
            "properties": {
                "totalBooks": { "type": "integer" },
                "availableBooks": { "type": "integer" },
                "borrowedBooks": { "type": "integer" },
                "totalGenres": { "type": "integer" },
                "expiringBooks": { "type": "integer" }
            },
            "required": ["totalBooks", "availableBooks", "borrowedBooks", "totalGenres", "expiringBooks"]
        },
        "FilteredBooks": {
            "type": "object",
            "properties": {
                "books": { "type": "array", "items": schema_ref("Book") },
                "statistics": schema_ref("Statistics"),
                "filter": { "type": "string" },
                "sort": { "type": "string" },
                "message": { "type": "string" }
            },
            "required": ["books", "statistics", "filter", "sort", "message"]
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<LibraryStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
