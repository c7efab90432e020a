use serde::{Deserialize, Serialize};
use shelf_db::{Book, BookFilter, SortKey, Statistics};

/// Query string accepted by the listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// `all`, `available`, `borrowed` or `expiring`
    pub filter: Option<String>,
    /// `title`, `author`, `year`, `dueDate` or `none`
    pub sort: Option<String>,
}

/// Query string accepted by the expiring-books endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpiringQuery {
    /// Horizon in days; the configured default when absent
    pub days: Option<i64>,
}

/// Listing together with catalog statistics, as the browsing page uses it.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredBooks {
    pub books: Vec<Book>,
    pub statistics: Statistics,
    pub filter: BookFilter,
    pub sort: SortKey,
    pub message: String,
}

impl FilteredBooks {
    pub fn new(books: Vec<Book>, statistics: Statistics, filter: BookFilter, sort: SortKey) -> Self {
        let message = match books.len() {
            1 => "found 1 book".to_string(),
            n => format!("found {n} books"),
        };
        Self {
            books,
            statistics,
            filter,
            sort,
            message,
        }
    }
}
