//! Catalog document and the request types the lending workflow accepts.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::clock::parse_instant;

/// One catalog entry.
///
/// Optional fields serialize as `null`; on load both `null` and an absent key
/// are accepted. Keys this type does not know about are carried in `extra` so
/// a load/save cycle never drops data written by another tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre: String,
    #[serde(default = "available_by_default")]
    pub is_available: bool,
    #[serde(default)]
    pub borrower: Option<String>,
    #[serde(default)]
    pub reader_email: Option<String>,
    #[serde(default)]
    pub reader_phone: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub added_date: Option<String>,
    #[serde(default)]
    pub borrowed_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn available_by_default() -> bool {
    true
}

/// Older writers stored an unparseable year as `null`; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Book {
    pub fn is_borrowed(&self) -> bool {
        !self.is_available
    }

    /// Due date as an instant, if one is recorded and parses.
    pub fn due_instant(&self) -> Option<OffsetDateTime> {
        self.due_date.as_deref().and_then(parse_instant)
    }

    /// Puts the record into the Available state.
    pub(crate) fn mark_available(&mut self) {
        self.is_available = true;
        self.borrower = None;
        self.reader_email = None;
        self.reader_phone = None;
        self.due_date = None;
    }
}

/// The persisted document: `{ "books": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub books: Vec<Book>,
}

impl Catalog {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn find(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Book> {
        self.books.iter_mut().find(|book| book.id == id)
    }

    /// Next sequential id: one past the largest numeric id in the catalog.
    ///
    /// Non-numeric ids are ignored, so the result can never collide with an
    /// existing id.
    pub fn next_id(&self) -> String {
        let max = self
            .books
            .iter()
            .filter_map(|book| book.id.trim().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        max.saturating_add(1).to_string()
    }
}

/// A field-level problem reported to the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProblem {
    pub field: &'static str,
    pub error: &'static str,
}

impl FieldProblem {
    fn required(field: &'static str) -> Self {
        Self {
            field,
            error: "required",
        }
    }
}

/// Fields accepted when adding a book. The store assigns everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: i32,
    pub genre: String,
}

impl NewBook {
    pub fn validate(&self) -> Vec<FieldProblem> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push(FieldProblem::required("title"));
        }
        if self.author.trim().is_empty() {
            problems.push(FieldProblem::required("author"));
        }
        if self.genre.trim().is_empty() {
            problems.push(FieldProblem::required("genre"));
        }
        problems
    }
}

/// Partial update of the bibliographic fields of a book.
///
/// Lending state is deliberately absent: it only changes through borrow and
/// return. Unknown keys are rejected at deserialization time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.year.is_none() && self.genre.is_none()
    }

    pub fn validate(&self) -> Vec<FieldProblem> {
        let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
        let mut problems = Vec::new();
        if blank(&self.title) {
            problems.push(FieldProblem {
                field: "title",
                error: "must not be empty",
            });
        }
        if blank(&self.author) {
            problems.push(FieldProblem {
                field: "author",
                error: "must not be empty",
            });
        }
        if blank(&self.genre) {
            problems.push(FieldProblem {
                field: "genre",
                error: "must not be empty",
            });
        }
        problems
    }

    pub(crate) fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
    }
}

/// Who is borrowing a book and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub borrower: String,
    pub due_date: String,
    #[serde(default)]
    pub reader_email: Option<String>,
    #[serde(default)]
    pub reader_phone: Option<String>,
}

impl BorrowRequest {
    pub fn new(borrower: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            borrower: borrower.into(),
            due_date: due_date.into(),
            reader_email: None,
            reader_phone: None,
        }
    }

    pub fn with_contact(mut self, email: Option<String>, phone: Option<String>) -> Self {
        self.reader_email = email;
        self.reader_phone = phone;
        self
    }

    pub fn validate(&self) -> Vec<FieldProblem> {
        let mut problems = Vec::new();
        if self.borrower.trim().is_empty() {
            problems.push(FieldProblem::required("borrower"));
        }
        if self.due_date.trim().is_empty() {
            problems.push(FieldProblem::required("dueDate"));
        } else if parse_instant(&self.due_date).is_none() {
            problems.push(FieldProblem {
                field: "dueDate",
                error: "expected YYYY-MM-DD",
            });
        }
        problems
    }
}

/// Aggregate counters over the whole catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_books: usize,
    pub available_books: usize,
    pub borrowed_books: usize,
    pub total_genres: usize,
    pub expiring_books: usize,
}
