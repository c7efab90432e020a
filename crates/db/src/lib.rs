//! Library storage engine.
//!
//! [`LibraryStore`] owns a single JSON catalog file and provides three things
//! over it:
//!
//! - persistence ([`CatalogFile`]): whole-document load and save,
//! - catalog queries: partitions, expiring loans, sorting and statistics,
//! - the lending workflow: add, update, delete, borrow and return.
//!
//! Queries never fail; an unreadable catalog is logged and treated as empty.
//! Mutations return [`StoreError`] so callers can tell a missing book from a
//! persistence failure.

pub mod clock;
pub mod error;
mod lending;
pub mod model;
pub mod persistence;
pub mod query;
mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, StoreError};
pub use model::{Book, BookUpdate, BorrowRequest, Catalog, FieldProblem, NewBook, Statistics};
pub use persistence::{seed_catalog, CatalogFile};
pub use query::{sort_books, BookFilter, SortKey, UnknownOption};
pub use store::{LendingPolicy, LibraryStore, StoreOptions, DEFAULT_EXPIRING_HORIZON_DAYS};
