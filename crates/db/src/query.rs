//! Read-only views over the catalog: partitions, expiring loans, sorting and
//! aggregate statistics.

use std::{cmp::Ordering, collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{macros::datetime, OffsetDateTime};

use crate::{
    model::{Book, Catalog, Statistics},
    store::LibraryStore,
};

const NANOS_PER_DAY: i128 = 86_400 * 1_000_000_000;

/// Due date used for books that have none, so they sort last.
const NO_DUE_DATE: OffsetDateTime = datetime!(9999-12-31 0:00 UTC);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownOption {
    kind: &'static str,
    value: String,
}

/// Which slice of the catalog to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFilter {
    #[default]
    All,
    Available,
    Borrowed,
    Expiring,
}

impl FromStr for BookFilter {
    type Err = UnknownOption;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "available" => Ok(Self::Available),
            "borrowed" => Ok(Self::Borrowed),
            "expiring" => Ok(Self::Expiring),
            _ => Err(UnknownOption {
                kind: "filter",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for BookFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Available => "available",
            Self::Borrowed => "borrowed",
            Self::Expiring => "expiring",
        })
    }
}

/// Ordering applied to a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Title,
    Author,
    /// Newest first.
    Year,
    /// Soonest first, books without a due date last.
    DueDate,
    /// Catalog order.
    None,
}

impl FromStr for SortKey {
    type Err = UnknownOption;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "year" => Ok(Self::Year),
            "duedate" | "due_date" | "due-date" | "due" => Ok(Self::DueDate),
            "none" => Ok(Self::None),
            _ => Err(UnknownOption {
                kind: "sort key",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::DueDate => "dueDate",
            Self::None => "none",
        })
    }
}

/// Whole days until `due`, rounded up. Zero or negative means due or overdue.
pub fn days_until_due(due: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let nanos = (due - now).whole_nanoseconds();
    let mut days = nanos.div_euclid(NANOS_PER_DAY);
    if nanos.rem_euclid(NANOS_PER_DAY) > 0 {
        days += 1;
    }
    // |Duration| fits in i64 seconds, so the day count always fits in i64.
    days as i64
}

/// A borrowed book whose due date is strictly in the future and at most
/// `horizon_days` away.
pub fn is_expiring(book: &Book, now: OffsetDateTime, horizon_days: i64) -> bool {
    if !book.is_borrowed() {
        return false;
    }
    match book.due_instant() {
        Some(due) => {
            let days = days_until_due(due, now);
            days > 0 && days <= horizon_days
        }
        None => false,
    }
}

/// Sorts in place. The sort is stable, so ties keep catalog order.
pub fn sort_books(books: &mut [Book], key: SortKey) {
    match key {
        SortKey::Title => books.sort_by(|a, b| compare_text(&a.title, &b.title)),
        SortKey::Author => books.sort_by(|a, b| compare_text(&a.author, &b.author)),
        SortKey::Year => books.sort_by(|a, b| b.year.cmp(&a.year)),
        SortKey::DueDate => books.sort_by_key(|book| book.due_instant().unwrap_or(NO_DUE_DATE)),
        SortKey::None => {}
    }
}

/// Case-insensitive comparison with an exact tiebreak.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Counters over one snapshot of the catalog.
pub fn statistics_of(catalog: &Catalog, now: OffsetDateTime, horizon_days: i64) -> Statistics {
    let books = &catalog.books;
    let available = books.iter().filter(|book| book.is_available).count();
    let genres: HashSet<&str> = books.iter().map(|book| book.genre.as_str()).collect();

    Statistics {
        total_books: books.len(),
        available_books: available,
        borrowed_books: books.len() - available,
        total_genres: genres.len(),
        expiring_books: books
            .iter()
            .filter(|book| is_expiring(book, now, horizon_days))
            .count(),
    }
}

impl LibraryStore {
    pub fn all_books(&self) -> Vec<Book> {
        self.file.load().books
    }

    pub fn book_by_id(&self, id: &str) -> Option<Book> {
        self.file.load().find(id).cloned()
    }

    pub fn available_books(&self) -> Vec<Book> {
        self.books_where(|book| book.is_available)
    }

    pub fn borrowed_books(&self) -> Vec<Book> {
        self.books_where(Book::is_borrowed)
    }

    /// Borrowed books due within `horizon_days`, excluding overdue ones.
    pub fn expiring_books(&self, horizon_days: i64) -> Vec<Book> {
        let now = self.clock.now();
        self.books_where(|book| is_expiring(book, now, horizon_days))
    }

    /// Totals, distinct genres and the number of loans expiring within the
    /// policy horizon (seven days unless configured otherwise).
    pub fn statistics(&self) -> Statistics {
        statistics_of(
            &self.file.load(),
            self.clock.now(),
            self.policy.expiring_horizon_days,
        )
    }

    /// Filtered and sorted listing, as the browsing views present it.
    pub fn list_books(&self, filter: BookFilter, sort: SortKey) -> Vec<Book> {
        let mut books = match filter {
            BookFilter::All => self.all_books(),
            BookFilter::Available => self.available_books(),
            BookFilter::Borrowed => self.borrowed_books(),
            BookFilter::Expiring => self.expiring_books(self.policy.expiring_horizon_days),
        };
        sort_books(&mut books, sort);
        books
    }

    fn books_where(&self, keep: impl Fn(&Book) -> bool) -> Vec<Book> {
        self.all_books().into_iter().filter(|book| keep(book)).collect()
    }
}
