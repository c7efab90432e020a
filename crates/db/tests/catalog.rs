//! End-to-end behaviour of the store against a real catalog file.

use std::{collections::HashSet, sync::Arc, thread};

use shelf_db::{
    BookFilter, BorrowRequest, Catalog, CatalogFile, FixedClock, LendingPolicy, LibraryStore,
    NewBook, SortKey, Statistics, StoreOptions,
};
use tempfile::TempDir;
use time::{macros::datetime, Duration, OffsetDateTime};

const NOW: OffsetDateTime = datetime!(2026-05-20 12:00 UTC);

fn fixed_store(temp: &TempDir) -> LibraryStore {
    LibraryStore::open(temp.path().join("books.json")).with_clock(Arc::new(FixedClock(NOW)))
}

fn due_in(days: i64) -> String {
    shelf_db::clock::format_date((NOW + Duration::days(days)).date())
}

#[test]
fn seeded_catalog_statistics() {
    let temp = TempDir::new().unwrap();
    let store = fixed_store(&temp);

    let ids: Vec<_> = store.all_books().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(
        store.statistics(),
        Statistics {
            total_books: 3,
            available_books: 2,
            borrowed_books: 1,
            total_genres: 2,
            expiring_books: 0,
        }
    );
}

#[test]
fn expiring_books_respect_the_horizon() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let store = fixed_store(&temp);

    store.borrow_book("1", BorrowRequest::new("Soon", due_in(5)))?;
    store.borrow_book("3", BorrowRequest::new("Later", due_in(10)))?;
    let overdue = store.add_book(NewBook {
        title: "Overdue".to_string(),
        author: "A".to_string(),
        year: 2001,
        genre: "Programming".to_string(),
    })?;
    store.borrow_book(&overdue.id, BorrowRequest::new("Late", due_in(-1)))?;

    let expiring: Vec<_> = store.expiring_books(7).into_iter().map(|b| b.id).collect();
    assert_eq!(expiring, vec!["1"]);

    let wider: HashSet<_> = store.expiring_books(14).into_iter().map(|b| b.id).collect();
    assert_eq!(wider, HashSet::from(["1".to_string(), "3".to_string()]));

    assert_eq!(store.statistics().expiring_books, 1);
    Ok(())
}

#[test]
fn loan_due_in_under_a_second_is_expiring() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("books.json");
    LibraryStore::open(&path).borrow_book("1", BorrowRequest::new("Alice", "2026-05-21"))?;

    let due = datetime!(2026-05-21 0:00 UTC);
    let just_before = LibraryStore::open(&path)
        .with_clock(Arc::new(FixedClock(due - Duration::milliseconds(500))));
    let ids: Vec<_> = just_before.expiring_books(7).into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["1"]);

    let a_week_out = LibraryStore::open(&path).with_clock(Arc::new(FixedClock(
        due - Duration::days(7) - Duration::milliseconds(500),
    )));
    assert!(a_week_out.expiring_books(7).is_empty());
    Ok(())
}

#[test]
fn statistics_use_the_policy_horizon() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let mut options = StoreOptions::new(temp.path().join("books.json"));
    options.policy = LendingPolicy {
        expiring_horizon_days: 3,
        ..LendingPolicy::default()
    };
    let store = LibraryStore::new(options).with_clock(Arc::new(FixedClock(NOW)));

    store.borrow_book("1", BorrowRequest::new("Soon", due_in(2)))?;
    store.borrow_book("3", BorrowRequest::new("Later", due_in(5)))?;

    assert_eq!(store.statistics().expiring_books, 1);
    assert_eq!(fixed_store(&temp).statistics().expiring_books, 2);
    Ok(())
}

#[test]
fn returned_books_leave_expiry_views() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let store = fixed_store(&temp);

    store.borrow_book("1", BorrowRequest::new("Alice", due_in(3)))?;
    assert_eq!(store.expiring_books(7).len(), 1);

    store.return_book("1")?;
    assert!(store.expiring_books(7).is_empty());
    assert!(store.borrowed_books().iter().all(|b| b.id != "1"));
    Ok(())
}

#[test]
fn listing_filters_and_sorts() {
    let temp = TempDir::new().unwrap();
    let store = fixed_store(&temp);

    let available: Vec<_> = store
        .list_books(BookFilter::Available, SortKey::Title)
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(
        available,
        vec!["Programming Rust", "The Rust Programming Language"]
    );

    let borrowed = store.list_books(BookFilter::Borrowed, SortKey::Year);
    assert_eq!(borrowed.len(), 1);
    assert_eq!(borrowed[0].id, "2");

    let by_due: Vec<_> = store
        .list_books(BookFilter::All, SortKey::DueDate)
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(by_due.first().map(String::as_str), Some("2"));
}

#[test]
fn save_of_load_round_trips() {
    let temp = TempDir::new().unwrap();
    let file = CatalogFile::new(temp.path().join("books.json"));

    let loaded = file.load();
    assert!(file.save(&loaded));
    let reread: Catalog = serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap())
        .unwrap();
    assert_eq!(reread, loaded);
}

#[test]
fn concurrent_mutations_do_not_lose_updates() {
    let temp = TempDir::new().unwrap();
    let store = fixed_store(&temp);
    store.ensure_catalog().unwrap();

    thread::scope(|scope| {
        for worker in 0..8 {
            let store = &store;
            scope.spawn(move || {
                for n in 0..5 {
                    store
                        .add_book(NewBook {
                            title: format!("Book {worker}-{n}"),
                            author: "Writer".to_string(),
                            year: 2020,
                            genre: "Essays".to_string(),
                        })
                        .unwrap();
                }
            });
        }
    });

    let books = store.all_books();
    assert_eq!(books.len(), 3 + 8 * 5);
    let ids: HashSet<_> = books.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids.len(), books.len());
    assert!(books.iter().all(|b| b.is_available == b.borrower.is_none()));
}
