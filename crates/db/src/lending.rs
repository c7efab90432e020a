//! Lending workflow: catalog mutations and the Available/Borrowed transitions.
//!
//! Every record satisfies `is_available == borrower.is_none()`, and an
//! available record never carries a due date.

use serde_json::Map;

use crate::{
    clock::format_date,
    error::{Result, StoreError},
    model::{Book, BookUpdate, BorrowRequest, NewBook},
    store::LibraryStore,
};

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl LibraryStore {
    /// Adds a book in the Available state with the next sequential id.
    pub fn add_book(&self, new: NewBook) -> Result<Book> {
        let today = format_date(self.clock.today());
        let book = self.mutate(|catalog| {
            let book = Book {
                id: catalog.next_id(),
                title: new.title,
                author: new.author,
                year: new.year,
                genre: new.genre,
                is_available: true,
                borrower: None,
                reader_email: None,
                reader_phone: None,
                due_date: None,
                added_date: Some(today),
                borrowed_date: None,
                extra: Map::new(),
            };
            catalog.books.push(book.clone());
            Ok(book)
        })?;

        tracing::info!(book_id = %book.id, title = %book.title, "book added");
        Ok(book)
    }

    /// Merges the supplied bibliographic fields into an existing book.
    pub fn update_book(&self, id: &str, update: BookUpdate) -> Result<Book> {
        let book = self.mutate(|catalog| {
            let book = catalog
                .find_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            update.apply(book);
            Ok(book.clone())
        })?;

        tracing::info!(book_id = %book.id, "book updated");
        Ok(book)
    }

    /// Removes a book. Fails with [`StoreError::NotFound`] if no record matched.
    pub fn delete_book(&self, id: &str) -> Result<()> {
        self.mutate(|catalog| {
            let before = catalog.books.len();
            catalog.books.retain(|book| book.id != id);
            if catalog.books.len() == before {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(())
        })?;

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }

    /// Moves a book to the Borrowed state.
    ///
    /// A book that is already borrowed is re-lent to the new borrower unless
    /// the policy forbids it, in which case [`StoreError::AlreadyBorrowed`] is
    /// returned and nothing is written.
    pub fn borrow_book(&self, id: &str, request: BorrowRequest) -> Result<Book> {
        let today = format_date(self.clock.today());
        let allow_reborrow = self.policy.allow_reborrow;

        let book = self.mutate(|catalog| {
            let book = catalog
                .find_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            if book.is_borrowed() {
                let current = book.borrower.clone().unwrap_or_default();
                if !allow_reborrow {
                    return Err(StoreError::AlreadyBorrowed {
                        id: id.to_string(),
                        borrower: current,
                    });
                }
                tracing::warn!(
                    book_id = %id,
                    previous = %current,
                    borrower = %request.borrower,
                    "book re-borrowed without return, replacing previous loan"
                );
            }

            book.is_available = false;
            book.borrower = Some(request.borrower);
            book.reader_email = non_blank(request.reader_email);
            book.reader_phone = non_blank(request.reader_phone);
            book.due_date = Some(request.due_date);
            book.borrowed_date = Some(today);
            Ok(book.clone())
        })?;

        tracing::info!(
            book_id = %book.id,
            borrower = ?book.borrower,
            due_date = ?book.due_date,
            "book borrowed"
        );
        Ok(book)
    }

    /// Moves a book back to the Available state, clearing the loan.
    ///
    /// Returning a book that is already available succeeds.
    pub fn return_book(&self, id: &str) -> Result<Book> {
        let book = self.mutate(|catalog| {
            let book = catalog
                .find_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if book.is_available {
                tracing::debug!(book_id = %id, "return of a book that is not on loan");
            }
            book.mark_available();
            Ok(book.clone())
        })?;

        tracing::info!(book_id = %book.id, "book returned");
        Ok(book)
    }
}
