//! Admin inventory service: authoritative books and borrow entries

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use validator::Validate;

use super::publish_and_commit;
use crate::{
    borrowing::{self, Availability, ALREADY_RETURNED},
    error::{AppError, AppResult},
    events::{payloads::BookAddedRecord, EventPublisher, Topic},
    models::{normalize_title, Book, BorrowEntry, BorrowedBook, CreateBook, NewBook, NewBorrowEntry},
    repository::AdminStore,
};

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn AdminStore>,
    events: Arc<dyn EventPublisher>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn AdminStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Add a book and announce it to the frontend
    pub async fn add_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        let new_book = NewBook::from(&book);

        let mut tx = self.store.begin().await?;
        if tx.book_by_title(&new_book.title).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Book with title '{}' already exists",
                new_book.title
            )));
        }
        let created = tx.insert_book(&new_book).await?;

        let record = BookAddedRecord::from(&created);
        publish_and_commit(tx, self.events.as_ref(), Topic::BookAdded, &[record]).await?;

        tracing::info!("Added book {} '{}'", created.id, created.title);
        Ok(created)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store
            .book_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn get_book_by_title(&self, title: &str) -> AppResult<Book> {
        let title = normalize_title(title);
        self.store
            .book_by_title(&title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with title '{}' not found", title)))
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.store.list_books().await
    }

    /// Books currently out, with their loan dates
    pub async fn list_borrowed(&self) -> AppResult<Vec<BorrowedBook>> {
        self.store.list_borrowed_books().await
    }

    /// Remove an available book and announce the removal
    pub async fn remove_book(&self, id: i32) -> AppResult<Book> {
        let mut tx = self.store.begin().await?;
        let book = tx
            .book_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let open = tx.open_entry_for_book(book.id).await?;
        Availability::from_open_entry(open.as_ref()).ensure_removable()?;

        let removed = tx
            .delete_book(book.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        publish_and_commit(tx, self.events.as_ref(), Topic::BookRemoved, &[removed.title.clone()]).await?;

        tracing::info!("Removed book {} '{}'", removed.id, removed.title);
        Ok(removed)
    }

    /// Record a loan of the book titled `title` to the user with `user_email`.
    ///
    /// Applied from borrow-requested events, so nothing is published.
    pub async fn borrow_book(
        &self,
        title: &str,
        user_email: &str,
        duration_days: i64,
        today: NaiveDate,
    ) -> AppResult<BorrowEntry> {
        let return_date = borrowing::due_date(today, duration_days)?;
        let title = normalize_title(title);

        let mut tx = self.store.begin().await?;
        let book = tx
            .book_by_title(&title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with title '{}' not found", title)))?;
        let user = tx
            .user_by_email(user_email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{}' not found", user_email)))?;

        let open = tx.open_entry_for_book(book.id).await?;
        Availability::from_open_entry(open.as_ref()).borrow()?;

        let entry = tx
            .insert_entry(&NewBorrowEntry {
                book_id: book.id,
                user_id: user.id,
                date_borrowed: today,
                return_date,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Book '{}' borrowed by {} until {} (entry {})",
            book.title,
            user.email,
            entry.return_date,
            entry.id
        );
        Ok(entry)
    }

    /// Mark a borrow entry returned and announce the book as available again
    pub async fn return_entry(&self, entry_id: i32) -> AppResult<BorrowEntry> {
        let mut tx = self.store.begin().await?;
        let entry = tx
            .entry_by_id(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow entry with id {} not found", entry_id)))?;
        if entry.is_returned {
            return Err(AppError::Conflict(ALREADY_RETURNED.to_string()));
        }

        let book = tx
            .book_by_id(entry.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", entry.book_id)))?;
        let returned = tx
            .mark_returned(entry.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow entry with id {} not found", entry_id)))?;

        publish_and_commit(tx, self.events.as_ref(), Topic::BookReturned, &[book.title.clone()]).await?;

        tracing::info!("Book '{}' returned (entry {})", book.title, returned.id);
        Ok(returned)
    }

    /// Unreturned entries due on or before `as_of`
    pub async fn due_entries(&self, as_of: NaiveDate) -> AppResult<Vec<BorrowEntry>> {
        self.store.list_due_entries(as_of).await
    }

    /// Unreturned entries due today or earlier
    pub async fn due_today(&self) -> AppResult<Vec<BorrowEntry>> {
        self.due_entries(Utc::now().date_naive()).await
    }
}
