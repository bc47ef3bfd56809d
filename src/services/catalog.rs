//! Frontend catalog service: the local projection of the admin inventory

use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use super::publish_and_commit;
use crate::{
    borrowing::{self, Availability},
    error::{AppError, AppResult},
    events::{payloads::BorrowRequestedRecord, EventPublisher, Topic},
    models::{normalize_title, BookFilter, BorrowRequest, CatalogBook, NewBook},
    repository::FrontendStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn FrontendStore>,
    events: Arc<dyn EventPublisher>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn FrontendStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Cache a book announced by the admin. The local id is assigned here.
    pub async fn add_book(&self, book: NewBook) -> AppResult<CatalogBook> {
        let book = NewBook {
            title: normalize_title(&book.title),
            ..book
        };

        let mut tx = self.store.begin().await?;
        if tx.book_by_title(&book.title).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Book with title '{}' already exists",
                book.title
            )));
        }
        let created = tx.insert_book(&book).await?;
        tx.commit().await?;

        tracing::info!("Cached book {} '{}'", created.id, created.title);
        Ok(created)
    }

    /// Get a book, borrowed or not
    pub async fn get_book(&self, id: i32) -> AppResult<CatalogBook> {
        self.store
            .book_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn list_available(&self) -> AppResult<Vec<CatalogBook>> {
        self.store.list_available_books().await
    }

    pub async fn search(&self, filter: &BookFilter) -> AppResult<Vec<CatalogBook>> {
        self.store.search_available_books(&filter.normalized()).await
    }

    /// Flag a book as borrowed and ask the admin to record the loan
    pub async fn borrow(&self, book_id: i32, request: BorrowRequest) -> AppResult<CatalogBook> {
        request.validate()?;
        // Reject durations the admin could not turn into a due date
        borrowing::due_date(Utc::now().date_naive(), request.borrow_duration_days)?;

        let user = self
            .store
            .user_by_id(request.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", request.user_id)))?;

        let mut tx = self.store.begin().await?;
        let book = tx
            .book_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        Availability::from_flag(book.is_borrowed).borrow()?;

        let borrowed = tx
            .set_borrowed(book.id, true)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let record = BorrowRequestedRecord {
            book_title: borrowed.title.clone(),
            user_email: user.email.clone(),
            borrow_duration_days: request.borrow_duration_days,
        };
        publish_and_commit(tx, self.events.as_ref(), Topic::BorrowRequested, &[record]).await?;

        tracing::info!(
            "User {} requested '{}' for {} day(s)",
            user.email,
            borrowed.title,
            request.borrow_duration_days
        );
        Ok(borrowed)
    }

    /// Flip a book back to available after the admin recorded its return
    pub async fn mark_returned(&self, title: &str) -> AppResult<CatalogBook> {
        let title = normalize_title(title);

        let mut tx = self.store.begin().await?;
        let book = tx
            .book_by_title(&title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with title '{}' not found", title)))?;
        Availability::from_flag(book.is_borrowed).give_back()?;

        let returned = tx
            .set_borrowed(book.id, false)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with title '{}' not found", title)))?;
        tx.commit().await?;

        tracing::info!("Book '{}' is available again", returned.title);
        Ok(returned)
    }

    /// Drop a book the admin removed from its inventory
    pub async fn remove_by_title(&self, title: &str) -> AppResult<CatalogBook> {
        let title = normalize_title(title);

        let mut tx = self.store.begin().await?;
        let book = tx
            .book_by_title(&title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with title '{}' not found", title)))?;
        let removed = tx
            .delete_book(book.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with title '{}' not found", title)))?;
        tx.commit().await?;

        tracing::info!("Removed cached book '{}'", removed.title);
        Ok(removed)
    }
}
