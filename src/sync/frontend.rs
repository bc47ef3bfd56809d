//! Frontend side: catalog changes coming from the admin

use async_trait::async_trait;
use serde_json::Value;

use super::InboundHandler;
use crate::{
    error::{AppError, AppResult},
    events::{codec::decode_record, payloads::BookAddedRecord, Topic},
    models::NewBook,
    services::FrontendServices,
};

pub struct FrontendHandler {
    services: FrontendServices,
}

impl FrontendHandler {
    pub fn new(services: FrontendServices) -> Self {
        Self { services }
    }

    async fn book_added(&self, record: BookAddedRecord) -> AppResult<()> {
        let book = NewBook {
            title: record.title,
            publisher: record.publisher,
            category: record.category,
        };
        match self.services.catalog.add_book(book).await {
            Ok(_) => Ok(()),
            Err(AppError::Conflict(msg)) => {
                tracing::debug!("Ignoring duplicate book-added record: {}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn book_returned(&self, title: String) -> AppResult<()> {
        match self.services.catalog.mark_returned(&title).await {
            Ok(_) => Ok(()),
            // Redelivered return of a book we already flipped back
            Err(AppError::Conflict(msg)) => {
                tracing::debug!("Ignoring book-returned record for '{}': {}", title, msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn book_removed(&self, title: String) -> AppResult<()> {
        match self.services.catalog.remove_by_title(&title).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(msg)) => {
                tracing::debug!("Ignoring book-removed record: {}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl InboundHandler for FrontendHandler {
    async fn apply(&self, topic: Topic, record: Value) -> AppResult<()> {
        match topic {
            Topic::BookAdded => self.book_added(decode_record(record)?).await,
            Topic::BookReturned => self.book_returned(decode_record(record)?).await,
            Topic::BookRemoved => self.book_removed(decode_record(record)?).await,
            other => Err(AppError::BadRequest(format!(
                "Frontend does not consume {} events",
                other
            ))),
        }
    }
}
