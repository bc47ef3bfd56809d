//! Book models for the admin inventory and the frontend catalog

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Titles are the cross-service join key and are stored lowercased
pub fn normalize_title(title: &str) -> String {
    title.to_lowercase()
}

/// Book as held by the admin inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    /// Unique, lowercased title
    pub title: String,
    pub publisher: String,
    pub category: String,
}

/// Book as cached by the frontend, with its projected availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CatalogBook {
    pub id: i32,
    pub title: String,
    pub publisher: String,
    pub category: String,
    /// Cached flag, authoritative state lives in the admin service
    pub is_borrowed: bool,
}

/// Add book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Publisher must not be empty"))]
    pub publisher: String,
    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: String,
}

/// Normalized book ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub publisher: String,
    pub category: String,
}

impl From<&CreateBook> for NewBook {
    fn from(book: &CreateBook) -> Self {
        Self {
            title: normalize_title(&book.title),
            publisher: book.publisher.to_lowercase(),
            category: book.category.to_lowercase(),
        }
    }
}

/// Search filters for the frontend catalog (substring matches)
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookFilter {
    pub title: Option<String>,
    pub category: Option<String>,
    pub publisher: Option<String>,
}

impl BookFilter {
    /// Lowercased filter values, empty strings dropped
    pub fn normalized(&self) -> BookFilter {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
        };
        BookFilter {
            title: clean(&self.title),
            category: clean(&self.category),
            publisher: clean(&self.publisher),
        }
    }
}

/// Book joined with one of its borrow entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowedBook {
    pub id: i32,
    pub title: String,
    pub publisher: String,
    pub category: String,
    pub date_borrowed: NaiveDate,
    pub return_date: NaiveDate,
    pub is_returned: bool,
}
