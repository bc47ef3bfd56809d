//! Record types carried inside event messages
//!
//! book-removed and book-returned carry bare title strings, so they have no
//! record type of their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Book, CreateUser, UpdateUser, User};

/// book-added record (admin -> frontend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookAddedRecord {
    /// Admin-side id, informational only
    pub id: i32,
    pub title: String,
    pub publisher: String,
    pub category: String,
}

impl From<&Book> for BookAddedRecord {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            category: book.category.clone(),
        }
    }
}

/// user-created record (frontend -> admin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreatedRecord {
    /// Frontend-side id, informational only
    pub id: i32,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub joined_on: DateTime<Utc>,
}

impl From<&User> for UserCreatedRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            joined_on: user.joined_on,
        }
    }
}

impl UserCreatedRecord {
    pub fn to_create_user(&self) -> CreateUser {
        CreateUser {
            email: self.email.clone(),
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
        }
    }
}

/// user-updated record (frontend -> admin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdatedRecord {
    /// Email of the user before this update, used to find the mirrored copy
    pub user_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
}

impl UserUpdatedRecord {
    pub fn new(user_email: String, changes: &UpdateUser) -> Self {
        Self {
            user_email,
            email: changes.email.clone(),
            firstname: changes.firstname.clone(),
            lastname: changes.lastname.clone(),
        }
    }

    pub fn changes(&self) -> UpdateUser {
        UpdateUser {
            email: self.email.clone(),
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
        }
    }
}

/// borrow-requested record (frontend -> admin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequestedRecord {
    pub book_title: String,
    pub user_email: String,
    pub borrow_duration_days: i64,
}
