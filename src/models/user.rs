//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BorrowedBook;

/// User record (created by the frontend, mirrored by the admin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    /// Unique email, also the cross-service key for users
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub joined_on: DateTime<Utc>,
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email(message = "Invalid email supplied"))]
    pub email: String,
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub firstname: String,
    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub lastname: String,
}

/// User ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub joined_on: DateTime<Utc>,
}

impl NewUser {
    pub fn joining_now(user: CreateUser) -> Self {
        Self {
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            joined_on: Utc::now(),
        }
    }
}

/// Partial user update, absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(email(message = "Invalid email supplied"))]
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.firstname.is_none() && self.lastname.is_none()
    }
}

/// User with the books they borrowed (admin reporting)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserBooks {
    pub id: i32,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub joined_on: DateTime<Utc>,
    pub borrowed_books: Vec<BorrowedBook>,
}

impl UserBooks {
    pub fn new(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            joined_on: user.joined_on,
            borrowed_books: Vec::new(),
        }
    }
}
