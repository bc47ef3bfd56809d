//! Admin mirror of the users created on the frontend

use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{BorrowedBook, NewUser, UpdateUser, User, UserBooks},
    repository::AdminStore,
};

#[derive(Clone)]
pub struct MemberService {
    store: Arc<dyn AdminStore>,
}

impl MemberService {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self { store }
    }

    /// Store a copy of a frontend user. The admin assigns its own id.
    pub async fn add_user(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self.store.begin().await?;
        if tx.user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                user.email
            )));
        }
        let created = tx.insert_user(&user).await?;
        tx.commit().await?;

        tracing::info!("Mirrored user {} as {}", created.email, created.id);
        Ok(created)
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn get_user_by_email(&self, email: &str) -> AppResult<User> {
        self.store
            .user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{}' not found", email)))
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.store.list_users().await
    }

    /// Users that have borrowed at least one book, each with their books.
    /// Only books still out are listed unless `include_returned` is set.
    pub async fn users_with_books(&self, include_returned: bool) -> AppResult<Vec<UserBooks>> {
        let loans = self.store.list_user_loans(include_returned).await?;
        Ok(group_by_user(loans))
    }

    /// Apply a partial update to the user currently registered as `user_email`
    pub async fn apply_update(&self, user_email: &str, changes: &UpdateUser) -> AppResult<User> {
        changes.validate()?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .user_by_email(user_email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{}' not found", user_email)))?;
        if changes.is_empty() {
            return Ok(user);
        }

        let updated = tx
            .update_user(user.id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{}' not found", user_email)))?;
        tx.commit().await?;

        tracing::info!("Updated mirrored user {}", updated.id);
        Ok(updated)
    }
}

/// Fold (user, book) rows into one entry per user, keeping row order
fn group_by_user(loans: Vec<(User, BorrowedBook)>) -> Vec<UserBooks> {
    let mut grouped: Vec<UserBooks> = Vec::new();
    for (user, book) in loans {
        match grouped.last_mut() {
            Some(last) if last.id == user.id => last.borrowed_books.push(book),
            _ => {
                let mut entry = UserBooks::new(user);
                entry.borrowed_books.push(book);
                grouped.push(entry);
            }
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn user(id: i32) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            joined_on: Utc::now(),
        }
    }

    fn book(id: i32) -> BorrowedBook {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        BorrowedBook {
            id,
            title: format!("book {}", id),
            publisher: "p".to_string(),
            category: "c".to_string(),
            date_borrowed: day,
            return_date: day,
            is_returned: false,
        }
    }

    #[test]
    fn test_group_by_user() {
        let grouped = group_by_user(vec![(user(1), book(1)), (user(1), book(2)), (user(2), book(3))]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].borrowed_books.len(), 2);
        assert_eq!(grouped[1].id, 2);
        assert_eq!(grouped[1].borrowed_books[0].id, 3);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_user(Vec::new()).is_empty());
    }
}
