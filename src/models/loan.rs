//! Borrow entry model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Authoritative loan record, owned by the admin service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowEntry {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub date_borrowed: NaiveDate,
    /// Due date
    pub return_date: NaiveDate,
    pub is_returned: bool,
}

/// Borrow entry ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowEntry {
    pub book_id: i32,
    pub user_id: i32,
    pub date_borrowed: NaiveDate,
    pub return_date: NaiveDate,
}

/// Borrow request posted to the frontend
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BorrowRequest {
    /// Frontend user ID
    pub user_id: i32,
    /// Loan length in days
    #[validate(range(min = 1, message = "Borrow duration must be at least one day"))]
    pub borrow_duration_days: i64,
}
