//! Book availability state machine
//!
//! A book cycles between `Available` and `Borrowed`; there is no terminal
//! state. The admin derives the state from the presence of an unreturned
//! borrow entry, the frontend from its cached `is_borrowed` flag. Both
//! services go through the transitions below so that an illegal move is
//! always reported as the same [`AppError::Conflict`].

use chrono::{Days, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    models::BorrowEntry,
};

pub const ALREADY_BORROWED: &str = "Book already borrowed";
pub const NOT_BORROWED: &str = "Book is not borrowed";
pub const NOT_RETURNED: &str = "Cannot remove book that has not been returned";
pub const ALREADY_RETURNED: &str = "Borrow entry already returned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Borrowed,
}

impl Availability {
    /// Admin view: borrowed while an unreturned entry exists
    pub fn from_open_entry(entry: Option<&BorrowEntry>) -> Self {
        match entry {
            Some(e) if !e.is_returned => Availability::Borrowed,
            _ => Availability::Available,
        }
    }

    /// Frontend view: the cached flag
    pub fn from_flag(is_borrowed: bool) -> Self {
        if is_borrowed {
            Availability::Borrowed
        } else {
            Availability::Available
        }
    }

    pub fn is_borrowed(self) -> bool {
        self == Availability::Borrowed
    }

    /// AVAILABLE -> BORROWED
    pub fn borrow(self) -> AppResult<Availability> {
        match self {
            Availability::Available => Ok(Availability::Borrowed),
            Availability::Borrowed => Err(AppError::Conflict(ALREADY_BORROWED.to_string())),
        }
    }

    /// BORROWED -> AVAILABLE
    pub fn give_back(self) -> AppResult<Availability> {
        match self {
            Availability::Borrowed => Ok(Availability::Available),
            Availability::Available => Err(AppError::Conflict(NOT_BORROWED.to_string())),
        }
    }

    /// Removal is only legal while available
    pub fn ensure_removable(self) -> AppResult<()> {
        match self {
            Availability::Available => Ok(()),
            Availability::Borrowed => Err(AppError::Conflict(NOT_RETURNED.to_string())),
        }
    }
}

/// Due date of a loan starting on `from` and lasting `duration_days`
pub fn due_date(from: NaiveDate, duration_days: i64) -> AppResult<NaiveDate> {
    if duration_days < 1 {
        return Err(AppError::BadRequest(
            "Borrow duration must be at least one day".to_string(),
        ));
    }
    u64::try_from(duration_days)
        .ok()
        .and_then(|days| from.checked_add_days(Days::new(days)))
        .ok_or_else(|| AppError::BadRequest(format!("Borrow duration of {} days is too long", duration_days)))
}
