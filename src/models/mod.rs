//! Data models for the library services

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{normalize_title, Book, BookFilter, BorrowedBook, CatalogBook, CreateBook, NewBook};
pub use loan::{BorrowEntry, BorrowRequest, NewBorrowEntry};
pub use user::{CreateUser, NewUser, UpdateUser, User, UserBooks};
