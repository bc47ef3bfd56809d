//! Admin endpoints: inventory, borrow entries and mirrored users

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{Book, BorrowEntry, BorrowedBook, CreateBook, User, UserBooks},
    AdminState,
};

/// Query parameters for the users-with-books listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserBooksQuery {
    /// Also list books that have been returned (default true)
    #[serde(default = "include_returned_default")]
    pub include_returned: bool,
}

fn include_returned_default() -> bool {
    true
}

/// List all books
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    responses(
        (status = 200, description = "All books in the inventory", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<AdminState>) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.inventory.list_books().await?;
    Ok(Json(books))
}

/// List books that are currently borrowed
#[utoipa::path(
    get,
    path = "/api/books/borrowed",
    tag = "books",
    responses(
        (status = 200, description = "Borrowed books with their loan dates", body = Vec<BorrowedBook>)
    )
)]
pub async fn list_borrowed_books(State(state): State<AdminState>) -> AppResult<Json<Vec<BorrowedBook>>> {
    let books = state.services.inventory.list_borrowed().await?;
    Ok(Json(books))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<AdminState>, Path(id): Path<i32>) -> AppResult<Json<Book>> {
    let book = state.services.inventory.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the inventory
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book added", body = Book),
        (status = 400, description = "Invalid book", body = crate::error::ErrorResponse),
        (status = 409, description = "A book with this title already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AdminState>,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.inventory.add_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Remove a book from the inventory
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book removed", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book has not been returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_book(State(state): State<AdminState>, Path(id): Path<i32>) -> AppResult<Json<Book>> {
    let removed = state.services.inventory.remove_book(id).await?;
    Ok(Json(removed))
}

/// List unreturned borrow entries due today or earlier
#[utoipa::path(
    get,
    path = "/api/borrows/due",
    tag = "borrows",
    responses(
        (status = 200, description = "Due borrow entries", body = Vec<BorrowEntry>)
    )
)]
pub async fn list_due_borrows(State(state): State<AdminState>) -> AppResult<Json<Vec<BorrowEntry>>> {
    let entries = state.services.inventory.due_today().await?;
    Ok(Json(entries))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/api/borrows/{id}/return",
    tag = "borrows",
    params(
        ("id" = i32, Path, description = "Borrow entry ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = BorrowEntry),
        (status = 404, description = "Borrow entry not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Borrow entry already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_borrow(
    State(state): State<AdminState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowEntry>> {
    let entry = state.services.inventory.return_entry(id).await?;
    Ok(Json(entry))
}

/// List mirrored users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = Vec<User>)
    )
)]
pub async fn list_users(State(state): State<AdminState>) -> AppResult<Json<Vec<User>>> {
    let users = state.services.members.list_users().await?;
    Ok(Json(users))
}

/// List users together with the books they borrowed
#[utoipa::path(
    get,
    path = "/api/users/books",
    tag = "users",
    params(UserBooksQuery),
    responses(
        (status = 200, description = "Users with their borrowed books", body = Vec<UserBooks>)
    )
)]
pub async fn list_users_with_books(
    State(state): State<AdminState>,
    Query(query): Query<UserBooksQuery>,
) -> AppResult<Json<Vec<UserBooks>>> {
    let users = state.services.members.users_with_books(query.include_returned).await?;
    Ok(Json(users))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(State(state): State<AdminState>, Path(id): Path<i32>) -> AppResult<Json<User>> {
    let user = state.services.members.get_user(id).await?;
    Ok(Json(user))
}
