//! Frontend endpoints: catalog browsing, borrowing and sign-up

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{BookFilter, BorrowRequest, CatalogBook, CreateUser, UpdateUser, User},
    FrontendState,
};

/// List available books
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    responses(
        (status = 200, description = "Books that can be borrowed", body = Vec<CatalogBook>)
    )
)]
pub async fn list_books(State(state): State<FrontendState>) -> AppResult<Json<Vec<CatalogBook>>> {
    let books = state.services.catalog.list_available().await?;
    Ok(Json(books))
}

/// Search available books by title, category or publisher
#[utoipa::path(
    get,
    path = "/api/books/search",
    tag = "books",
    params(BookFilter),
    responses(
        (status = 200, description = "Matching available books", body = Vec<CatalogBook>)
    )
)]
pub async fn search_books(
    State(state): State<FrontendState>,
    Query(filter): Query<BookFilter>,
) -> AppResult<Json<Vec<CatalogBook>>> {
    let books = state.services.catalog.search(&filter).await?;
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
        (status = 200, description = "Book details", body = CatalogBook),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(State(state): State<FrontendState>, Path(id): Path<i32>) -> AppResult<Json<CatalogBook>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/api/books/{id}/borrow",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BorrowRequest,
    responses(
        (status = 200, description = "Borrow request recorded", body = CatalogBook),
        (status = 400, description = "Invalid borrow duration", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or user not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book already borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<FrontendState>,
    Path(id): Path<i32>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<Json<CatalogBook>> {
    let book = state.services.catalog.borrow(id, request).await?;
    Ok(Json(book))
}

/// Sign up a new user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid user", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<FrontendState>,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let created = state.services.accounts.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
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
pub async fn get_user(State(state): State<FrontendState>, Path(id): Path<i32>) -> AppResult<Json<User>> {
    let user = state.services.accounts.get_user(id).await?;
    Ok(Json(user))
}

/// Update a user (partial)
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid update", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<FrontendState>,
    Path(id): Path<i32>,
    Json(changes): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    let user = state.services.accounts.update_user(id, changes).await?;
    Ok(Json(user))
}
