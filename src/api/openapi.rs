//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, frontend, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Admin API",
        version = "1.0.0",
        description = "Inventory, borrow entries and mirrored users"
    ),
    paths(
        // Health
        health::health_status,
        // Books
        admin::list_books,
        admin::list_borrowed_books,
        admin::get_book,
        admin::add_book,
        admin::remove_book,
        // Borrows
        admin::list_due_borrows,
        admin::return_borrow,
        // Users
        admin::list_users,
        admin::list_users_with_books,
        admin::get_user,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::CreateBook,
            crate::models::BorrowedBook,
            crate::models::BorrowEntry,
            crate::models::User,
            crate::models::UserBooks,
            admin::UserBooksQuery,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book inventory"),
        (name = "borrows", description = "Borrow entries"),
        (name = "users", description = "Users mirrored from the frontend")
    )
)]
pub struct AdminApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Frontend API",
        version = "1.0.0",
        description = "Catalog browsing, borrowing and user accounts"
    ),
    paths(
        // Health
        health::health_status,
        // Books
        frontend::list_books,
        frontend::search_books,
        frontend::get_book,
        frontend::borrow_book,
        // Users
        frontend::create_user,
        frontend::get_user,
        frontend::update_user,
    ),
    components(
        schemas(
            crate::models::CatalogBook,
            crate::models::BookFilter,
            crate::models::BorrowRequest,
            crate::models::CreateUser,
            crate::models::UpdateUser,
            crate::models::User,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "users", description = "User accounts")
    )
)]
pub struct FrontendApiDoc;

/// Create the OpenAPI documentation router for a service
pub fn create_openapi_router<D: OpenApi>() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", D::openapi()))
}
