//! API handlers and routers for both services

pub mod admin;
pub mod frontend;
pub mod health;
pub mod openapi;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{AdminState, FrontendState};

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the admin router with all routes
pub fn create_admin_router(state: AdminState) -> Router {
    let expose_docs = state.config.server.expose_docs;

    let api = Router::new()
        .route("/health/status", get(health::health_status))
        // Books
        .route("/api/books", get(admin::list_books))
        .route("/api/books", post(admin::add_book))
        .route("/api/books/borrowed", get(admin::list_borrowed_books))
        .route("/api/books/:id", get(admin::get_book))
        .route("/api/books/:id", delete(admin::remove_book))
        // Borrows
        .route("/api/borrows/due", get(admin::list_due_borrows))
        .route("/api/borrows/:id/return", post(admin::return_borrow))
        // Users
        .route("/api/users", get(admin::list_users))
        .route("/api/users/books", get(admin::list_users_with_books))
        .route("/api/users/:id", get(admin::get_user))
        .with_state(state);

    finish(api, expose_docs.then(openapi::create_openapi_router::<openapi::AdminApiDoc>))
}

/// Create the frontend router with all routes
pub fn create_frontend_router(state: FrontendState) -> Router {
    let expose_docs = state.config.server.expose_docs;

    let api = Router::new()
        .route("/health/status", get(health::health_status))
        // Books
        .route("/api/books", get(frontend::list_books))
        .route("/api/books/search", get(frontend::search_books))
        .route("/api/books/:id", get(frontend::get_book))
        .route("/api/books/:id/borrow", post(frontend::borrow_book))
        // Users
        .route("/api/users", post(frontend::create_user))
        .route("/api/users/:id", get(frontend::get_user))
        .route("/api/users/:id", put(frontend::update_user))
        .with_state(state);

    finish(api, expose_docs.then(openapi::create_openapi_router::<openapi::FrontendApiDoc>))
}

fn finish(api: Router, docs: Option<Router>) -> Router {
    let router = match docs {
        Some(docs) => api.merge(docs),
        None => api,
    };
    router.layer(TraceLayer::new_for_http()).layer(cors())
}
