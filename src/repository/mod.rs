//! Repository layer for database operations
//!
//! Each service owns its own schema. Writes go through a transaction handle
//! (`AdminTx`, `FrontendTx`) so that a service can publish an event before
//! committing and roll the write back when publishing fails. Dropping a
//! handle without committing rolls it back.

pub mod admin;
pub mod frontend;

pub use admin::{AdminStore, AdminTx, PgAdminStore};
pub use frontend::{FrontendStore, FrontendTx, PgFrontendStore};

use async_trait::async_trait;

use crate::error::{AppError, AppResult};

/// Commit/rollback half of a write transaction
#[async_trait]
pub trait StoreTx: Send {
    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Map a unique-constraint violation onto a conflict, pass anything else through
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(message()),
        other => AppError::Database(other),
    }
}
