//! Library services
//!
//! Two cooperating services sharing this crate: the admin service owns the
//! book inventory and the authoritative borrow records, the frontend service
//! serves the public catalog and owns user sign-up. Each keeps its own
//! database and learns about the other's changes through domain events
//! exchanged over a broker.

use std::sync::Arc;

pub mod api;
pub mod borrowing;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod server;
pub mod services;
pub mod sweeper;
pub mod sync;

pub use config::{AppConfig, ServiceRole};
pub use error::{AppError, AppResult};

/// Application state shared across all handlers of one service
pub struct AppState<S> {
    pub config: Arc<AppConfig>,
    pub services: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(config: Arc<AppConfig>, services: S) -> Self {
        Self {
            config,
            services: Arc::new(services),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            services: self.services.clone(),
        }
    }
}

pub type AdminState = AppState<services::AdminServices>;
pub type FrontendState = AppState<services::FrontendServices>;
