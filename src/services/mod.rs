//! Business logic services

pub mod accounts;
pub mod catalog;
pub mod inventory;
pub mod members;

use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    events::{publish_records, EventPublisher, Topic},
    repository::{AdminStore, FrontendStore, StoreTx},
};

/// Container for the admin services
#[derive(Clone)]
pub struct AdminServices {
    pub inventory: inventory::InventoryService,
    pub members: members::MemberService,
}

impl AdminServices {
    pub fn new(store: Arc<dyn AdminStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            inventory: inventory::InventoryService::new(store.clone(), events),
            members: members::MemberService::new(store),
        }
    }
}

/// Container for the frontend services
#[derive(Clone)]
pub struct FrontendServices {
    pub catalog: catalog::CatalogService,
    pub accounts: accounts::AccountService,
}

impl FrontendServices {
    pub fn new(store: Arc<dyn FrontendStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone(), events.clone()),
            accounts: accounts::AccountService::new(store, events),
        }
    }
}

/// Publish `records` on `topic`, then commit `tx`. If the broker does not
/// accept the message the transaction is rolled back and the publish error
/// is returned.
pub(crate) async fn publish_and_commit<X, T>(
    tx: Box<X>,
    events: &dyn EventPublisher,
    topic: Topic,
    records: &[T],
) -> AppResult<()>
where
    X: StoreTx + ?Sized,
    T: Serialize + Sync,
{
    match publish_records(events, topic, records).await {
        Ok(()) => tx.commit().await,
        Err(e) => {
            tracing::error!("Failed to publish {} event, rolling back: {}", topic, e);
            if let Err(rollback) = tx.rollback().await {
                tracing::error!("Rollback failed: {}", rollback);
            }
            Err(e)
        }
    }
}
