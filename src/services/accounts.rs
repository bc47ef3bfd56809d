//! Frontend user accounts, the point of creation for users

use std::sync::Arc;
use validator::Validate;

use super::publish_and_commit;
use crate::{
    error::{AppError, AppResult},
    events::{
        payloads::{UserCreatedRecord, UserUpdatedRecord},
        EventPublisher, Topic,
    },
    models::{CreateUser, NewUser, UpdateUser, User},
    repository::FrontendStore,
};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn FrontendStore>,
    events: Arc<dyn EventPublisher>,
}

impl AccountService {
    pub fn new(store: Arc<dyn FrontendStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Sign a user up and announce it to the admin
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.store.user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                user.email
            )));
        }

        let mut tx = self.store.begin().await?;
        let created = tx.insert_user(&NewUser::joining_now(user)).await?;

        let record = UserCreatedRecord::from(&created);
        publish_and_commit(tx, self.events.as_ref(), Topic::UserCreated, &[record]).await?;

        tracing::info!("Created user {} ({})", created.id, created.email);
        Ok(created)
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Partially update a user and forward the changes to the admin
    pub async fn update_user(&self, id: i32, changes: UpdateUser) -> AppResult<User> {
        changes.validate()?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        if changes.is_empty() {
            return Ok(user);
        }
        if let Some(ref email) = changes.email {
            if *email != user.email && self.store.user_by_email(email).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "User with email '{}' already exists",
                    email
                )));
            }
        }

        let updated = tx
            .update_user(user.id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        let record = UserUpdatedRecord::new(user.email, &changes);
        publish_and_commit(tx, self.events.as_ref(), Topic::UserUpdated, &[record]).await?;

        tracing::info!("Updated user {}", updated.id);
        Ok(updated)
    }
}
