//! Admin side: users and borrow requests coming from the frontend

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use validator::Validate;

use super::InboundHandler;
use crate::{
    error::{AppError, AppResult},
    events::{
        codec::decode_record,
        payloads::{BorrowRequestedRecord, UserCreatedRecord, UserUpdatedRecord},
        Topic,
    },
    models::NewUser,
    services::AdminServices,
};

pub struct AdminHandler {
    services: AdminServices,
}

impl AdminHandler {
    pub fn new(services: AdminServices) -> Self {
        Self { services }
    }

    async fn user_created(&self, record: UserCreatedRecord) -> AppResult<()> {
        let user = record.to_create_user();
        user.validate()?;

        let user = NewUser {
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            joined_on: record.joined_on,
        };
        match self.services.members.add_user(user).await {
            Ok(_) => Ok(()),
            Err(AppError::Conflict(msg)) => {
                tracing::debug!("Ignoring duplicate user-created record: {}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn user_updated(&self, record: UserUpdatedRecord) -> AppResult<()> {
        self.services
            .members
            .apply_update(&record.user_email, &record.changes())
            .await?;
        Ok(())
    }

    async fn borrow_requested(&self, record: BorrowRequestedRecord) -> AppResult<()> {
        self.services
            .inventory
            .borrow_book(
                &record.book_title,
                &record.user_email,
                record.borrow_duration_days,
                Utc::now().date_naive(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl InboundHandler for AdminHandler {
    async fn apply(&self, topic: Topic, record: Value) -> AppResult<()> {
        match topic {
            Topic::UserCreated => self.user_created(decode_record(record)?).await,
            Topic::UserUpdated => self.user_updated(decode_record(record)?).await,
            Topic::BorrowRequested => self.borrow_requested(decode_record(record)?).await,
            other => Err(AppError::BadRequest(format!(
                "Admin does not consume {} events",
                other
            ))),
        }
    }
}
