//! Cross-service domain events
//!
//! Every state change one service needs to tell the other about is published
//! as a single message on a named topic. A message value is always a JSON
//! array of records, so a consumer must be ready for multi-record batches.
//! Delivery is at-least-once and ordered per topic only.

pub mod codec;
pub mod payloads;
pub mod redis;

use async_trait::async_trait;
use serde::Serialize;
use std::{fmt, time::Duration};

use crate::{config::ServiceRole, error::AppResult};

/// Logical topics; literal names come from [`crate::config::TopicsConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    BookAdded,
    BookRemoved,
    BookReturned,
    UserCreated,
    UserUpdated,
    BorrowRequested,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::BookAdded,
        Topic::BookRemoved,
        Topic::BookReturned,
        Topic::UserCreated,
        Topic::UserUpdated,
        Topic::BorrowRequested,
    ];

    /// Topics consumed by a service, in the order they are applied within one poll
    pub fn inbound(role: ServiceRole) -> &'static [Topic] {
        match role {
            ServiceRole::Admin => &[Topic::UserCreated, Topic::UserUpdated, Topic::BorrowRequested],
            ServiceRole::Frontend => &[Topic::BookAdded, Topic::BookReturned, Topic::BookRemoved],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Topic::BookAdded => "book-added",
            Topic::BookRemoved => "book-removed",
            Topic::BookReturned => "book-returned",
            Topic::UserCreated => "user-created",
            Topic::UserUpdated => "user-updated",
            Topic::BorrowRequested => "borrow-requested",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Producing side of the broker
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one message and wait until the broker has accepted it
    async fn publish(&self, topic: Topic, payload: String) -> AppResult<()>;
}

/// Encode `records` as one message and publish it
pub async fn publish_records<T: Serialize + Sync>(
    publisher: &dyn EventPublisher,
    topic: Topic,
    records: &[T],
) -> AppResult<()> {
    let payload = codec::encode(records)?;
    publisher.publish(topic, payload).await
}

/// A message delivered to a consumer group member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    /// Broker-assigned id, used for acknowledgement
    pub id: String,
    pub payload: String,
}

/// Consuming side of the broker, bound to one consumer group
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the messages currently available on the subscribed topics,
    /// waiting at most `max_wait`. Messages of one topic keep broker order.
    async fn poll(&self, max_wait: Duration) -> AppResult<Vec<InboundMessage>>;

    /// Mark a message as processed for this group
    async fn ack(&self, message: &InboundMessage) -> AppResult<()>;

    /// Release broker connections
    async fn close(&self) -> AppResult<()>;
}
