//! Redis Streams transport for domain events
//!
//! Each topic is one stream. Publishing is an `XADD` of a single `payload`
//! field; consuming goes through a consumer group with `XREADGROUP`, and a
//! message is acknowledged with `XACK` once its records have been handled.

use async_trait::async_trait;
use ::redis::{
    aio::{ConnectionManager, MultiplexedConnection},
    streams::{StreamMaxlen, StreamReadOptions, StreamReadReply},
    AsyncCommands, Client,
};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::sync::Mutex;

use super::{EventPublisher, EventSource, InboundMessage, Topic};
use crate::{
    config::{BrokerConfig, TopicsConfig},
    error::{AppError, AppResult},
};

const PAYLOAD_FIELD: &str = "payload";

/// Broker handle created once at startup and shared by the producer and the consumer
#[derive(Clone)]
pub struct RedisBroker {
    client: Client,
    publisher: ConnectionManager,
    topics: TopicsConfig,
    max_stream_len: usize,
}

impl RedisBroker {
    /// Connect to Redis and check the connection
    pub async fn connect(config: &BrokerConfig, topics: TopicsConfig) -> AppResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| AppError::Broker(format!("Failed to create Redis client: {}", e)))?;

        let mut publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| AppError::Broker(format!("Failed to connect to Redis: {}", e)))?;

        ::redis::cmd("PING")
            .query_async::<_, String>(&mut publisher)
            .await
            .map_err(|e| AppError::Broker(format!("Redis connection test failed: {}", e)))?;

        Ok(Self {
            client,
            publisher,
            topics,
            max_stream_len: config.max_stream_len,
        })
    }

    /// Join `group` as `consumer` on the given topics, creating streams and
    /// the group where they do not exist yet
    pub async fn subscribe(
        &self,
        subscriptions: &[Topic],
        group: &str,
        consumer: &str,
        batch_size: usize,
    ) -> AppResult<RedisSubscription> {
        // Blocking reads get a connection of their own
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Broker(format!("Failed to get Redis connection: {}", e)))?;

        for topic in subscriptions {
            let stream = self.topics.name(*topic);
            let created: Result<(), ::redis::RedisError> =
                conn.xgroup_create_mkstream(stream, group, "0").await;
            match created {
                Ok(()) => tracing::info!("Created consumer group {} on {}", group, stream),
                Err(e) if e.code() == Some("BUSYGROUP") => {
                    tracing::debug!("Consumer group {} already exists on {}", group, stream)
                }
                Err(e) => {
                    return Err(AppError::Broker(format!(
                        "Failed to create consumer group {} on {}: {}",
                        group, stream, e
                    )))
                }
            }
        }

        Ok(RedisSubscription {
            conn: Mutex::new(Some(conn)),
            topics: self.topics.clone(),
            subscriptions: subscriptions.to_vec(),
            group: group.to_string(),
            consumer: consumer.to_string(),
            batch_size: batch_size.max(1),
            recovering: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl EventPublisher for RedisBroker {
    async fn publish(&self, topic: Topic, payload: String) -> AppResult<()> {
        let stream = self.topics.name(topic);
        let mut conn = self.publisher.clone();

        let id: String = conn
            .xadd_maxlen(
                stream,
                StreamMaxlen::Approx(self.max_stream_len),
                "*",
                &[(PAYLOAD_FIELD, payload.as_str())],
            )
            .await
            .map_err(|e| AppError::Broker(format!("Failed to publish to {}: {}", stream, e)))?;

        tracing::debug!("Published {} message {}", topic, id);
        Ok(())
    }
}

/// Consumer group membership on a set of topics
pub struct RedisSubscription {
    conn: Mutex<Option<MultiplexedConnection>>,
    topics: TopicsConfig,
    subscriptions: Vec<Topic>,
    group: String,
    consumer: String,
    batch_size: usize,
    /// Set until our own pending (delivered, unacknowledged) entries are drained
    recovering: AtomicBool,
}

impl RedisSubscription {
    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.conn
            .lock()
            .await
            .clone()
            .ok_or_else(|| AppError::Broker("Subscription is closed".to_string()))
    }

    async fn read(&self, start_id: &str, block: Option<Duration>) -> AppResult<Vec<InboundMessage>> {
        let mut conn = self.connection().await?;

        let keys: Vec<&str> = self.subscriptions.iter().map(|t| self.topics.name(*t)).collect();
        let ids: Vec<&str> = vec![start_id; keys.len()];

        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(self.batch_size);
        if let Some(wait) = block {
            let millis = wait.as_millis().max(1);
            options = options.block(usize::try_from(millis).unwrap_or(usize::MAX));
        }

        let reply: Option<StreamReadReply> = conn
            .xread_options(keys.as_slice(), ids.as_slice(), &options)
            .await
            .map_err(|e| AppError::Broker(format!("Failed to read from consumer group {}: {}", self.group, e)))?;

        let mut messages = Vec::new();
        let Some(reply) = reply else {
            return Ok(messages);
        };

        // Apply topics in subscription order, whatever order the reply uses
        for topic in &self.subscriptions {
            for key in reply.keys.iter().filter(|k| self.topics.topic(&k.key) == Some(*topic)) {
                for entry in &key.ids {
                    messages.push(InboundMessage {
                        topic: *topic,
                        id: entry.id.clone(),
                        // Entries trimmed from the stream come back without fields
                        payload: entry.get::<String>(PAYLOAD_FIELD).unwrap_or_default(),
                    });
                }
            }
        }

        Ok(messages)
    }
}

#[async_trait]
impl EventSource for RedisSubscription {
    async fn poll(&self, max_wait: Duration) -> AppResult<Vec<InboundMessage>> {
        if self.recovering.load(Ordering::Acquire) {
            let pending = self.read("0", None).await?;
            if !pending.is_empty() {
                tracing::info!("Redelivering {} unacknowledged message(s)", pending.len());
                return Ok(pending);
            }
            self.recovering.store(false, Ordering::Release);
        }

        let block = (!max_wait.is_zero()).then_some(max_wait);
        self.read(">", block).await
    }

    async fn ack(&self, message: &InboundMessage) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let stream = self.topics.name(message.topic);
        let _: i64 = conn
            .xack(stream, &self.group, &[message.id.as_str()])
            .await
            .map_err(|e| AppError::Broker(format!("Failed to acknowledge {} on {}: {}", message.id, stream, e)))?;
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        if self.conn.lock().await.take().is_some() {
            tracing::info!("Closed subscription {} of group {}", self.consumer, self.group);
        }
        Ok(())
    }
}
