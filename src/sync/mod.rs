//! Event reconciler
//!
//! A background task that polls the service's consumer group on a fixed
//! interval and hands every record to an [`InboundHandler`]. Records are
//! applied one at a time, each in its own transaction: a failing record is
//! logged and skipped, the rest of the batch still goes through. A message is
//! acknowledged once all of its records have been tried.

pub mod admin;
pub mod frontend;

use async_trait::async_trait;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};

use crate::{
    config::ServiceRole,
    error::AppResult,
    events::{codec, EventSource, InboundMessage, Topic},
};

pub use admin::AdminHandler;
pub use frontend::FrontendHandler;

/// Applies the records of one service's inbound topics
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Apply a single record. Must be idempotent under redelivery.
    async fn apply(&self, topic: Topic, record: Value) -> AppResult<()>;
}

/// Outcome of one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub messages: usize,
    pub applied: usize,
    pub failed: usize,
}

pub struct Reconciler {
    role: ServiceRole,
    source: Arc<dyn EventSource>,
    handler: Arc<dyn InboundHandler>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        role: ServiceRole,
        source: Arc<dyn EventSource>,
        handler: Arc<dyn InboundHandler>,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            role,
            source,
            handler,
            poll_interval,
            poll_timeout,
        }
    }

    /// Fetch whatever is available and apply it. Never fails: errors are logged.
    pub async fn poll_once(&self) -> PollSummary {
        let mut summary = PollSummary::default();

        let messages = match self.source.poll(self.poll_timeout).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!("{} reconciler failed to poll: {}", self.role, e);
                return summary;
            }
        };

        for message in messages {
            summary.messages += 1;
            let (applied, failed) = self.handle_message(&message).await;
            summary.applied += applied;
            summary.failed += failed;

            if let Err(e) = self.source.ack(&message).await {
                tracing::error!("Failed to acknowledge {} message {}: {}", message.topic, message.id, e);
            }
        }

        if summary.messages > 0 {
            tracing::info!(
                messages = summary.messages,
                applied = summary.applied,
                failed = summary.failed,
                "{} reconciler poll complete",
                self.role
            );
        }
        summary
    }

    async fn handle_message(&self, message: &InboundMessage) -> (usize, usize) {
        let records = match codec::decode_batch(&message.payload) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Dropping malformed {} message {}: {}", message.topic, message.id, e);
                return (0, 1);
            }
        };

        let (mut applied, mut failed) = (0, 0);
        for (index, record) in records.into_iter().enumerate() {
            match self.handler.apply(message.topic, record).await {
                Ok(()) => applied += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        "Failed to apply record {} of {} message {}: {}",
                        index,
                        message.topic,
                        message.id,
                        e
                    );
                }
            }
        }
        (applied, failed)
    }

    /// Poll on every tick until `shutdown` fires. A poll already running when
    /// the signal arrives is finished before the subscription is closed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "{} reconciler started, polling every {:?}",
            self.role,
            self.poll_interval
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }
            self.poll_once().await;
        }

        if let Err(e) = self.source.close().await {
            tracing::warn!("Failed to close {} subscription: {}", self.role, e);
        }
        tracing::info!("{} reconciler stopped", self.role);
    }
}
