//! Cluster bus: the publish/subscribe bridge that makes each instance's
//! in-process connection group behave as if it were global.
//!
//! Delivery contract is at-most-once, best effort, unordered across boards
//! and across instances. Publishing loops back to the publishing instance's
//! own subscriber, so local fanout and remote fanout go through the exact
//! same path; there is no separate "local broadcast" branch.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::broadcast;

use super::events::BoardEvent;

/// Capacity of the per-instance subscriber channel. Slow dispatchers lag
/// and lose events rather than backpressure the bus.
const BUS_CHANNEL_CAPACITY: usize = 1024;

/// Delay before re-establishing a dropped Redis pub/sub connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A board-scoped event channel shared by all server instances.
#[async_trait]
pub trait ClusterBus: Send + Sync {
    /// Send the event to every instance, including this one.
    async fn publish(&self, event: &BoardEvent) -> Result<(), BusError>;

    /// Receiver for every event published on the shared channel, locally
    /// originated events included.
    fn subscribe(&self) -> broadcast::Receiver<BoardEvent>;
}

/// Process-local bus for single-instance deployments and tests. Sharing one
/// `LoopbackBus` between several connection groups is exactly a multi-node
/// cluster with a perfect network.
pub struct LoopbackBus {
    sender: broadcast::Sender<BoardEvent>,
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CHANNEL_CAPACITY);
        Self { sender }
    }
}

#[async_trait]
impl ClusterBus for LoopbackBus {
    async fn publish(&self, event: &BoardEvent) -> Result<(), BusError> {
        // No subscribers yet is not an error; the event is simply lost,
        // matching the bus's best-effort contract.
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.sender.subscribe()
    }
}

/// Redis-backed bus. Events are published as JSON on a shared pub/sub
/// channel; a background task forwards incoming messages into the local
/// broadcast sender. Redis delivers a PUBLISH back to the publisher's own
/// subscription, which is what keeps delivery symmetric regardless of
/// origin.
pub struct RedisBus {
    conn: redis::aio::MultiplexedConnection,
    channel: String,
    local: broadcast::Sender<BoardEvent>,
}

impl RedisBus {
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self, BusError> {
        let channel = channel.into();
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        let (local, _) = broadcast::channel(BUS_CHANNEL_CAPACITY);

        tokio::spawn(forward_subscription(client, channel.clone(), local.clone()));

        Ok(Self {
            conn,
            channel,
            local,
        })
    }
}

#[async_trait]
impl ClusterBus for RedisBus {
    async fn publish(&self, event: &BoardEvent) -> Result<(), BusError> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(&self.channel, payload).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.local.subscribe()
    }
}

/// Pump Redis pub/sub messages into the local broadcast channel,
/// re-subscribing after connection loss. Events published while the
/// subscription is down are lost; viewers recover via their next fetch, so
/// there is no buffering or replay here.
async fn forward_subscription(
    client: redis::Client,
    channel: String,
    local: broadcast::Sender<BoardEvent>,
) {
    loop {
        let mut pubsub = match client.get_async_pubsub().await {
            Ok(ps) => ps,
            Err(e) => {
                tracing::warn!("cluster bus connect failed: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        if let Err(e) = pubsub.subscribe(&channel).await {
            tracing::warn!(channel = %channel, "cluster bus subscribe failed: {e}");
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        }

        tracing::info!(channel = %channel, "cluster bus subscription established");
        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("cluster bus payload not utf-8: {e}");
                    continue;
                }
            };
            match serde_json::from_str::<BoardEvent>(&payload) {
                Ok(event) => {
                    let _ = local.send(event);
                }
                Err(e) => tracing::warn!("cluster bus message rejected: {e}"),
            }
        }

        tracing::warn!(channel = %channel, "cluster bus subscription lost, reconnecting");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
