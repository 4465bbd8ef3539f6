//! Capabilities the sync engine consumes from the outside world.

use crossbeam_channel::Sender as QueueSender;

use penguin_core::{Color, EntityId, Position};

use crate::error::TransportError;
use crate::message::{EntityRow, InboundMessage};

/// Producer half of a session's inbound queue. Subscriptions push into it;
/// the session drains it once per tick.
pub type InboundQueue = QueueSender<InboundMessage>;

/// Handle returned by [`EventSource`] subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

/// Best-effort, unordered publish to a named channel. No acknowledgement.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, channel: &str, event: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// The durable entity table.
pub trait EntityStore: Send + Sync {
    /// One-time identity registration. The row starts at `spawn`; returns the
    /// id assigned to it.
    fn register_entity(&self, username: &str, color: &Color, spawn: Position) -> Result<EntityId, TransportError>;

    /// Every row except `exclude`, read once at session start.
    fn list_other_entities(&self, exclude: &EntityId) -> Result<Vec<EntityRow>, TransportError>;

    /// Idempotent upsert of the entity's last known position.
    fn persist_position(&self, id: &EntityId, position: Position) -> Result<(), TransportError>;

    /// Best-effort removal on session end.
    fn deregister_entity(&self, id: &EntityId) -> Result<(), TransportError>;
}

/// Asynchronous notification producers. Delivery order across subscriptions
/// is not guaranteed.
pub trait EventSource: Send + Sync {
    fn subscribe_broadcast(&self, channel: &str, event: &str, queue: InboundQueue) -> Subscription;

    /// Inserts and deletes on `table`.
    fn subscribe_change_feed(&self, table: &str, queue: InboundQueue) -> Subscription;

    fn unsubscribe(&self, subscription: Subscription);
}
