//! In-process backend implementing every collaborator contract.
//!
//! `LocalHub` plays the part of both the broadcast service and the durable
//! entity table. Clones share state, so several sessions in one process can
//! see each other. Faults can be injected per capability to exercise the
//! engine's degradation paths.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};

use penguin_core::{Color, EntityId, Position};

use crate::backend::{Broadcaster, EntityStore, EventSource, InboundQueue, Subscription};
use crate::codec::{CodecKind, WireCodec};
use crate::error::TransportError;
use crate::message::{ChangeKind, DeletedRow, EntityRow, InboundMessage};

/// Capabilities that should fail until cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    pub broadcast: bool,
    pub persist: bool,
    pub snapshot: bool,
    pub register: bool,
}

#[derive(Debug, Clone)]
enum Filter {
    Broadcast { channel: String, event: String },
    ChangeFeed { table: String },
}

struct Subscriber {
    subscription: Subscription,
    filter: Filter,
    queue: InboundQueue,
}

#[derive(Default)]
struct HubState {
    rows: Vec<EntityRow>,
    next_entity: u64,
    next_subscription: u64,
    subscribers: Vec<Subscriber>,
    faults: Faults,
}

#[derive(Clone)]
pub struct LocalHub {
    table: String,
    codec: CodecKind,
    state: Arc<Mutex<HubState>>,
}

impl LocalHub {
    pub fn new(table: &str, codec: CodecKind) -> Self {
        info!("Initialized LocalHub for table '{}' ({:?} codec)", table, codec);
        Self {
            table: table.to_string(),
            codec,
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    pub fn inject_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    pub fn clear_faults(&self) {
        self.inject_faults(Faults::default());
    }

    pub fn row(&self, id: &EntityId) -> Option<EntityRow> {
        self.lock().rows.iter().find(|row| &row.id == id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // A panic while holding the lock cannot leave the rows half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_change(&self, state: &mut HubState, kind: ChangeKind, record: Vec<u8>) {
        let table = self.table.clone();
        state.subscribers.retain(|subscriber| match &subscriber.filter {
            Filter::ChangeFeed { table: wanted } if *wanted == table => subscriber
                .queue
                .send(InboundMessage::Change {
                    table: table.clone(),
                    kind,
                    record: record.clone(),
                })
                .is_ok(),
            _ => true,
        });
    }

    fn subscribe(&self, filter: Filter, queue: InboundQueue) -> Subscription {
        let mut state = self.lock();
        state.next_subscription += 1;
        let subscription = Subscription(state.next_subscription);
        debug!("Subscription {:?} registered for {:?}", subscription, filter);
        state.subscribers.push(Subscriber { subscription, filter, queue });
        subscription
    }
}

impl Broadcaster for LocalHub {
    fn broadcast(&self, channel: &str, event: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.faults.broadcast {
            return Err(TransportError::Unavailable(format!("broadcast on '{}' refused", channel)));
        }
        // Subscribers whose queue has been dropped are pruned as we go.
        state.subscribers.retain(|subscriber| match &subscriber.filter {
            Filter::Broadcast { channel: c, event: e } if c == channel && e == event => subscriber
                .queue
                .send(InboundMessage::Broadcast {
                    channel: channel.to_string(),
                    event: event.to_string(),
                    payload: payload.to_vec(),
                })
                .is_ok(),
            _ => true,
        });
        Ok(())
    }
}

impl EntityStore for LocalHub {
    fn register_entity(&self, username: &str, color: &Color, spawn: Position) -> Result<EntityId, TransportError> {
        let mut state = self.lock();
        if state.faults.register {
            return Err(TransportError::Unavailable("registration refused".to_string()));
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(TransportError::Rejected("username must not be empty".to_string()));
        }
        if !spawn.is_finite() {
            return Err(TransportError::Rejected(format!("spawn ({}, {}) is not a position", spawn.x, spawn.y)));
        }
        if state.rows.iter().any(|row| row.username == username) {
            return Err(TransportError::Rejected(format!("username '{}' is taken", username)));
        }

        state.next_entity += 1;
        let row = EntityRow {
            id: EntityId::new(state.next_entity.to_string()),
            username: username.to_string(),
            color: color.clone(),
            x_pos: spawn.x,
            y_pos: spawn.y,
        };
        let record = self.codec.codec().encode(&row)?;
        let id = row.id.clone();
        state.rows.push(row);
        self.emit_change(&mut state, ChangeKind::Insert, record);

        info!("Registered '{}' as entity {}", username, id);
        Ok(id)
    }

    fn list_other_entities(&self, exclude: &EntityId) -> Result<Vec<EntityRow>, TransportError> {
        let state = self.lock();
        if state.faults.snapshot {
            return Err(TransportError::Unavailable("snapshot read refused".to_string()));
        }
        Ok(state.rows.iter().filter(|row| &row.id != exclude).cloned().collect())
    }

    fn persist_position(&self, id: &EntityId, position: Position) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.faults.persist {
            return Err(TransportError::Unavailable("position update refused".to_string()));
        }
        // Updates are not part of the change feed; only inserts and deletes are.
        let row = state
            .rows
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or_else(|| TransportError::NotFound(id.to_string()))?;
        row.x_pos = position.x;
        row.y_pos = position.y;
        Ok(())
    }

    fn deregister_entity(&self, id: &EntityId) -> Result<(), TransportError> {
        let mut state = self.lock();
        let Some(index) = state.rows.iter().position(|row| &row.id == id) else {
            return Err(TransportError::NotFound(id.to_string()));
        };
        let removed = state.rows.remove(index);
        match self.codec.codec().encode(&DeletedRow { id: removed.id.clone() }) {
            Ok(record) => self.emit_change(&mut state, ChangeKind::Delete, record),
            Err(e) => error!("Failed to encode delete notification for {}: {}", id, e),
        }
        info!("Deregistered entity {} ('{}')", id, removed.username);
        Ok(())
    }
}

impl EventSource for LocalHub {
    fn subscribe_broadcast(&self, channel: &str, event: &str, queue: InboundQueue) -> Subscription {
        self.subscribe(
            Filter::Broadcast {
                channel: channel.to_string(),
                event: event.to_string(),
            },
            queue,
        )
    }

    fn subscribe_change_feed(&self, table: &str, queue: InboundQueue) -> Subscription {
        self.subscribe(Filter::ChangeFeed { table: table.to_string() }, queue)
    }

    fn unsubscribe(&self, subscription: Subscription) {
        let mut state = self.lock();
        state.subscribers.retain(|subscriber| subscriber.subscription != subscription);
    }
}
