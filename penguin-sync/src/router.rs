//! Classification and application of inbound events.
//!
//! Rules, independent of arrival order:
//! - the local entity never applies network feedback about itself;
//! - the first observation of an id fixes its color for good;
//! - a join for a known id and a leave for an unknown id are no-ops;
//! - a move for a known id only retargets, the interpolator does the rest.

use log::debug;

use penguin_core::{EntityId, EntitySnapshot, LocalEntity, MoveUpdate, Position, RemoteEntities, RemoteEntity, SyncEvent};
use penguin_transport::{ChangeKind, CodecKind, InboundMessage, WireCodec};

use crate::error::SyncError;

/// What applying an event did to the remote set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Created,
    Retargeted,
    Removed,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event is about the local entity.
    OwnEntity,
    /// Join for an id that is already present.
    AlreadyKnown,
    /// Leave for an id that is not present.
    UnknownEntity,
    /// Message for a channel, event or table this router does not handle.
    Unrouted,
}

pub struct EventRouter {
    channel: String,
    move_event: String,
    table: String,
    codec: Box<dyn WireCodec>,
}

impl EventRouter {
    pub fn new(channel: &str, move_event: &str, table: &str, codec: CodecKind) -> Self {
        Self {
            channel: channel.to_string(),
            move_event: move_event.to_string(),
            table: table.to_string(),
            codec: codec.codec(),
        }
    }

    /// Decode a raw notification. `Ok(None)` means it is not for us.
    pub fn classify(&self, message: &InboundMessage) -> Result<Option<SyncEvent>, SyncError> {
        match message {
            InboundMessage::Broadcast { channel, event, payload } => {
                if *channel != self.channel || *event != self.move_event {
                    return Ok(None);
                }
                let decoded = self
                    .codec
                    .decode_move(payload)
                    .map_err(|e| SyncError::malformed("move", e.to_string()))?;
                let position = validate("move", &decoded.id, decoded.position())?;
                Ok(Some(SyncEvent::Move(MoveUpdate {
                    id: decoded.id,
                    color: decoded.color,
                    position,
                })))
            }
            InboundMessage::Change { table, kind, record } => {
                if *table != self.table {
                    return Ok(None);
                }
                match kind {
                    ChangeKind::Insert => {
                        let row = self
                            .codec
                            .decode_row(record)
                            .map_err(|e| SyncError::malformed("join", e.to_string()))?;
                        let position = validate("join", &row.id, row.position())?;
                        Ok(Some(SyncEvent::Join(EntitySnapshot {
                            id: row.id,
                            color: row.color,
                            position,
                        })))
                    }
                    ChangeKind::Delete => {
                        let row = self
                            .codec
                            .decode_deleted(record)
                            .map_err(|e| SyncError::malformed("leave", e.to_string()))?;
                        if row.id.is_empty() {
                            return Err(SyncError::malformed("leave", "empty id"));
                        }
                        Ok(Some(SyncEvent::Leave(row.id)))
                    }
                }
            }
        }
    }

    /// Classify then apply. Malformed messages leave the remote set untouched.
    pub fn route(
        &self,
        message: &InboundMessage,
        local: &LocalEntity,
        remotes: &mut RemoteEntities,
    ) -> Result<Applied, SyncError> {
        match self.classify(message)? {
            Some(event) => Ok(self.apply(event, local, remotes)),
            None => Ok(Applied::Ignored(IgnoreReason::Unrouted)),
        }
    }

    pub fn apply(&self, event: SyncEvent, local: &LocalEntity, remotes: &mut RemoteEntities) -> Applied {
        let kind = event.kind();
        let id = event.entity_id().clone();
        let applied = match event {
            SyncEvent::Move(update) => self.apply_move(update, local, remotes),
            SyncEvent::Join(snapshot) => self.apply_join(snapshot, local, remotes),
            SyncEvent::Leave(id) => self.apply_leave(&id, remotes),
        };
        debug!("{} event for {}: {:?}", kind, id, applied);
        applied
    }

    pub fn apply_move(&self, update: MoveUpdate, local: &LocalEntity, remotes: &mut RemoteEntities) -> Applied {
        if local.is(&update.id) {
            return Applied::Ignored(IgnoreReason::OwnEntity);
        }
        if let Some(remote) = remotes.get_mut(&update.id) {
            // Color is deliberately not updated here.
            remote.target = update.position;
            return Applied::Retargeted;
        }
        remotes.insert_if_absent(RemoteEntity::new(update.id, update.color, update.position));
        Applied::Created
    }

    pub fn apply_join(&self, snapshot: EntitySnapshot, local: &LocalEntity, remotes: &mut RemoteEntities) -> Applied {
        if local.is(&snapshot.id) {
            return Applied::Ignored(IgnoreReason::OwnEntity);
        }
        if remotes.insert_if_absent(RemoteEntity::new(snapshot.id, snapshot.color, snapshot.position)) {
            Applied::Created
        } else {
            Applied::Ignored(IgnoreReason::AlreadyKnown)
        }
    }

    pub fn apply_leave(&self, id: &EntityId, remotes: &mut RemoteEntities) -> Applied {
        match remotes.remove(id) {
            Some(_) => Applied::Removed,
            None => Applied::Ignored(IgnoreReason::UnknownEntity),
        }
    }
}

fn validate(kind: &'static str, id: &EntityId, position: Position) -> Result<Position, SyncError> {
    if id.is_empty() {
        return Err(SyncError::malformed(kind, "empty id"));
    }
    if !position.is_finite() {
        return Err(SyncError::malformed(kind, format!("non-finite position for {}", id)));
    }
    Ok(position)
}
