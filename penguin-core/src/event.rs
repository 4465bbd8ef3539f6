//! Classified inbound events, after decoding and validation.

use crate::{Color, EntityId, Position};

/// A position broadcast from another participant.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveUpdate {
    pub id: EntityId,
    pub color: Color,
    pub position: Position,
}

/// A participant row as announced by the durable store (join or snapshot).
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub color: Color,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Move(MoveUpdate),
    Join(EntitySnapshot),
    Leave(EntityId),
}

impl SyncEvent {
    pub fn entity_id(&self) -> &EntityId {
        match self {
            SyncEvent::Move(update) => &update.id,
            SyncEvent::Join(snapshot) => &snapshot.id,
            SyncEvent::Leave(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Move(_) => "move",
            SyncEvent::Join(_) => "join",
            SyncEvent::Leave(_) => "leave",
        }
    }
}
