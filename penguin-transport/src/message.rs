use serde::{Deserialize, Serialize};

use penguin_core::{Color, EntityId, Position};

/// Payload of a `move` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePayload {
    pub id: EntityId,
    pub color: Color,
    pub x: f32,
    pub y: f32,
}

impl MovePayload {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// One row of the durable entity table. Field names follow the table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: EntityId,
    #[serde(default)]
    pub username: String,
    pub color: Color,
    pub x_pos: f32,
    pub y_pos: f32,
}

impl EntityRow {
    pub fn position(&self) -> Position {
        Position::new(self.x_pos, self.y_pos)
    }
}

/// The old record carried by a delete notification; only the key is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedRow {
    pub id: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// A raw notification as delivered by a subscription, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Broadcast {
        channel: String,
        event: String,
        payload: Vec<u8>,
    },
    Change {
        table: String,
        kind: ChangeKind,
        record: Vec<u8>,
    },
}
