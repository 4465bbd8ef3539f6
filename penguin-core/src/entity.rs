use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Position;

/// Identifier issued by the entity store at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id never names a real participant.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::new(id)
    }
}

/// Visual tag carried in every outgoing update, e.g. `"blue"` or `"#ff8800"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(color: impl Into<String>) -> Self {
        Color(color.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::new("blue")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(color: &str) -> Self {
        Color::new(color)
    }
}

/// The entity this process owns and moves.
#[derive(Debug, Clone)]
pub struct LocalEntity {
    id: Option<EntityId>,
    username: String,
    color: Color,
    pub position: Position,
}

impl LocalEntity {
    pub fn new(username: impl Into<String>, color: Color, position: Position) -> Self {
        LocalEntity {
            id: None,
            username: username.into(),
            color,
            position,
        }
    }

    /// `None` until registration completes.
    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    pub fn is(&self, id: &EntityId) -> bool {
        self.id.as_ref() == Some(id)
    }
}

/// Cached view of another participant. Never written back to the network.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntity {
    id: EntityId,
    color: Color,
    pub rendered: Position,
    pub target: Position,
}

impl RemoteEntity {
    /// A freshly observed entity is shown exactly where it was announced.
    pub fn new(id: EntityId, color: Color, position: Position) -> Self {
        RemoteEntity {
            id,
            color,
            rendered: position,
            target: position,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn at_target(&self) -> bool {
        self.rendered == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_entity_has_no_id_until_assigned() {
        let mut local = LocalEntity::new("pingu", Color::default(), Position::new(100.0, 100.0));
        assert!(local.id().is_none());
        assert!(!local.is(&EntityId::new("1")));

        local.assign_id(EntityId::new("1"));
        assert_eq!(local.id().map(EntityId::as_str), Some("1"));
        assert!(local.is(&EntityId::new("1")));
    }

    #[test]
    fn blank_ids_are_empty() {
        assert!(EntityId::new("").is_empty());
        assert!(EntityId::new("  ").is_empty());
        assert!(!EntityId::new("a").is_empty());
    }

    #[test]
    fn new_remote_starts_at_target() {
        let remote = RemoteEntity::new("A".into(), "red".into(), Position::new(50.0, 50.0));
        assert_eq!(remote.rendered, remote.target);
        assert!(remote.at_target());
    }
}
