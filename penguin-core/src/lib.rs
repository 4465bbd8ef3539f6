use serde::{Deserialize, Serialize};

pub mod entity;
pub mod event;
pub mod input;
pub mod world;

pub use entity::{Color, EntityId, LocalEntity, RemoteEntity};
pub use event::{EntitySnapshot, MoveUpdate, SyncEvent};
pub use input::{Direction, HeldDirections};
pub use world::RemoteEntities;

// Position in screen space: x grows right, y grows down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        glam::Vec2::from(*self).distance(glam::Vec2::from(*other))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Position> for glam::Vec2 {
    fn from(pos: Position) -> Self {
        glam::Vec2::new(pos.x, pos.y)
    }
}

impl From<glam::Vec2> for Position {
    fn from(v: glam::Vec2) -> Self {
        Position { x: v.x, y: v.y }
    }
}

/// The active viewport. Local positions are always kept inside
/// `[0, width] x [0, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Saturating clamp of both axes into the viewport. Never panics; on an
    /// unusable viewport the result is only guaranteed to be non-negative.
    pub fn clamp(&self, pos: Position) -> Position {
        Position {
            x: pos.x.min(self.width).max(0.0),
            y: pos.y.min(self.height).max(0.0),
        }
    }

    pub fn contains(&self, pos: &Position) -> bool {
        (0.0..=self.width).contains(&pos.x) && (0.0..=self.height).contains(&pos.y)
    }
}
