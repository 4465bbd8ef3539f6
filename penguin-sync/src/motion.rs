use penguin_core::{HeldDirections, Position, Viewport};

/// Turns held directions into a new local position.
///
/// Every held direction moves the entity by `step` along its axis and is
/// clamped to the viewport right away. Diagonals are not normalized, so
/// diagonal speed is `step * sqrt(2)`.
#[derive(Debug, Clone)]
pub struct LocalMotionController {
    step: f32,
    viewport: Viewport,
}

impl LocalMotionController {
    pub fn new(step: f32, viewport: Viewport) -> Self {
        Self { step, viewport }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn advance(&self, position: Position, held: HeldDirections) -> Position {
        if held.is_empty() {
            return position;
        }
        let Viewport { width, height } = self.viewport;
        let mut next = position;
        if held.up {
            next.y = (next.y - self.step).max(0.0);
        }
        if held.down {
            next.y = (next.y + self.step).min(height);
        }
        if held.left {
            next.x = (next.x - self.step).max(0.0);
        }
        if held.right {
            next.x = (next.x + self.step).min(width);
        }
        self.viewport.clamp(next)
    }
}
