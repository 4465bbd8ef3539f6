use glam::Vec2;
use log::trace;

use penguin_core::{Position, RemoteEntities};

/// Slack on the snap comparison so accumulated `f32` error cannot cost an
/// extra tick. Far below anything visible.
pub const SNAP_TOLERANCE: f32 = 1e-3;

/// Move `rendered` at most `step` toward `target`, snapping exactly onto the
/// target once it is within one step.
pub fn step_towards(rendered: Position, target: Position, step: f32) -> Position {
    let from = Vec2::from(rendered);
    let offset = Vec2::from(target) - from;
    let distance = offset.length();
    // Looser than `distance <= step` on purpose. From (0,0) toward (30,40) at
    // step 5, f32 error after nine ticks can leave the remainder a few ulps
    // above 5.0; a strict comparison would then take an eleventh tick.
    if distance <= step + SNAP_TOLERANCE {
        return target;
    }
    Position::from(from + offset / distance * step)
}

/// Dead-reckoning interpolation of remote entities toward their last known
/// positions, at a fixed speed per tick.
#[derive(Debug, Clone)]
pub struct RemoteInterpolator {
    step: f32,
}

impl RemoteInterpolator {
    pub fn new(step: f32) -> Self {
        Self { step }
    }

    /// Advance every remote entity by one tick. Returns how many are still
    /// short of their target afterwards.
    pub fn advance(&self, remotes: &mut RemoteEntities) -> usize {
        let mut in_motion = 0;
        for remote in remotes.iter_mut() {
            if remote.at_target() {
                continue;
            }
            remote.rendered = step_towards(remote.rendered, remote.target, self.step);
            trace!("{} rendered at ({:.1}, {:.1})", remote.id(), remote.rendered.x, remote.rendered.y);
            if !remote.at_target() {
                in_motion += 1;
            }
        }
        in_motion
    }
}
