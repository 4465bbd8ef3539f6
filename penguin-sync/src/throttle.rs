use std::time::{Duration, Instant};

use penguin_core::Position;

/// What was last sent, and when.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleState {
    /// `None` means nothing has been sent yet.
    pub last_sent_at: Option<Instant>,
    pub last_sent_position: Position,
}

/// Gate for outbound updates.
///
/// Opens when the position differs from the last one sent AND strictly more
/// than `window` has passed since the last send. Broadcast and persistence
/// share this one gate.
#[derive(Debug, Clone)]
pub struct UpdateThrottler {
    window: Duration,
    state: ThrottleState,
}

impl UpdateThrottler {
    /// A throttler that has never sent. `initial` is where the entity spawned,
    /// so an entity that never moves never sends.
    pub fn new(window: Duration, initial: Position) -> Self {
        Self {
            window,
            state: ThrottleState {
                last_sent_at: None,
                last_sent_position: initial,
            },
        }
    }

    /// A throttler that behaves as if `position` was sent at `at`.
    pub fn primed(window: Duration, at: Instant, position: Position) -> Self {
        Self {
            window,
            state: ThrottleState {
                last_sent_at: Some(at),
                last_sent_position: position,
            },
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> &ThrottleState {
        &self.state
    }

    pub fn should_send(&self, position: Position, now: Instant) -> bool {
        if position == self.state.last_sent_position {
            return false;
        }
        match self.state.last_sent_at {
            None => true,
            // A clock reading earlier than the last send counts as zero elapsed.
            Some(last) => now.saturating_duration_since(last) > self.window,
        }
    }

    /// Decide and, if the gate is open, record the send. Returns the position
    /// to emit.
    pub fn poll(&mut self, position: Position, now: Instant) -> Option<Position> {
        if !self.should_send(position, now) {
            return None;
        }
        self.record_send(position, now);
        Some(position)
    }

    fn record_send(&mut self, position: Position, now: Instant) {
        let at = match self.state.last_sent_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.state = ThrottleState {
            last_sent_at: Some(at),
            last_sent_position: position,
        };
    }
}
