//! Position synchronization engine.
//!
//! Each tick runs, in order:
//! 1. drain the inbound queue through the [`EventRouter`],
//! 2. [`LocalMotionController`] moves the local entity,
//! 3. [`UpdateThrottler`] decides whether to broadcast and persist,
//! 4. [`RemoteInterpolator`] walks every remote entity toward its target.
//!
//! [`SyncSession`] owns all of it.

mod error;
mod interpolate;
mod motion;
mod router;
mod session;
mod throttle;

pub use self::error::{SendOperation, SyncError};
pub use self::interpolate::{step_towards, RemoteInterpolator, SNAP_TOLERANCE};
pub use self::motion::LocalMotionController;
pub use self::router::{Applied, EventRouter, IgnoreReason};
pub use self::session::{Backend, SessionOptions, SyncSession, TickReport};
pub use self::throttle::{ThrottleState, UpdateThrottler};
