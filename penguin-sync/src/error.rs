use std::fmt;

use penguin_core::Viewport;
use penguin_transport::TransportError;
use thiserror::Error;

/// Outbound calls made when the throttle gate opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOperation {
    Broadcast,
    Persist,
}

impl fmt::Display for SendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOperation::Broadcast => f.write_str("broadcast"),
            SendOperation::Persist => f.write_str("persist"),
        }
    }
}

/// Everything that can go wrong in a session. Only `Registration` and
/// `InvalidViewport` stop a session from starting.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Identity registration rejected: {0}")]
    Registration(#[source] TransportError),

    #[error("Viewport {width}x{height} is not usable")]
    InvalidViewport { width: f32, height: f32 },

    #[error("Initial entity list unavailable: {0}")]
    SnapshotRead(#[source] TransportError),

    #[error("Outbound {operation} failed: {source}")]
    Send {
        operation: SendOperation,
        #[source]
        source: TransportError,
    },

    #[error("Malformed {kind} event: {reason}")]
    MalformedEvent { kind: &'static str, reason: String },
}

impl SyncError {
    pub(crate) fn invalid_viewport(viewport: Viewport) -> Self {
        SyncError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        }
    }

    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        SyncError::MalformedEvent {
            kind,
            reason: reason.into(),
        }
    }
}
