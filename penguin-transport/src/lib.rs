//! Collaborator contracts, wire messages and an in-process backend.
//!
//! The sync engine never talks to a real pub/sub service or database. It
//! consumes the capabilities defined in [`backend`]; [`LocalHub`] provides all
//! of them in memory so sessions can run against each other in one process.

mod backend;
mod codec;
mod error;
mod hub;
mod message;

pub use self::backend::{Broadcaster, EntityStore, EventSource, InboundQueue, Subscription};
pub use self::codec::{BinaryCodec, CodecError, CodecKind, JsonCodec, WireCodec, WireRecord};
pub use self::error::TransportError;
pub use self::hub::{Faults, LocalHub};
pub use self::message::{ChangeKind, DeletedRow, EntityRow, InboundMessage, MovePayload};
