use thiserror::Error;

use crate::codec::CodecError;

/// Failures reported by a backend collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The backend refused the request (e.g. a duplicate username).
    #[error("Request rejected: {0}")]
    Rejected(String),
    /// The backend could not be reached or is refusing service.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// No row exists for the given id.
    #[error("No entity with id '{0}'")]
    NotFound(String),
    /// Encoding or decoding a wire record failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
