use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::message::{DeletedRow, EntityRow, MovePayload};

/// Error types for wire encoding and decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary codec error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Which wire format a codec speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecKind {
    #[default]
    Json,
    Binary,
}

impl CodecKind {
    pub fn codec(self) -> Box<dyn WireCodec> {
        match self {
            CodecKind::Json => Box::new(JsonCodec),
            CodecKind::Binary => Box::new(BinaryCodec),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            CodecKind::Json => Ok(serde_json::from_slice(bytes)?),
            CodecKind::Binary => Ok(bincode::deserialize(bytes)?),
        }
    }
}

/// Records that can go on the wire
pub trait WireRecord {
    fn to_json(&self) -> Result<Vec<u8>, CodecError>;
    fn to_binary(&self) -> Result<Vec<u8>, CodecError>;
}

impl<T: Serialize + ?Sized> WireRecord for T {
    fn to_json(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Json)
    }

    fn to_binary(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(CodecError::Binary)
    }
}

/// Object-safe codec used by the hub and the event router.
pub trait WireCodec: Send + Sync {
    fn kind(&self) -> CodecKind;

    fn encode(&self, record: &dyn WireRecord) -> Result<Vec<u8>, CodecError>;

    fn decode_move(&self, bytes: &[u8]) -> Result<MovePayload, CodecError> {
        self.kind().decode(bytes)
    }

    fn decode_row(&self, bytes: &[u8]) -> Result<EntityRow, CodecError> {
        self.kind().decode(bytes)
    }

    fn decode_deleted(&self, bytes: &[u8]) -> Result<DeletedRow, CodecError> {
        self.kind().decode(bytes)
    }
}

/// JSON codec, matching what a browser client would send
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Json
    }

    fn encode(&self, record: &dyn WireRecord) -> Result<Vec<u8>, CodecError> {
        record.to_json()
    }
}

/// Binary codec using bincode
pub struct BinaryCodec;

impl WireCodec for BinaryCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Binary
    }

    fn encode(&self, record: &dyn WireRecord) -> Result<Vec<u8>, CodecError> {
        record.to_binary()
    }
}
