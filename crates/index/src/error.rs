use thiserror::Error;

/// Errors produced by the track index and its persistence codec.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A track with this id is already present; nothing was written.
    #[error("id already exists: {0}")]
    DuplicateId(i64),
    /// No track with this id exists in the index.
    #[error("no such id found: {0}")]
    UnknownId(i64),
    /// Probe arrays must carry at least one frame each.
    #[error("insufficient length arrays")]
    EmptyProbe,
    /// Hash and toggle arrays must be the same length.
    #[error("hash array must be equal to toggle array length ({hashes} != {toggles})")]
    ProbeLengthMismatch { hashes: usize, toggles: usize },
    /// A toggle mask sets more bits than the configured expansion cap.
    #[error("toggle mask sets {popcount} bits, limit is {limit}")]
    ToggleTooWide { popcount: u32, limit: u32 },
    /// Snapshot stream carries an unsupported encoding version.
    #[error("unsupported encoding version {found}, expected {expected}")]
    EncodingVersion { found: u8, expected: u8 },
    /// Snapshot stream does not start with the expected type name.
    #[error("stream is not an AuScoutDS snapshot")]
    BadMagic,
    #[error("invalid lookup config: {0}")]
    InvalidConfig(String),
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for IndexError {
    fn from(e: bincode::error::EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for IndexError {
    fn from(e: bincode::error::DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}
