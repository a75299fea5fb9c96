//! Error taxonomy for the save pipeline

use serde::Serialize;
use thiserror::Error;

/// Coarse error kind surfaced to the host and carried by settled requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveErrorKind {
    PayloadUnavailable,
    FetchFailed,
    AdapterUnavailable,
    WriteFailed,
}

impl std::fmt::Display for SaveErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveErrorKind::PayloadUnavailable => write!(f, "payload-unavailable"),
            SaveErrorKind::FetchFailed => write!(f, "fetch-failed"),
            SaveErrorKind::AdapterUnavailable => write!(f, "adapter-unavailable"),
            SaveErrorKind::WriteFailed => write!(f, "write-failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("file data not available: {0}")]
    PayloadUnavailable(String),

    #[error("unable to fetch file: {0}")]
    FetchFailed(String),

    #[error("no platform adapter available")]
    AdapterUnavailable,

    #[error("write failed: {0}")]
    WriteFailed(#[from] BridgeError),
}

impl SaveError {
    pub fn kind(&self) -> SaveErrorKind {
        match self {
            SaveError::PayloadUnavailable(_) => SaveErrorKind::PayloadUnavailable,
            SaveError::FetchFailed(_) => SaveErrorKind::FetchFailed,
            SaveError::AdapterUnavailable => SaveErrorKind::AdapterUnavailable,
            SaveError::WriteFailed(_) => SaveErrorKind::WriteFailed,
        }
    }
}

/// Failure of a single native bridge call
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge unreachable: {0}")]
    Unreachable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unknown storage session: {0}")]
    UnknownSession(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("chunk {index} at offset {offset}: {message}")]
    Chunk {
        index: usize,
        offset: u64,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<chunked_write::ChunkError<BridgeError>> for BridgeError {
    fn from(err: chunked_write::ChunkError<BridgeError>) -> Self {
        match err {
            chunked_write::ChunkError::InvalidChunkSize => BridgeError::InvalidChunkSize,
            chunked_write::ChunkError::Sink {
                index,
                offset,
                source,
            } => BridgeError::Chunk {
                index,
                offset,
                message: source.to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
