//! Native bridge calls the platform adapters are built on
//!
//! Two narrow call-and-response surfaces:
//! - [`FileBridge`]: existence checks and (appending) writes relative to a base directory
//! - [`ScopedStorageBridge`]: begin / write / finish (or abort) sessions against a managed storage area
//!
//! The local implementations back both with `tokio::fs` so the pipeline runs on desktop
//! shells and in tests without a platform bridge.

mod fs;
mod staging;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::BridgeError;

pub use fs::LocalFsBridge;
pub use staging::StagingScopedBridge;

/// Base directory a relative bridge path is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseDir {
    Document,
    Download,
}

impl std::fmt::Display for BaseDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseDir::Document => write!(f, "document"),
            BaseDir::Download => write!(f, "download"),
        }
    }
}

/// Session token issued by the managed storage area for one save
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait FileBridge: Send + Sync {
    async fn exists(&self, path: &str, base: BaseDir) -> Result<bool, BridgeError>;

    /// Write `data` to `path`, truncating unless `append` is set
    async fn write_file(
        &self,
        path: &str,
        base: BaseDir,
        data: Bytes,
        append: bool,
    ) -> Result<(), BridgeError>;
}

#[async_trait]
pub trait ScopedStorageBridge: Send + Sync {
    async fn begin_session(
        &self,
        filename: &str,
        mime_type: &str,
        sub_folder: &str,
    ) -> Result<SessionToken, BridgeError>;

    async fn write_chunk(
        &self,
        session: &SessionToken,
        data: Bytes,
        append: bool,
    ) -> Result<(), BridgeError>;

    /// Make the written file visible and return the display name the store gave it
    async fn finish_session(&self, session: &SessionToken) -> Result<String, BridgeError>;

    /// Drop an unfinished session and whatever it wrote
    async fn abort_session(&self, session: &SessionToken) -> Result<(), BridgeError>;
}

/// Reject anything that would escape the base directory
pub(crate) fn relative_path(path: &str) -> Result<PathBuf, BridgeError> {
    let candidate = Path::new(path);
    if path.is_empty() || path.contains('\0') {
        return Err(BridgeError::InvalidPath(path.to_string()));
    }
    let mut clean = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(BridgeError::InvalidPath(path.to_string())),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(BridgeError::InvalidPath(path.to_string()));
    }
    Ok(clean)
}
