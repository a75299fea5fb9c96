//! Managed-storage bridge backed by a local folder.
//!
//! A session writes into a hidden `.pending-*` file; finishing renames it to a
//! collision-free visible name, the same way a media store flips its pending flag.

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

use super::{relative_path, ScopedStorageBridge, SessionToken};
use crate::error::BridgeError;
use crate::naming::{resolve_available_name, NameProbe};

const PENDING_PREFIX: &str = ".pending-";

#[derive(Debug, Clone)]
struct PendingFile {
    pending: PathBuf,
    folder: PathBuf,
    display_name: String,
    mime_type: String,
}

#[derive(Debug)]
pub struct StagingScopedBridge {
    root: PathBuf,
    sessions: Mutex<HashMap<String, PendingFile>>,
}

struct FolderProbe<'a>(&'a Path);

#[async_trait]
impl<'a> NameProbe for FolderProbe<'a> {
    async fn exists(&self, name: &str) -> Result<bool, BridgeError> {
        Ok(tokio::fs::try_exists(self.0.join(name)).await?)
    }
}

impl StagingScopedBridge {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, PendingFile>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pending(&self, session: &SessionToken) -> Result<PendingFile, BridgeError> {
        self.sessions()
            .get(&session.0)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownSession(session.0.clone()))
    }

    /// Number of sessions begun but not finished
    pub fn open_sessions(&self) -> usize {
        self.sessions().len()
    }
}

#[async_trait]
impl ScopedStorageBridge for StagingScopedBridge {
    async fn begin_session(
        &self,
        filename: &str,
        mime_type: &str,
        sub_folder: &str,
    ) -> Result<SessionToken, BridgeError> {
        let name = relative_path(filename)?;
        if name.components().count() != 1 {
            return Err(BridgeError::InvalidPath(filename.to_string()));
        }

        let sub_folder = sub_folder.trim_end_matches('/');
        let folder = if sub_folder.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative_path(sub_folder)?)
        };
        tokio::fs::create_dir_all(&folder).await?;

        let id = Ulid::new().to_string();
        let pending = folder.join(format!("{}{}", PENDING_PREFIX, id));
        File::create(&pending).await?;

        let token = SessionToken(format!("staging://{}/{}", sub_folder, id));
        info!(
            "scoped_begin: {} name={} type={}",
            token, filename, mime_type
        );
        self.sessions().insert(
            token.0.clone(),
            PendingFile {
                pending,
                folder,
                display_name: filename.to_string(),
                mime_type: mime_type.to_string(),
            },
        );
        Ok(token)
    }

    async fn write_chunk(
        &self,
        session: &SessionToken,
        data: Bytes,
        append: bool,
    ) -> Result<(), BridgeError> {
        let pending = self.pending(session)?;
        let mut file = if append {
            OpenOptions::new().append(true).open(&pending.pending).await?
        } else {
            File::create(&pending.pending).await?
        };
        file.write_all(&data).await?;
        file.flush().await?;
        debug!(
            "scoped_write: {} bytes={} append={}",
            session,
            data.len(),
            append
        );
        Ok(())
    }

    async fn finish_session(&self, session: &SessionToken) -> Result<String, BridgeError> {
        let pending = self.pending(session)?;
        let final_name =
            resolve_available_name(&FolderProbe(&pending.folder), &pending.display_name).await?;
        tokio::fs::rename(&pending.pending, pending.folder.join(&final_name)).await?;
        self.sessions().remove(&session.0);
        info!(
            "scoped_finish: {} name={} type={}",
            session, final_name, pending.mime_type
        );
        Ok(final_name)
    }

    async fn abort_session(&self, session: &SessionToken) -> Result<(), BridgeError> {
        let removed = self.sessions().remove(&session.0);
        let Some(pending) = removed else {
            return Err(BridgeError::UnknownSession(session.0.clone()));
        };
        match tokio::fs::remove_file(&pending.pending).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("scoped_abort: {} name={}", session, pending.display_name);
        Ok(())
    }
}
