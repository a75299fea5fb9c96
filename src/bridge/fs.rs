//! Plain filesystem bridge rooted at per-base directories

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{relative_path, BaseDir, FileBridge};
use crate::error::BridgeError;

#[derive(Debug, Clone, Default)]
pub struct LocalFsBridge {
    roots: HashMap<BaseDir, PathBuf>,
}

impl LocalFsBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: BaseDir, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(base, root.into());
        self
    }

    fn resolve(&self, path: &str, base: BaseDir) -> Result<PathBuf, BridgeError> {
        let root = self
            .roots
            .get(&base)
            .ok_or_else(|| BridgeError::Unreachable(format!("no {} directory configured", base)))?;
        Ok(root.join(relative_path(path)?))
    }
}

#[async_trait]
impl FileBridge for LocalFsBridge {
    async fn exists(&self, path: &str, base: BaseDir) -> Result<bool, BridgeError> {
        let full = self.resolve(path, base)?;
        Ok(tokio::fs::try_exists(&full).await?)
    }

    async fn write_file(
        &self,
        path: &str,
        base: BaseDir,
        data: Bytes,
        append: bool,
    ) -> Result<(), BridgeError> {
        let full = self.resolve(path, base)?;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = if append {
            OpenOptions::new().append(true).create(true).open(&full).await?
        } else {
            File::create(&full).await?
        };
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(
            "fs_write: {} bytes={} append={}",
            full.display(),
            data.len(),
            append
        );
        Ok(())
    }
}
