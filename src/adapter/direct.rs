use async_trait::async_trait;
use bytes::Bytes;
use chunked_write::{write_chunked, ChunkSink, ChunkWrite};
use log::info;
use std::sync::Arc;

use super::SaveLocation;
use crate::blob::Blob;
use crate::bridge::{BaseDir, FileBridge};
use crate::error::{BridgeError, SaveError};
use crate::naming::{resolve_available_name, BaseDirProbe};

/// Plain files under a fixed base directory (document dir, download folder)
#[derive(Clone)]
pub struct DirectPathAdapter {
    bridge: Arc<dyn FileBridge>,
    base: BaseDir,
    location_label: String,
    chunk_size: usize,
}

struct PathSink<'a> {
    bridge: &'a dyn FileBridge,
    base: BaseDir,
    path: &'a str,
}

#[async_trait]
impl<'a> ChunkSink for PathSink<'a> {
    type Error = BridgeError;

    async fn write_chunk(&self, chunk: ChunkWrite) -> Result<(), BridgeError> {
        self.bridge
            .write_file(self.path, self.base, chunk.data, chunk.append)
            .await
    }
}

impl DirectPathAdapter {
    pub fn new(
        bridge: Arc<dyn FileBridge>,
        base: BaseDir,
        location_label: &str,
        chunk_size: usize,
    ) -> Self {
        Self {
            bridge,
            base,
            location_label: location_label.to_string(),
            chunk_size,
        }
    }

    pub async fn save_blob(&self, filename: &str, blob: &Blob) -> Result<SaveLocation, SaveError> {
        let probe = BaseDirProbe {
            bridge: self.bridge.as_ref(),
            base: self.base,
        };
        let resolved = resolve_available_name(&probe, filename).await?;

        let sink = PathSink {
            bridge: self.bridge.as_ref(),
            base: self.base,
            path: &resolved,
        };
        let stats = write_chunked(blob.bytes(), self.chunk_size, &sink)
            .await
            .map_err(BridgeError::from)?;
        if blob.is_empty() {
            // No chunks were written; the file still has to exist
            self.bridge
                .write_file(&resolved, self.base, Bytes::new(), false)
                .await?;
        }

        info!(
            "direct_saved: {} -> {} chunks={} bytes={} base={}",
            filename, resolved, stats.chunks, stats.bytes, self.base
        );
        Ok(SaveLocation {
            location_label: self.location_label.clone(),
            saved_name: resolved,
        })
    }
}
