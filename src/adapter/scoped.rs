use async_trait::async_trait;
use chunked_write::{write_chunked, ChunkSink, ChunkWrite};
use log::{info, warn};
use std::sync::Arc;

use super::SaveLocation;
use crate::blob::Blob;
use crate::bridge::{ScopedStorageBridge, SessionToken};
use crate::error::{BridgeError, SaveError};

/// Managed public storage (media store style): begin a session, stream chunks, finish
#[derive(Clone)]
pub struct ScopedStorageAdapter {
    bridge: Arc<dyn ScopedStorageBridge>,
    sub_folder: String,
    location_label: String,
    chunk_size: usize,
}

struct SessionSink<'a> {
    bridge: &'a dyn ScopedStorageBridge,
    session: &'a SessionToken,
}

#[async_trait]
impl<'a> ChunkSink for SessionSink<'a> {
    type Error = BridgeError;

    async fn write_chunk(&self, chunk: ChunkWrite) -> Result<(), BridgeError> {
        self.bridge
            .write_chunk(self.session, chunk.data, chunk.append)
            .await
    }
}

impl ScopedStorageAdapter {
    pub fn new(
        bridge: Arc<dyn ScopedStorageBridge>,
        sub_folder: &str,
        location_label: &str,
        chunk_size: usize,
    ) -> Self {
        Self {
            bridge,
            sub_folder: sub_folder.to_string(),
            location_label: location_label.to_string(),
            chunk_size,
        }
    }

    pub async fn save_blob(&self, filename: &str, blob: &Blob) -> Result<SaveLocation, SaveError> {
        let session = self
            .bridge
            .begin_session(filename, blob.effective_mime_type(), &self.sub_folder)
            .await?;

        let sink = SessionSink {
            bridge: self.bridge.as_ref(),
            session: &session,
        };
        let stats = match write_chunked(blob.bytes(), self.chunk_size, &sink).await {
            Ok(stats) => stats,
            Err(e) => {
                // Best effort: the write error is what gets reported
                if let Err(abort_err) = self.bridge.abort_session(&session).await {
                    warn!("scoped_abort_failed: {} error={}", session, abort_err);
                }
                return Err(BridgeError::from(e).into());
            }
        };

        let saved_name = self.bridge.finish_session(&session).await?;

        info!(
            "scoped_saved: {} -> {} chunks={} bytes={} folder={}",
            filename, saved_name, stats.chunks, stats.bytes, self.sub_folder
        );
        Ok(SaveLocation {
            location_label: self.location_label.clone(),
            saved_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Begin(String, String, String),
        Write(usize, bool),
        Finish,
        Abort,
    }

    #[derive(Default)]
    struct ScriptedBridge {
        calls: Mutex<Vec<Call>>,
        fail_write: bool,
        store_name: Option<String>,
    }

    #[async_trait]
    impl ScopedStorageBridge for ScriptedBridge {
        async fn begin_session(
            &self,
            filename: &str,
            mime_type: &str,
            sub_folder: &str,
        ) -> Result<SessionToken, BridgeError> {
            self.calls.lock().unwrap().push(Call::Begin(
                filename.to_string(),
                mime_type.to_string(),
                sub_folder.to_string(),
            ));
            Ok(SessionToken("content://downloads/1".to_string()))
        }

        async fn write_chunk(
            &self,
            _session: &SessionToken,
            data: Bytes,
            append: bool,
        ) -> Result<(), BridgeError> {
            if self.fail_write {
                return Err(BridgeError::PermissionDenied("storage full".to_string()));
            }
            self.calls.lock().unwrap().push(Call::Write(data.len(), append));
            Ok(())
        }

        async fn finish_session(&self, _session: &SessionToken) -> Result<String, BridgeError> {
            self.calls.lock().unwrap().push(Call::Finish);
            Ok(self.store_name.clone().unwrap_or_else(|| "mix.mp3".to_string()))
        }

        async fn abort_session(&self, _session: &SessionToken) -> Result<(), BridgeError> {
            self.calls.lock().unwrap().push(Call::Abort);
            Ok(())
        }
    }

    #[tokio::test]
    async fn begins_streams_and_finishes_in_order() {
        let bridge = Arc::new(ScriptedBridge::default());
        let adapter = ScopedStorageAdapter::new(bridge.clone(), "Download", "Downloads", 4);

        let location = adapter
            .save_blob("mix.mp3", &Blob::new(vec![1u8; 10], ""))
            .await
            .unwrap();

        assert_eq!(
            location,
            SaveLocation {
                location_label: "Downloads".to_string(),
                saved_name: "mix.mp3".to_string(),
            }
        );
        assert_eq!(
            *bridge.calls.lock().unwrap(),
            vec![
                Call::Begin(
                    "mix.mp3".to_string(),
                    "application/octet-stream".to_string(),
                    "Download".to_string()
                ),
                Call::Write(4, false),
                Call::Write(4, true),
                Call::Write(2, true),
                Call::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn write_failure_aborts_instead_of_finishing() {
        let bridge = Arc::new(ScriptedBridge {
            fail_write: true,
            ..Default::default()
        });
        let adapter = ScopedStorageAdapter::new(bridge.clone(), "Download", "Downloads", 4);

        let err = adapter
            .save_blob("mix.mp3", &Blob::new(vec![1u8; 10], "audio/mpeg"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::SaveErrorKind::WriteFailed);
        let calls = bridge.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], Call::Abort);
        assert!(!calls.contains(&Call::Finish));
    }

    #[tokio::test]
    async fn reports_name_chosen_by_store() {
        let bridge = Arc::new(ScriptedBridge {
            store_name: Some("mix (1).mp3".to_string()),
            ..Default::default()
        });
        let adapter = ScopedStorageAdapter::new(bridge, "Download", "Downloads", 4);

        let location = adapter
            .save_blob("mix.mp3", &Blob::new(vec![1u8; 3], "audio/mpeg"))
            .await
            .unwrap();

        assert_eq!(location.saved_name, "mix (1).mp3");
    }
}
