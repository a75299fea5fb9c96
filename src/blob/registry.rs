//! Blob registry - keeps payloads resolvable by token, with grace-period eviction on release

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use super::{Blob, BlobHandle, BLOB_SCHEME};

const ORIGIN: &str = "webview-save";

struct Entry {
    blob: Blob,
    /// Pending eviction, set once the host releases the handle
    eviction: Option<CancellationToken>,
}

struct Inner {
    grace: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let entries = self.entries.get_mut().unwrap_or_else(|e| e.into_inner());
        for entry in entries.values() {
            if let Some(token) = &entry.eviction {
                token.cancel();
            }
        }
    }
}

/// Registry of in-memory payloads addressed by `blob:` tokens.
///
/// Cloning shares the same map. Nothing here fails: an unknown or evicted token
/// simply resolves to `None`.
#[derive(Clone)]
pub struct BlobRegistry {
    inner: Arc<Inner>,
}

impl BlobRegistry {
    pub fn new(grace: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                grace,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn grace(&self) -> Duration {
        self.inner.grace
    }

    /// Store a payload and mint a fresh token for it
    pub fn register(&self, blob: Blob) -> BlobHandle {
        let token = format!("{}{}/{}", BLOB_SCHEME, ORIGIN, Ulid::new());
        debug!(
            "blob_register: {} bytes={} type={}",
            token,
            blob.len(),
            blob.mime_type()
        );
        self.inner.entries().insert(
            token.clone(),
            Entry {
                blob,
                eviction: None,
            },
        );
        BlobHandle(token)
    }

    pub fn resolve(&self, handle: &BlobHandle) -> Option<Blob> {
        self.resolve_str(handle.as_str())
    }

    pub fn resolve_str(&self, token: &str) -> Option<Blob> {
        self.inner.entries().get(token).map(|entry| entry.blob.clone())
    }

    pub fn contains(&self, handle: &BlobHandle) -> bool {
        self.inner.entries().contains_key(handle.as_str())
    }

    /// Schedule removal after the grace period.
    ///
    /// A save that started just before the release can still resolve the payload
    /// until the grace period elapses. Releasing an already released or unknown
    /// handle does nothing.
    pub fn release(&self, handle: &BlobHandle) {
        let token = {
            let mut entries = self.inner.entries();
            let Some(entry) = entries.get_mut(handle.as_str()) else {
                debug!("blob_release: {} unknown", handle);
                return;
            };
            if entry.eviction.is_some() {
                return;
            }
            let token = CancellationToken::new();
            entry.eviction = Some(token.clone());
            token
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("blob_release: {} no runtime, evicting now", handle);
            self.inner.entries().remove(handle.as_str());
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let key = handle.as_str().to_string();
        let deadline = tokio::time::Instant::now() + self.inner.grace;
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.entries().remove(&key);
                        debug!("blob_evicted: {}", key);
                    }
                }
            }
        });
    }

    /// Drop every entry immediately, cancelling pending evictions
    pub fn clear(&self) {
        let mut entries = self.inner.entries();
        for entry in entries.values() {
            if let Some(token) = &entry.eviction {
                token.cancel();
            }
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for BlobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobRegistry")
            .field("grace", &self.inner.grace)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BlobRegistry {
        BlobRegistry::new(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn register_then_resolve_returns_same_payload() {
        let registry = registry();
        let blob = Blob::new(vec![7u8; 64], "audio/flac");

        let handle = registry.register(blob.clone());

        assert!(handle.as_str().starts_with("blob:webview-save/"));
        assert_eq!(registry.resolve(&handle), Some(blob));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn handles_are_unique() {
        let registry = registry();
        let a = registry.register(Blob::new(vec![1u8], ""));
        let b = registry.register(Blob::new(vec![1u8], ""));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn unknown_handle_is_a_miss() {
        let registry = registry();
        assert_eq!(registry.resolve_str("blob:elsewhere/nope"), None);
        registry.release(&BlobHandle::from("blob:elsewhere/nope"));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn released_handle_survives_grace_period_then_evicts() {
        let registry = registry();
        let handle = registry.register(Blob::new(vec![9u8; 8], "image/png"));

        registry.release(&handle);
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(registry.resolve(&handle).is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(registry.resolve(&handle).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_release_does_not_extend_grace() {
        let registry = registry();
        let handle = registry.register(Blob::new(vec![1u8], ""));

        registry.release(&handle);
        tokio::time::sleep(Duration::from_secs(20)).await;
        registry.release(&handle);
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(!registry.contains(&handle));
    }

    #[tokio::test(start_paused = true)]
    async fn unreleased_handles_stay_forever() {
        let registry = registry();
        let handle = registry.register(Blob::new(vec![1u8], ""));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(registry.contains(&handle));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_evictions() {
        let registry = registry();
        let released = registry.register(Blob::new(vec![1u8], ""));
        registry.release(&released);
        registry.clear();
        assert!(registry.is_empty());

        let fresh = registry.register(Blob::new(vec![2u8], ""));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(registry.contains(&fresh));
    }

    #[test]
    fn release_without_runtime_evicts_immediately() {
        let registry = registry();
        let handle = registry.register(Blob::new(vec![1u8], ""));
        registry.release(&handle);
        assert!(!registry.contains(&handle));
    }
}
