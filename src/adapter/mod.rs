//! Platform adapters - one storage strategy per runtime platform, chosen once at startup

mod direct;
mod scoped;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blob::Blob;
use crate::bridge::{BaseDir, FileBridge, ScopedStorageBridge};
use crate::config::SaveConfig;
use crate::error::SaveError;

pub use direct::DirectPathAdapter;
pub use scoped::ScopedStorageAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Android => write!(f, "android"),
            Platform::Ios => write!(f, "ios"),
            Platform::Desktop => write!(f, "desktop"),
        }
    }
}

/// Where a save landed, as reported by the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLocation {
    pub location_label: String,
    pub saved_name: String,
}

/// Bridges the host made available; an adapter is only selectable if its bridge is present
#[derive(Clone, Default)]
pub struct PlatformBridges {
    pub file: Option<Arc<dyn FileBridge>>,
    pub scoped: Option<Arc<dyn ScopedStorageBridge>>,
}

#[derive(Clone)]
pub enum PlatformAdapter {
    ScopedStorage(ScopedStorageAdapter),
    DirectPath(DirectPathAdapter),
}

impl PlatformAdapter {
    /// Pick the adapter for `platform`, or `None` when its bridge is missing
    pub fn select(
        platform: Platform,
        bridges: &PlatformBridges,
        config: &SaveConfig,
    ) -> Option<Self> {
        match platform {
            Platform::Android => bridges.scoped.clone().map(|bridge| {
                PlatformAdapter::ScopedStorage(ScopedStorageAdapter::new(
                    bridge,
                    &config.scoped_sub_folder,
                    &config.scoped_location_label,
                    config.scoped_chunk_size,
                ))
            }),
            Platform::Ios => bridges.file.clone().map(|bridge| {
                PlatformAdapter::DirectPath(DirectPathAdapter::new(
                    bridge,
                    BaseDir::Document,
                    &config.direct_location_label,
                    config.direct_chunk_size,
                ))
            }),
            Platform::Desktop => bridges.file.clone().map(|bridge| {
                PlatformAdapter::DirectPath(DirectPathAdapter::new(
                    bridge,
                    BaseDir::Download,
                    &config.direct_location_label,
                    config.direct_chunk_size,
                ))
            }),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PlatformAdapter::ScopedStorage(_) => "scoped-storage",
            PlatformAdapter::DirectPath(_) => "direct-path",
        }
    }

    pub async fn save_blob(&self, filename: &str, blob: &Blob) -> Result<SaveLocation, SaveError> {
        match self {
            PlatformAdapter::ScopedStorage(adapter) => adapter.save_blob(filename, blob).await,
            PlatformAdapter::DirectPath(adapter) => adapter.save_blob(filename, blob).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{LocalFsBridge, StagingScopedBridge};

    fn bridges(dir: &std::path::Path) -> PlatformBridges {
        PlatformBridges {
            file: Some(Arc::new(
                LocalFsBridge::new()
                    .with_base(BaseDir::Document, dir.join("docs"))
                    .with_base(BaseDir::Download, dir.join("downloads")),
            )),
            scoped: Some(Arc::new(StagingScopedBridge::new(dir.join("media")))),
        }
    }

    #[test]
    fn selection_follows_platform() {
        let dir = tempfile::tempdir().unwrap();
        let config = SaveConfig::default();
        let bridges = bridges(dir.path());

        let android = PlatformAdapter::select(Platform::Android, &bridges, &config).unwrap();
        let ios = PlatformAdapter::select(Platform::Ios, &bridges, &config).unwrap();
        let desktop = PlatformAdapter::select(Platform::Desktop, &bridges, &config).unwrap();

        assert_eq!(android.kind_name(), "scoped-storage");
        assert_eq!(ios.kind_name(), "direct-path");
        assert_eq!(desktop.kind_name(), "direct-path");
    }

    #[test]
    fn missing_bridge_means_no_adapter() {
        let config = SaveConfig::default();
        let none = PlatformBridges::default();
        assert!(PlatformAdapter::select(Platform::Android, &none, &config).is_none());
        assert!(PlatformAdapter::select(Platform::Desktop, &none, &config).is_none());
    }

    #[tokio::test]
    async fn ios_adapter_writes_into_documents() {
        let dir = tempfile::tempdir().unwrap();
        let adapter =
            PlatformAdapter::select(Platform::Ios, &bridges(dir.path()), &SaveConfig::default())
                .unwrap();

        let location = adapter
            .save_blob("cover.jpg", &Blob::new(vec![0xFFu8, 0xD8], "image/jpeg"))
            .await
            .unwrap();

        assert_eq!(location.location_label, "Files");
        assert_eq!(location.saved_name, "cover.jpg");
        assert_eq!(
            std::fs::read(dir.path().join("docs/cover.jpg")).unwrap(),
            vec![0xFF, 0xD8]
        );
    }
}
