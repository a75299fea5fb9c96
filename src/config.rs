//! Pipeline configuration and the persisted download folder

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// File (under the app config dir) holding the user-chosen download folder
pub const DOWNLOAD_PATH_FILE: &str = "download_path.txt";

/// Optional JSON overrides for [`SaveConfig`], also under the app config dir
pub const SAVE_CONFIG_FILE: &str = "save_config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SaveConfig {
    pub direct_chunk_size: usize,
    pub scoped_chunk_size: usize,
    /// Seconds a released blob stays resolvable
    pub release_grace_secs: u64,
    pub fallback_filename: String,
    pub scoped_sub_folder: String,
    pub scoped_location_label: String,
    pub direct_location_label: String,
    pub download_dir: Option<PathBuf>,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            direct_chunk_size: chunked_write::DIRECT_CHUNK_SIZE,
            scoped_chunk_size: chunked_write::SCOPED_CHUNK_SIZE,
            release_grace_secs: 30,
            fallback_filename: "download".to_string(),
            scoped_sub_folder: "Download".to_string(),
            scoped_location_label: "Downloads".to_string(),
            direct_location_label: "Files".to_string(),
            download_dir: None,
        }
    }
}

impl SaveConfig {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("save_config: {} missing, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: SaveConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn release_grace(&self) -> Duration {
        Duration::from_secs(self.release_grace_secs)
    }
}

pub fn load_download_dir(config_dir: &Path) -> Option<PathBuf> {
    let config_file = config_dir.join(DOWNLOAD_PATH_FILE);
    if !config_file.exists() {
        return None;
    }
    match fs::read_to_string(&config_file) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(PathBuf::from(trimmed))
            }
        }
        Err(e) => {
            warn!("load_download_dir: {} error={}", config_file.display(), e);
            None
        }
    }
}

pub fn save_download_dir(config_dir: &Path, path: &Path) -> Result<(), ConfigError> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir)?;
    }
    fs::write(
        config_dir.join(DOWNLOAD_PATH_FILE),
        path.to_string_lossy().as_bytes(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, r#"{"release_grace_secs": 5, "scoped_sub_folder": "Music"}"#).unwrap();

        let config = SaveConfig::load(&path).unwrap();

        assert_eq!(config.release_grace(), Duration::from_secs(5));
        assert_eq!(config.scoped_sub_folder, "Music");
        assert_eq!(config.direct_chunk_size, 512 * 1024);
        assert_eq!(config.fallback_filename, "download");
    }

    #[test]
    fn missing_file_yields_defaults_and_bad_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            SaveConfig::load(&dir.path().join("absent.json")).unwrap(),
            SaveConfig::default()
        );

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert!(matches!(SaveConfig::load(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn download_dir_round_trips_through_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("nested/config");
        assert_eq!(load_download_dir(&config_dir), None);

        save_download_dir(&config_dir, Path::new("/home/me/Music")).unwrap();
        assert_eq!(
            load_download_dir(&config_dir),
            Some(PathBuf::from("/home/me/Music"))
        );
    }
}
