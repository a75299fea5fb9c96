//! Tauri plugin exposing the save pipeline to the webview
//!
//! Events:
//! - `save-feedback`: transient user messages
//! - `save-status-changed`: per-request lifecycle transitions

use serde::Serialize;
use std::sync::Arc;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{AppHandle, Emitter, Manager, Runtime, State};

use crate::adapter::{Platform, PlatformBridges, SaveLocation};
use crate::blob::{Blob, BlobHandle};
use crate::bridge::{BaseDir, LocalFsBridge, StagingScopedBridge};
use crate::config::{load_download_dir, save_download_dir, SaveConfig, SAVE_CONFIG_FILE};
use crate::detect::Affordance;
use crate::feedback::{Feedback, SaveStatusChanged, Severity};
use crate::service::SaveService;

#[derive(Clone, Serialize)]
pub struct SaveFeedback {
    pub message: String,
    pub severity: Severity,
}

/// Feedback forwarded to the webview as events
pub struct EventFeedback<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> EventFeedback<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> Feedback for EventFeedback<R> {
    fn notify(&self, message: &str, severity: Severity) {
        let _ = self.app.emit(
            "save-feedback",
            SaveFeedback {
                message: message.to_string(),
                severity,
            },
        );
    }

    fn status_changed(&self, event: &SaveStatusChanged) {
        let _ = self.app.emit("save-status-changed", event.clone());
    }
}

/// Register base64-encoded data and return its `blob:` handle
#[tauri::command]
pub async fn register_blob(
    service: State<'_, SaveService>,
    data_base64: String,
    mime_type: Option<String>,
) -> Result<String, String> {
    let blob = Blob::from_base64(&data_base64, mime_type.unwrap_or_default())
        .map_err(|e| format!("Invalid base64 data: {}", e))?;
    Ok(service.register_blob(blob).to_string())
}

#[tauri::command]
pub async fn release_blob(service: State<'_, SaveService>, handle: String) -> Result<(), String> {
    service.release_blob(&BlobHandle::from(handle));
    Ok(())
}

/// Save a link target as if its download affordance had been clicked
#[tauri::command]
pub async fn save_download(
    service: State<'_, SaveService>,
    href: String,
    download_name: Option<String>,
) -> Result<SaveLocation, String> {
    service
        .save(&Affordance::download(&href, download_name.as_deref()))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_download_folder<R: Runtime>(
    app: AppHandle<R>,
    service: State<'_, SaveService>,
) -> Result<Option<String>, String> {
    let config_dir = app
        .path()
        .app_config_dir()
        .map_err(|e| format!("Failed to get config dir: {}", e))?;
    let folder = load_download_dir(&config_dir).or_else(|| service.config().download_dir.clone());
    Ok(folder.map(|p| p.to_string_lossy().to_string()))
}

/// Pick and persist the download folder; applies from the next launch
#[tauri::command]
pub async fn select_download_folder<R: Runtime>(app: AppHandle<R>) -> Result<Option<String>, String> {
    use tauri_plugin_dialog::DialogExt;

    let (tx, rx) = tokio::sync::oneshot::channel();

    app.dialog()
        .file()
        .set_title("Select Download Folder")
        .pick_folder(move |folder_path| {
            let result = folder_path.map(|p| p.to_string());
            let _ = tx.send(result);
        });

    let selected = rx.await.map_err(|_| "Dialog was closed".to_string())?;
    if let Some(folder) = &selected {
        let config_dir = app
            .path()
            .app_config_dir()
            .map_err(|e| format!("Failed to get config dir: {}", e))?;
        save_download_dir(&config_dir, std::path::Path::new(folder))
            .map_err(|e| format!("Failed to save download folder: {}", e))?;
    }
    Ok(selected)
}

fn platform_bridges<R: Runtime>(
    app: &AppHandle<R>,
    platform: Platform,
) -> Result<PlatformBridges, tauri::Error> {
    let mut bridges = PlatformBridges::default();
    match platform {
        Platform::Android => {
            bridges.scoped = Some(Arc::new(StagingScopedBridge::new(
                app.path().download_dir()?,
            )));
        }
        Platform::Ios => {
            bridges.file = Some(Arc::new(
                LocalFsBridge::new().with_base(BaseDir::Document, app.path().document_dir()?),
            ));
        }
        // Desktop writes go to `SaveConfig::download_dir`
        Platform::Desktop => {}
    }
    Ok(bridges)
}

pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("webview-save")
        .invoke_handler(tauri::generate_handler![
            register_blob,
            release_blob,
            save_download,
            get_download_folder,
            select_download_folder
        ])
        .setup(|app, _api| {
            let config_dir = app.path().app_config_dir()?;
            let mut config = SaveConfig::load(&config_dir.join(SAVE_CONFIG_FILE))?;
            if config.download_dir.is_none() {
                config.download_dir =
                    load_download_dir(&config_dir).or_else(|| app.path().download_dir().ok());
            }

            let platform = Platform::current();
            let service = SaveService::builder(config)
                .platform(platform)
                .bridges(platform_bridges(app, platform)?)
                .feedback(Arc::new(EventFeedback::new(app.clone())))
                .build()?;
            app.manage(service);
            Ok(())
        })
        .build()
}
