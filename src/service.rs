//! Save service - ties detection, the transfer queue and the platform adapter together

use log::{error, info, warn};
use reqwest::{Client, Url};
use std::sync::Arc;

use crate::adapter::{Platform, PlatformAdapter, PlatformBridges, SaveLocation};
use crate::blob::{Blob, BlobHandle, BlobRegistry};
use crate::bridge::{BaseDir, LocalFsBridge};
use crate::config::SaveConfig;
use crate::detect::{Affordance, InteractionEvent, PayloadResolver, SaveRequestDetector};
use crate::error::{ConfigError, SaveError};
use crate::feedback::{Feedback, LogFeedback, Severity};
use crate::queue::TransferQueue;
use crate::request::{SaveRequest, SaveRequestHandle, SaveState};

pub struct SaveServiceBuilder {
    config: SaveConfig,
    platform: Platform,
    bridges: PlatformBridges,
    page_url: Option<Url>,
    client: Option<Client>,
    feedback: Option<Arc<dyn Feedback>>,
    registry: Option<BlobRegistry>,
}

impl SaveServiceBuilder {
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn bridges(mut self, bridges: PlatformBridges) -> Self {
        self.bridges = bridges;
        self
    }

    /// Base for relative affordance targets
    pub fn page_url(mut self, page_url: Url) -> Self {
        self.page_url = Some(page_url);
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn feedback(mut self, feedback: Arc<dyn Feedback>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn registry(mut self, registry: BlobRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<SaveService, ConfigError> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().cookie_store(true).build()?,
        };
        let feedback = self.feedback.unwrap_or_else(|| Arc::new(LogFeedback));
        let registry = self
            .registry
            .unwrap_or_else(|| BlobRegistry::new(self.config.release_grace()));

        let mut bridges = self.bridges;
        if bridges.file.is_none() && self.platform == Platform::Desktop {
            if let Some(dir) = &self.config.download_dir {
                bridges.file =
                    Some(Arc::new(LocalFsBridge::new().with_base(BaseDir::Download, dir)));
            }
        }

        let adapter = PlatformAdapter::select(self.platform, &bridges, &self.config);
        match &adapter {
            Some(adapter) => info!(
                "save_service_ready: platform={} adapter={} release_grace={}s",
                self.platform,
                adapter.kind_name(),
                registry.grace().as_secs()
            ),
            None => warn!(
                "save_service_ready: platform={} adapter=none, saves will fail",
                self.platform
            ),
        }

        let detector = SaveRequestDetector::new(
            PayloadResolver::new(registry.clone(), client),
            self.page_url,
            &self.config.fallback_filename,
        );

        Ok(SaveService {
            inner: Arc::new(ServiceInner {
                queue: TransferQueue::new(feedback.clone()),
                config: self.config,
                platform: self.platform,
                registry,
                detector,
                adapter,
                feedback,
            }),
        })
    }
}

struct ServiceInner {
    config: SaveConfig,
    platform: Platform,
    registry: BlobRegistry,
    detector: SaveRequestDetector,
    adapter: Option<PlatformAdapter>,
    queue: TransferQueue,
    feedback: Arc<dyn Feedback>,
}

/// Entry point the host wires its interaction listener and blob calls into.
///
/// Cheap to clone; clones share the registry, queue and adapter.
#[derive(Clone)]
pub struct SaveService {
    inner: Arc<ServiceInner>,
}

impl SaveService {
    pub fn builder(config: SaveConfig) -> SaveServiceBuilder {
        SaveServiceBuilder {
            config,
            platform: Platform::current(),
            bridges: PlatformBridges::default(),
            page_url: None,
            client: None,
            feedback: None,
            registry: None,
        }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.inner.config
    }

    pub fn platform(&self) -> Platform {
        self.inner.platform
    }

    pub fn adapter_kind(&self) -> Option<&'static str> {
        self.inner.adapter.as_ref().map(PlatformAdapter::kind_name)
    }

    pub fn registry(&self) -> &BlobRegistry {
        &self.inner.registry
    }

    pub fn queue(&self) -> &TransferQueue {
        &self.inner.queue
    }

    pub fn register_blob(&self, blob: Blob) -> BlobHandle {
        self.inner.registry.register(blob)
    }

    pub fn release_blob(&self, handle: &BlobHandle) {
        self.inner.registry.release(handle)
    }

    /// Inspect an interaction event. A save affordance suppresses the event and starts a
    /// save; anything else leaves the event untouched.
    ///
    /// Outside a tokio runtime nothing is intercepted.
    pub fn intercept(&self, event: &mut InteractionEvent) -> Option<SaveRequestHandle> {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("save_intercept: no async runtime, event left alone");
            return None;
        }
        let affordance = self.inner.detector.intercept(event)?;
        Some(self.submit(affordance))
    }

    /// Start a save in the background and return its handle
    pub fn submit(&self, affordance: Affordance) -> SaveRequestHandle {
        let (request, handle) = SaveRequest::new(self.inner.feedback.clone());
        let service = self.clone();
        tokio::spawn(async move {
            let _ = service.run(&affordance, request).await;
        });
        handle
    }

    /// Run a save to completion
    pub async fn save(&self, affordance: &Affordance) -> Result<SaveLocation, SaveError> {
        let (request, _handle) = SaveRequest::new(self.inner.feedback.clone());
        self.run(affordance, request).await
    }

    async fn run(
        &self,
        affordance: &Affordance,
        request: Arc<SaveRequest>,
    ) -> Result<SaveLocation, SaveError> {
        let result = self.process(affordance, &request).await;
        match &result {
            Ok(location) => request.transition(SaveState::Saved {
                location: location.clone(),
            }),
            Err(e) => request.transition(SaveState::failed(e)),
        }
        info!(
            "save_settled: {} ok={} elapsed={}s",
            request.id(),
            result.is_ok(),
            request.age_secs()
        );
        result
    }

    async fn process(
        &self,
        affordance: &Affordance,
        request: &Arc<SaveRequest>,
    ) -> Result<SaveLocation, SaveError> {
        // Everything before enqueue fails fast and never reaches the queue
        let Some(adapter) = self.inner.adapter.clone() else {
            return Err(self.fail_early(request, SaveError::AdapterUnavailable));
        };
        let resolved = match self.inner.detector.resolve(affordance).await {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.fail_early(request, e)),
        };

        request.transition(SaveState::Queued);
        let feedback = self.inner.feedback.clone();
        let task_request = request.clone();
        let platform = self.inner.platform;
        let label = format!("{} {}", request.id(), resolved.filename);

        let ticket = self.inner.queue.enqueue(&label, async move {
            task_request.transition(SaveState::Transferring);
            feedback.notify(&format!("Saving {}...", resolved.filename), Severity::Info);
            info!(
                "save_start: {} bytes={} platform={} source={}",
                resolved.filename,
                resolved.blob.len(),
                platform,
                resolved.locator
            );

            let location = adapter.save_blob(&resolved.filename, &resolved.blob).await?;

            info!(
                "save_finish: {} saved_name={} location={}",
                resolved.filename, location.saved_name, location.location_label
            );
            feedback.notify(
                &format!("Saved to {}: {}", location.location_label, location.saved_name),
                Severity::Info,
            );
            Ok(location)
        });

        ticket.outcome().await
    }

    fn fail_early(&self, request: &SaveRequest, err: SaveError) -> SaveError {
        error!("save_failed: {} kind={} error={}", request.id(), err.kind(), err);
        self.inner
            .feedback
            .notify(&format!("Download failed: {}", err), Severity::Error);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SaveErrorKind;
    use crate::feedback::RecordingFeedback;
    use std::time::Duration;

    fn service(dir: &std::path::Path, feedback: Arc<RecordingFeedback>) -> SaveService {
        SaveService::builder(SaveConfig::default())
            .platform(Platform::Desktop)
            .bridges(PlatformBridges {
                file: Some(Arc::new(
                    LocalFsBridge::new().with_base(BaseDir::Download, dir),
                )),
                scoped: None,
            })
            .page_url(Url::parse("https://app.example/").unwrap())
            .feedback(feedback)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn blob_save_reports_progress_and_location() {
        let dir = tempfile::tempdir().unwrap();
        let feedback = Arc::new(RecordingFeedback::default());
        let service = service(dir.path(), feedback.clone());
        let handle = service.register_blob(Blob::new(&b"hello"[..], "text/plain"));

        let location = service
            .save(&Affordance::download(handle.as_str(), Some("note.txt")))
            .await
            .unwrap();

        assert_eq!(location.saved_name, "note.txt");
        assert_eq!(location.location_label, "Files");
        assert_eq!(std::fs::read(dir.path().join("note.txt")).unwrap(), b"hello");
        let messages: Vec<String> = feedback.messages().into_iter().map(|(m, _)| m).collect();
        assert_eq!(
            messages,
            vec!["Saving note.txt...".to_string(), "Saved to Files: note.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_adapter_fails_before_queue() {
        let feedback = Arc::new(RecordingFeedback::default());
        let service = SaveService::builder(SaveConfig::default())
            .platform(Platform::Android)
            .feedback(feedback.clone())
            .build()
            .unwrap();
        let handle = service.register_blob(Blob::new(&b"x"[..], ""));
        assert_eq!(service.adapter_kind(), None);

        let err = service
            .save(&Affordance::download(handle.as_str(), None))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), SaveErrorKind::AdapterUnavailable);
        assert!(!service.queue().is_busy());
        assert_eq!(
            feedback.errors(),
            vec!["Download failed: no platform adapter available".to_string()]
        );
    }

    #[tokio::test]
    async fn intercept_suppresses_and_settles() {
        let dir = tempfile::tempdir().unwrap();
        let feedback = Arc::new(RecordingFeedback::default());
        let service = service(dir.path(), feedback.clone());
        let handle = service.register_blob(Blob::new(vec![7u8; 1024], "application/pdf"));
        let mut event = InteractionEvent::new(vec![
            Affordance::plain(None),
            Affordance::download(handle.as_str(), Some("report.pdf")),
        ]);

        let request = service.intercept(&mut event).unwrap();
        assert!(event.is_default_prevented());

        let state = tokio::time::timeout(Duration::from_secs(5), request.settled())
            .await
            .unwrap();
        match state {
            SaveState::Saved { location } => assert_eq!(location.saved_name, "report.pdf"),
            other => panic!("unexpected state {:?}", other),
        }
        let statuses: Vec<String> = feedback.events().into_iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec!["queued", "transferring", "saved"]);
    }

    #[test]
    fn intercept_without_runtime_leaves_event_alone() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(RecordingFeedback::default()));
        let mut event = InteractionEvent::new(vec![Affordance::download("/a.bin", None)]);

        assert!(service.intercept(&mut event).is_none());
        assert!(!event.is_default_prevented());
    }

    #[tokio::test]
    async fn configured_download_dir_backs_desktop_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let config = SaveConfig {
            download_dir: Some(dir.path().to_path_buf()),
            ..SaveConfig::default()
        };
        let service = SaveService::builder(config)
            .platform(Platform::Desktop)
            .feedback(Arc::new(RecordingFeedback::default()))
            .build()
            .unwrap();
        assert_eq!(service.adapter_kind(), Some("direct-path"));

        let handle = service.register_blob(Blob::new(&b"abc"[..], ""));
        service
            .save(&Affordance::download(handle.as_str(), Some("abc.txt")))
            .await
            .unwrap();
        assert!(dir.path().join("abc.txt").exists());
    }
}
