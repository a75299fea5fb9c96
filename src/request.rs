//! Save request lifecycle: resolving -> queued -> transferring -> settled

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use ulid::Ulid;

use crate::adapter::SaveLocation;
use crate::error::{SaveError, SaveErrorKind};
use crate::feedback::{Feedback, SaveStatusChanged};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveState {
    Resolving,
    Queued,
    Transferring,
    Saved { location: SaveLocation },
    Failed { kind: SaveErrorKind, message: String },
}

impl SaveState {
    pub fn is_settled(&self) -> bool {
        matches!(self, SaveState::Saved { .. } | SaveState::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaveState::Resolving => "resolving",
            SaveState::Queued => "queued",
            SaveState::Transferring => "transferring",
            SaveState::Saved { .. } => "saved",
            SaveState::Failed { .. } => "failed",
        }
    }

    pub fn failed(err: &SaveError) -> Self {
        SaveState::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Producer side, owned by the pipeline
pub(crate) struct SaveRequest {
    id: String,
    created_at: i64,
    state: watch::Sender<SaveState>,
    feedback: Arc<dyn Feedback>,
}

impl SaveRequest {
    pub(crate) fn new(feedback: Arc<dyn Feedback>) -> (Arc<Self>, SaveRequestHandle) {
        let id = Ulid::new().to_string();
        let created_at = Utc::now().timestamp();
        let (state, receiver) = watch::channel(SaveState::Resolving);
        let request = Arc::new(Self {
            id: id.clone(),
            created_at,
            state,
            feedback,
        });
        let handle = SaveRequestHandle {
            id,
            created_at,
            state: receiver,
        };
        (request, handle)
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn transition(&self, next: SaveState) {
        let (saved_name, error) = match &next {
            SaveState::Saved { location } => (Some(location.saved_name.clone()), None),
            SaveState::Failed { message, .. } => (None, Some(message.clone())),
            _ => (None, None),
        };
        match error.as_ref() {
            Some(err) => warn!("save_status: {} -> {} error={}", self.id, next.as_str(), err),
            None => info!("save_status: {} -> {}", self.id, next.as_str()),
        }
        self.feedback.status_changed(&SaveStatusChanged {
            request_id: self.id.clone(),
            status: next.as_str().to_string(),
            saved_name,
            error,
        });
        self.state.send_replace(next);
    }

    pub(crate) fn age_secs(&self) -> i64 {
        Utc::now().timestamp() - self.created_at
    }
}

/// Observer side, handed to whoever triggered the save
#[derive(Debug, Clone)]
pub struct SaveRequestHandle {
    pub id: String,
    pub created_at: i64,
    state: watch::Receiver<SaveState>,
}

impl SaveRequestHandle {
    pub fn state(&self) -> SaveState {
        self.state.borrow().clone()
    }

    /// Wait for the terminal state
    pub async fn settled(mut self) -> SaveState {
        let settled = match self.state.wait_for(SaveState::is_settled).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state.borrow().clone())
    }
}
