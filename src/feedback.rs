//! User feedback channel (transient status notifications) and save status events

use log::{error, info};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// Status change event payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveStatusChanged {
    pub request_id: String,
    pub status: String,
    pub saved_name: Option<String>,
    pub error: Option<String>,
}

pub trait Feedback: Send + Sync {
    /// Show a short-lived message to the user
    fn notify(&self, message: &str, severity: Severity);

    /// Request lifecycle updates; most channels ignore these
    fn status_changed(&self, _event: &SaveStatusChanged) {}
}

/// Feedback routed to the log only (headless hosts)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("feedback: {}", message),
            Severity::Error => error!("feedback: {}", message),
        }
    }
}

/// Keeps every notification and status event in memory
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    messages: Mutex<Vec<(String, Severity)>>,
    events: Mutex<Vec<SaveStatusChanged>>,
}

impl RecordingFeedback {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(_, severity)| *severity == Severity::Error)
            .map(|(message, _)| message)
            .collect()
    }

    pub fn events(&self) -> Vec<SaveStatusChanged> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Feedback for RecordingFeedback {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((message.to_string(), severity));
    }

    fn status_changed(&self, event: &SaveStatusChanged) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
