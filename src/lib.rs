//! Download interception and save pipeline for embedded webviews
//!
//! A click on a `download` affordance is suppressed, its payload resolved (an in-memory
//! `blob:` handle or a credentialed fetch), and the bytes persisted through the native
//! bridge of the current platform, one save at a time.
//!
//! - [`BlobRegistry`]: ephemeral payloads addressed by `blob:` tokens
//! - [`SaveService`]: detection, queueing and platform dispatch
//! - [`PlatformAdapter`]: scoped-storage sessions or direct-path writes
//!
//! With the `tauri` feature, [`commands::init`] exposes the pipeline as a plugin.

pub mod adapter;
pub mod blob;
pub mod bridge;
pub mod config;
pub mod detect;
pub mod error;
pub mod feedback;
pub mod naming;
pub mod queue;
pub mod request;
pub mod service;

#[cfg(feature = "tauri")]
pub mod commands;

pub use adapter::{Platform, PlatformAdapter, PlatformBridges, SaveLocation};
pub use blob::{Blob, BlobHandle, BlobRegistry};
pub use config::SaveConfig;
pub use detect::{Affordance, InteractionEvent};
pub use error::{BridgeError, ConfigError, SaveError, SaveErrorKind};
pub use feedback::{Feedback, LogFeedback, Severity};
pub use request::{SaveRequestHandle, SaveState};
pub use service::{SaveService, SaveServiceBuilder};
