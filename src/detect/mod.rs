//! Save request detection: recognize download affordances and resolve name + payload
//!
//! The host forwards every click from its outermost capture-stage listener. A match
//! suppresses the event's default handling; anything else is left alone.

mod affordance;
mod filename;
mod payload;

use log::debug;
use reqwest::Url;

use crate::blob::Blob;
use crate::error::SaveError;

pub use affordance::{find_save_affordance, Affordance, InteractionEvent, Locator};
pub use filename::{content_disposition_filename, sanitize_filename};
pub use payload::{FetchedPayload, PayloadResolver};

/// Fully resolved save: sanitized filename plus the payload to persist
#[derive(Debug, Clone)]
pub struct ResolvedSave {
    pub filename: String,
    pub blob: Blob,
    pub locator: Locator,
}

#[derive(Clone)]
pub struct SaveRequestDetector {
    resolver: PayloadResolver,
    page_url: Option<Url>,
    fallback_filename: String,
}

impl SaveRequestDetector {
    pub fn new(resolver: PayloadResolver, page_url: Option<Url>, fallback_filename: &str) -> Self {
        Self {
            resolver,
            page_url,
            fallback_filename: fallback_filename.to_string(),
        }
    }

    pub fn resolver(&self) -> &PayloadResolver {
        &self.resolver
    }

    /// Match the event against its path; on a match suppress it and return the affordance
    pub fn intercept(&self, event: &mut InteractionEvent) -> Option<Affordance> {
        let affordance = find_save_affordance(event.path())?.clone();
        event.prevent_default();
        event.stop_immediate_propagation();
        debug!(
            "save_intercepted: href={:?} name={:?}",
            affordance.href, affordance.download_name
        );
        Some(affordance)
    }

    pub fn locator(&self, affordance: &Affordance) -> Option<Locator> {
        affordance
            .target()
            .map(|href| Locator::parse(href, self.page_url.as_ref()))
    }

    /// Name the affordance asks for before any payload is seen
    pub fn infer_filename(&self, affordance: &Affordance, locator: &Locator) -> String {
        if let Some(name) = affordance.explicit_name() {
            return name.to_string();
        }
        let segment = locator.last_segment();
        if segment.is_empty() {
            self.fallback_filename.clone()
        } else {
            segment
        }
    }

    /// Resolve payload and final (sanitized) filename.
    ///
    /// An explicit `download` name always wins; a server-suggested name only replaces
    /// one inferred from the URL.
    pub async fn resolve(&self, affordance: &Affordance) -> Result<ResolvedSave, SaveError> {
        let locator = self.locator(affordance).ok_or_else(|| {
            SaveError::PayloadUnavailable("affordance has no target".to_string())
        })?;
        let mut filename = self.infer_filename(affordance, &locator);

        let fetched = self.resolver.resolve(&locator).await?;
        if affordance.explicit_name().is_none() {
            if let Some(suggested) = fetched.suggested_name {
                filename = suggested;
            }
        }

        Ok(ResolvedSave {
            filename: sanitize_filename(&filename, &self.fallback_filename),
            blob: fetched.blob,
            locator,
        })
    }
}
