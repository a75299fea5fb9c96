//! Interaction events and the download affordances carried on their path

use reqwest::Url;
use serde::Deserialize;

use crate::blob::BLOB_SCHEME;

/// One element on an interaction path, reduced to what save interception needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affordance {
    #[serde(default)]
    pub download: bool,
    pub href: Option<String>,
    pub download_name: Option<String>,
}

impl Affordance {
    /// Download link; `name` is the explicit `download="..."` value, if any
    pub fn download(href: &str, name: Option<&str>) -> Self {
        Self {
            download: true,
            href: Some(href.to_string()),
            download_name: name.map(str::to_string),
        }
    }

    /// Ordinary element without a download marker
    pub fn plain(href: Option<&str>) -> Self {
        Self {
            download: false,
            href: href.map(str::to_string),
            download_name: None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.href
            .as_deref()
            .map(str::trim)
            .filter(|href| !href.is_empty())
    }

    pub fn explicit_name(&self) -> Option<&str> {
        self.download_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn is_save_affordance(&self) -> bool {
        self.download && self.target().is_some()
    }
}

/// Interaction event as seen from the outermost capture stage.
///
/// `path` starts at the event target and walks up through its ancestors.
#[derive(Debug, Clone, Default)]
pub struct InteractionEvent {
    path: Vec<Affordance>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl InteractionEvent {
    pub fn new(path: Vec<Affordance>) -> Self {
        Self {
            path,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn path(&self) -> &[Affordance] {
        &self.path
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Nearest save affordance from the target outwards
pub fn find_save_affordance(path: &[Affordance]) -> Option<&Affordance> {
    path.iter().find(|element| element.is_save_affordance())
}

/// Where an affordance's payload lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `blob:` reference into the registry
    Ephemeral(String),
    Network(Url),
    /// Anything else (`data:`, `javascript:`, unparsable, ...)
    Unsupported(String),
}

impl Locator {
    /// Classify `href`, resolving relative references against the page URL
    pub fn parse(href: &str, page_url: Option<&Url>) -> Self {
        let href = href.trim();
        if href.starts_with(BLOB_SCHEME) {
            return Locator::Ephemeral(href.to_string());
        }

        let parsed = match page_url {
            Some(base) => base.join(href),
            None => Url::parse(href),
        };
        match parsed {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Locator::Network(url),
            _ => Locator::Unsupported(href.to_string()),
        }
    }

    /// Final path segment, percent-decoded; empty when there is none
    pub fn last_segment(&self) -> String {
        let raw = match self {
            Locator::Ephemeral(token) => token.rsplit('/').next().unwrap_or_default(),
            Locator::Network(url) => url.path().rsplit('/').next().unwrap_or_default(),
            Locator::Unsupported(_) => "",
        };
        urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Ephemeral(token) => f.write_str(token),
            Locator::Network(url) => write!(f, "{}", url),
            Locator::Unsupported(href) => write!(f, "unsupported:{}", href),
        }
    }
}
