//! Collision-free destination names: `name.ext`, `name (1).ext`, `name (2).ext`, ...

use async_trait::async_trait;

use crate::bridge::{BaseDir, FileBridge};
use crate::error::BridgeError;

/// Existence check against the store a name is being resolved for
#[async_trait]
pub trait NameProbe: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, BridgeError>;
}

/// Probe names relative to one base directory of a file bridge
pub struct BaseDirProbe<'a> {
    pub bridge: &'a dyn FileBridge,
    pub base: BaseDir,
}

#[async_trait]
impl<'a> NameProbe for BaseDirProbe<'a> {
    async fn exists(&self, name: &str) -> Result<bool, BridgeError> {
        self.bridge.exists(name, self.base).await
    }
}

/// Split into stem and extension at the last interior dot.
///
/// A leading dot (hidden file) or no dot at all leaves the whole name as the stem.
pub fn split_filename(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// First of `desired`, `"{stem} (1){ext}"`, `"{stem} (2){ext}"`, ... that does not exist
pub async fn resolve_available_name<P>(probe: &P, desired: &str) -> Result<String, BridgeError>
where
    P: NameProbe + ?Sized,
{
    let (stem, ext) = split_filename(desired);
    let mut candidate = desired.to_string();
    let mut suffix: u64 = 1;

    while probe.exists(&candidate).await? {
        candidate = format!("{} ({}){}", stem, suffix, ext);
        suffix += 1;
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SetProbe {
        names: HashSet<String>,
        calls: AtomicUsize,
    }

    impl SetProbe {
        fn new(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|n| n.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NameProbe for SetProbe {
        async fn exists(&self, name: &str) -> Result<bool, BridgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.names.contains(name))
        }
    }

    struct BrokenProbe;

    #[async_trait]
    impl NameProbe for BrokenProbe {
        async fn exists(&self, _name: &str) -> Result<bool, BridgeError> {
            Err(BridgeError::Unreachable("bridge gone".to_string()))
        }
    }

    #[test]
    fn split_handles_hidden_and_extensionless_names() {
        assert_eq!(split_filename("report.pdf"), ("report", ".pdf"));
        assert_eq!(split_filename("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_filename("README"), ("README", ""));
        assert_eq!(split_filename(".profile"), (".profile", ""));
        assert_eq!(split_filename("trailing."), ("trailing", "."));
    }

    #[tokio::test]
    async fn free_name_is_returned_unchanged() {
        let probe = SetProbe::new(&["other.pdf"]);
        assert_eq!(
            resolve_available_name(&probe, "report.pdf").await.unwrap(),
            "report.pdf"
        );
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn picks_first_free_numbered_name() {
        let probe = SetProbe::new(&["report.pdf", "report (1).pdf"]);
        assert_eq!(
            resolve_available_name(&probe, "report.pdf").await.unwrap(),
            "report (2).pdf"
        );
    }

    #[tokio::test]
    async fn numbering_follows_k_existing_names() {
        for k in 1..6u32 {
            let mut taken = vec!["track.flac".to_string()];
            taken.extend((1..k).map(|n| format!("track ({}).flac", n)));
            let refs: Vec<&str> = taken.iter().map(String::as_str).collect();
            let probe = SetProbe::new(&refs);

            let resolved = resolve_available_name(&probe, "track.flac").await.unwrap();
            assert_eq!(resolved, format!("track ({}).flac", k));
        }
    }

    #[tokio::test]
    async fn extensionless_and_hidden_names_number_the_whole_stem() {
        let probe = SetProbe::new(&["notes", ".env"]);
        assert_eq!(resolve_available_name(&probe, "notes").await.unwrap(), "notes (1)");
        assert_eq!(resolve_available_name(&probe, ".env").await.unwrap(), ".env (1)");
    }

    #[tokio::test]
    async fn probe_errors_propagate() {
        let err = resolve_available_name(&BrokenProbe, "a.txt").await.unwrap_err();
        assert!(matches!(err, BridgeError::Unreachable(_)));
    }
}
