//! In-memory payloads and the registry that keeps them reachable by token

mod registry;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use serde::Serialize;

pub use registry::BlobRegistry;

/// Scheme prefix of ephemeral in-memory references
pub const BLOB_SCHEME: &str = "blob:";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Immutable binary payload plus its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    mime_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Decode a payload shipped across the bridge as base64 text
    pub fn from_base64(data: &str, mime_type: impl Into<String>) -> Result<Self, base64::DecodeError> {
        let bytes = BASE64.decode(data.trim())?;
        Ok(Self::new(bytes, mime_type))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Declared content type; empty when the producer did not set one
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Content type to hand to storage, falling back to a generic binary type
    pub fn effective_mime_type(&self) -> &str {
        if self.mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            &self.mime_type
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Opaque reference token for a registered blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlobHandle {
    fn from(value: &str) -> Self {
        BlobHandle(value.to_string())
    }
}

impl From<String> for BlobHandle {
    fn from(value: String) -> Self {
        BlobHandle(value)
    }
}

impl std::fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_payload_decodes() {
        let blob = Blob::from_base64("aGVsbG8=\n", "text/plain").unwrap();
        assert_eq!(blob.bytes().as_ref(), b"hello");
        assert_eq!(blob.len(), 5);
        assert_eq!(blob.mime_type(), "text/plain");
        assert!(Blob::from_base64("not base64!", "").is_err());
    }

    #[test]
    fn empty_mime_type_falls_back_to_octet_stream() {
        let blob = Blob::new(vec![1u8, 2, 3], "");
        assert_eq!(blob.effective_mime_type(), "application/octet-stream");
        assert_eq!(Blob::new(Bytes::new(), "audio/flac").effective_mime_type(), "audio/flac");
    }
}
