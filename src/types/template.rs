use super::source::{SourceKind, TemplateName};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// UTF-8 byte sequence, line-ending-preserving. Content hash is SHA-256 of the
/// raw bytes, computed lazily and cached on first access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBody {
    bytes: Vec<u8>,
}

impl TemplateBody {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_str(s: impl Into<String>) -> Self {
        Self {
            bytes: s.into().into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Lossy UTF-8 view; customization application works on this string form
    /// since every documented operation (insertion anchors, literal/regex
    /// replacement, semantic probes) is defined over template *text*.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex_encode(&hasher.finalize())
    }
}

impl From<String> for TemplateBody {
    fn from(value: String) -> Self {
        Self {
            bytes: value.into_bytes(),
        }
    }
}

impl From<&str> for TemplateBody {
    fn from(value: &str) -> Self {
        Self {
            bytes: value.as_bytes().to_vec(),
        }
    }
}

impl From<Vec<u8>> for TemplateBody {
    fn from(value: Vec<u8>) -> Self {
        Self { bytes: value }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Identifies one customization document's contribution for provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCustomization {
    pub source: SourceKind,
    pub document_id: String,
}

/// Produced by the template resolver (C6); consumed by the working-directory
/// builder (C7).
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub name: TemplateName,
    pub body: TemplateBody,
    pub base_body: TemplateBody,
    pub base_source: SourceKind,
    pub applied_customizations: Vec<AppliedCustomization>,
}

impl ResolvedTemplate {
    pub fn was_modified(&self) -> bool {
        !self.applied_customizations.is_empty()
    }
}
