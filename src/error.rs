//! Error types for the template resolution and customization pipeline.
//!
//! Each kind carries structured context (source, path, offset where
//! applicable) per the component that raises it, mirroring the host's
//! convention of one `Error` enum per module plus a crate-local `Result` alias.

use crate::types::SourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown template source {name:?}; valid sources are {valid:?}")]
    UnknownSource { name: String, valid: Vec<&'static str> },

    #[error("missing required path for {field}")]
    MissingRequiredPath { field: String },

    #[error("unknown configuration key {key:?}; did you mean {suggestion:?}?")]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
    },

    #[error("templateSources must not be empty")]
    EmptySourceOrder,

    #[error("failed to parse configuration: {reason}")]
    Parse { reason: String },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive is corrupt: {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("entry not found in archive {archive}: {entry}")]
    EntryNotFound { archive: String, entry: String },

    #[error("io error reading archive {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("unreadable entry at {path}: {reason}")]
    UnreadableEntry { path: String, reason: String },

    #[error("malformed library metadata in {path}: {reason}")]
    MalformedLibraryMetadata { path: String, reason: String },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Error)]
pub enum YamlError {
    #[error("{path}: parse error: {reason}")]
    Parse { path: String, reason: String },

    #[error("{path}: duplicate key {key:?}")]
    DuplicateKey { path: String, key: String },

    #[error("{path}: alias count {count} exceeds bound {bound}")]
    TooManyAliases {
        path: String,
        count: usize,
        bound: usize,
    },

    #[error("{path}: recursive anchor detected")]
    RecursiveAnchor { path: String },

    #[error("{path}: schema violation: {reason}")]
    SchemaViolation { path: String, reason: String },

    #[error("{path}: document has no insertions, replacements, or smart variants")]
    EmptyDocument { path: String },
}

#[derive(Debug, Error)]
#[error("{path}: dangerous token {token:?} found in {field}")]
pub struct SecurityError {
    pub path: String,
    pub field: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("template {name:?} references partial {partial:?} which no source provides")]
    MissingPartial { name: String, partial: String },

    #[error("regex pattern {pattern:?} in {path} failed to compile: {reason}")]
    InvalidRegex {
        path: String,
        pattern: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum CacheIntegrityError {
    #[error("digest mismatch for {key}: expected {expected}, found {actual}")]
    DigestMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("self-heal retry failed for {key}: {source}")]
    RetryFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
#[error("library {library} {version} requires generator {constraint}, detected {detected}")]
pub struct LibraryCompatibilityIssue {
    pub library: String,
    pub version: String,
    pub constraint: String,
    pub detected: String,
}

#[derive(Debug, Error)]
#[error("{} incompatible librar{}: {}", issues.len(), if issues.len() == 1 { "y" } else { "ies" }, summarize(issues))]
pub struct LibraryCompatibilityError {
    pub issues: Vec<LibraryCompatibilityIssue>,
}

fn summarize(issues: &[LibraryCompatibilityIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level error for a single preparation, returned by the scheduler (C9)
/// per-spec. Wraps whichever component error actually occurred, with the
/// offending spec name attached by the caller.
#[derive(Debug, Error)]
pub enum PreparationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("customization document rejected: {0}")]
    Yaml(#[from] YamlError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    LibraryCompatibility(#[from] LibraryCompatibilityError),

    #[error(transparent)]
    CacheIntegrity(#[from] CacheIntegrityError),

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("spec {spec} cancelled")]
    Cancelled { spec: String },
}

impl PreparationError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PreparationError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Tags a [`SourceKind`] that lost a precedence tie, kept only for
/// diagnostics (§4.6 step 2: "subsequent explicit providers ... are ignored
/// but recorded for diagnostics").
#[derive(Debug, Clone)]
pub struct ShadowedProvider {
    pub template_name: String,
    pub shadowed_source: SourceKind,
    pub winning_source: SourceKind,
}

pub type Result<T, E = PreparationError> = std::result::Result<T, E>;
