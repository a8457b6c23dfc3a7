//! Archive Reader (C1): enumerates members of a ZIP/JAR-style archive, reads
//! a named entry, and lists entries under a path prefix.
//!
//! JAR is the container format the host ecosystem's libraries ship in, so
//! only ZIP is implemented — unlike the teacher crate's archive module, which
//! also *creates* tar/zip/compressed archives for deployment, this reader
//! only ever reads, and only ZIP-family containers.

use crate::error::ArchiveError;
use crate::types::LibraryMetadata;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

const LIBRARY_METADATA_ENTRY: &str = "META-INF/openapi-library.yaml";

/// An opened archive, backed by either a file on disk or an in-memory byte
/// buffer (some upstream library artifacts aren't backed by a file, e.g. one
/// fetched into memory by the embedding host).
pub struct Archive {
    label: String,
    bytes: Vec<u8>,
}

impl Archive {
    pub fn open_path(path: &Path) -> Result<Self, ArchiveError> {
        let bytes = std::fs::read(path).map_err(|source| ArchiveError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            label: path.display().to_string(),
            bytes,
        })
    }

    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }

    fn zip_archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>, ArchiveError> {
        ZipArchive::new(Cursor::new(self.bytes.as_slice())).map_err(|e| ArchiveError::Corrupt {
            path: self.label.clone(),
            reason: e.to_string(),
        })
    }

    /// Enumerates every entry whose name starts with `prefix`, returning
    /// entry paths relative to the archive root (not stripped of `prefix`).
    pub fn list(&self, prefix: &str) -> Result<Vec<String>, ArchiveError> {
        let archive = self.zip_archive()?;
        let mut entries = Vec::new();
        for name in archive.file_names() {
            if name.starts_with(prefix) && !name.ends_with('/') {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Reads one named entry's bytes. Fails with `EntryNotFound` if absent.
    pub fn read(&self, entry_path: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut archive = self.zip_archive()?;
        let mut file = archive
            .by_name(entry_path)
            .map_err(|_| ArchiveError::EntryNotFound {
                archive: self.label.clone(),
                entry: entry_path.to_string(),
            })?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|source| ArchiveError::Io {
            path: format!("{}::{}", self.label, entry_path),
            source,
        })?;
        Ok(buf)
    }

    pub fn has_entry(&self, entry_path: &str) -> bool {
        self.zip_archive()
            .ok()
            .map(|mut a| a.by_name(entry_path).is_ok())
            .unwrap_or(false)
    }

    /// Reads `META-INF/openapi-library.yaml`. Missing metadata is not an
    /// error and yields `None`; a present-but-unparsable file is the caller's
    /// concern (the inventory treats that as fatal, per §4.2).
    pub fn read_metadata(&self) -> Result<Option<LibraryMetadata>, ArchiveError> {
        if !self.has_entry(LIBRARY_METADATA_ENTRY) {
            return Ok(None);
        }
        let bytes = self.read(LIBRARY_METADATA_ENTRY)?;
        let text = String::from_utf8_lossy(&bytes);
        let metadata: LibraryMetadata =
            serde_yaml::from_str(&text).map_err(|e| ArchiveError::Corrupt {
                path: format!("{}::{}", self.label, LIBRARY_METADATA_ENTRY),
                reason: e.to_string(),
            })?;
        Ok(Some(metadata))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
