//! Global cross-build cache: on-disk under a well-known user path, organized
//! as `templates/<generator>-<version>/<name>` with a sibling `<name>.sha256`.
//! Writes are atomic (temp file + rename) so readers never observe a partial
//! entry. A digest mismatch on read is a self-healing miss: the stale entry
//! is deleted so the caller refetches and re-populates it.
//!
//! Simplification noted in `DESIGN.md`: the stored digest is the template
//! body's own content hash. §4.8 additionally allows keying library-sourced
//! entries off the *library archive's* digest rather than the extracted
//! body; that finer-grained scheme is not implemented here.

use crate::error::CacheIntegrityError;
use crate::types::{TemplateBody, TemplateName};
use std::path::{Path, PathBuf};

pub struct GlobalCache {
    root: PathBuf,
}

impl GlobalCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// `$XDG_CACHE_HOME/oas-template-forge` (or the platform equivalent via
    /// the `dirs` crate), falling back to the current directory if no cache
    /// directory can be determined for the platform.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oas-template-forge")
    }

    fn entry_dir(&self, generator: &str, version: &str) -> PathBuf {
        self.root.join("templates").join(format!("{generator}-{version}"))
    }

    fn entry_path(&self, generator: &str, version: &str, name: &TemplateName) -> PathBuf {
        self.entry_dir(generator, version).join(name.as_str())
    }

    fn sidecar_path(entry_path: &Path) -> PathBuf {
        let mut sidecar = entry_path.as_os_str().to_owned();
        sidecar.push(".sha256");
        PathBuf::from(sidecar)
    }

    /// Reads a cache hit, validating its digest. `Ok(None)` covers both a
    /// plain miss and a self-healed digest mismatch; the caller always
    /// refetches from the origin source on `None`.
    pub async fn get(
        &self,
        generator: &str,
        version: &str,
        name: &TemplateName,
    ) -> Result<Option<TemplateBody>, CacheIntegrityError> {
        let entry_path = self.entry_path(generator, version, name);
        let sidecar_path = Self::sidecar_path(&entry_path);

        let (Ok(bytes), Ok(expected_digest)) = (
            tokio::fs::read(&entry_path).await,
            tokio::fs::read_to_string(&sidecar_path).await,
        ) else {
            return Ok(None);
        };

        let body = TemplateBody::new(bytes);
        let actual_digest = body.content_hash();
        if actual_digest == expected_digest.trim() {
            return Ok(Some(body));
        }

        let key = entry_path.display().to_string();
        if let Err(source) = tokio::fs::remove_file(&entry_path).await {
            return Err(CacheIntegrityError::RetryFailed { key, source });
        }
        let _ = tokio::fs::remove_file(&sidecar_path).await;
        Ok(None)
    }

    /// Atomically writes the entry and its digest sidecar: write to a
    /// sibling temp file, then rename into place.
    pub async fn put(&self, generator: &str, version: &str, name: &TemplateName, body: &TemplateBody) -> std::io::Result<()> {
        let dir = self.entry_dir(generator, version);
        tokio::fs::create_dir_all(&dir).await?;

        let entry_path = self.entry_path(generator, version, name);
        let sidecar_path = Self::sidecar_path(&entry_path);
        let digest = body.content_hash();

        atomic_write(&entry_path, body.as_bytes()).await?;
        atomic_write(&sidecar_path, digest.as_bytes()).await?;
        Ok(())
    }
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_put_and_get() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = GlobalCache::new(tmp.path().to_path_buf());
        let name = TemplateName::new("pojo.mustache");
        let body = TemplateBody::from_str("public class X {}");

        cache.put("spring", "8.0.0", &name, &body).await.unwrap();
        let hit = cache.get("spring", "8.0.0", &name).await.unwrap().unwrap();
        assert_eq!(hit.as_str_lossy(), "public class X {}");
    }

    #[tokio::test]
    async fn missing_entry_is_plain_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = GlobalCache::new(tmp.path().to_path_buf());
        let result = cache.get("spring", "8.0.0", &TemplateName::new("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn digest_mismatch_self_heals_to_a_miss_and_deletes_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = GlobalCache::new(tmp.path().to_path_buf());
        let name = TemplateName::new("pojo.mustache");
        cache
            .put("spring", "8.0.0", &name, &TemplateBody::from_str("original"))
            .await
            .unwrap();

        let entry_path = cache.entry_path("spring", "8.0.0", &name);
        tokio::fs::write(&entry_path, "tampered").await.unwrap();

        let result = cache.get("spring", "8.0.0", &name).await.unwrap();
        assert!(result.is_none());
        assert!(!entry_path.exists());
    }
}
