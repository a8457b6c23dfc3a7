//! Working-directory marker tier: one `.working-dir-cache` file per spec
//! holding the manifest hash. Presence plus exact match means cached.

use std::path::Path;

pub async fn is_valid(marker_path: &Path, expected_hash: &str) -> bool {
    match tokio::fs::read_to_string(marker_path).await {
        Ok(contents) => contents.trim() == expected_hash,
        Err(_) => false,
    }
}

pub async fn write(marker_path: &Path, hash: &str) -> std::io::Result<()> {
    tokio::fs::write(marker_path, hash).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_marker_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_valid(&tmp.path().join(".working-dir-cache"), "abc").await);
    }

    #[tokio::test]
    async fn matching_marker_is_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".working-dir-cache");
        write(&marker, "abc123").await.unwrap();
        assert!(is_valid(&marker, "abc123").await);
        assert!(!is_valid(&marker, "different").await);
    }
}
