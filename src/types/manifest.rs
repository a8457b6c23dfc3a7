use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Single SHA-256 summarizing every input that affects a working directory's
/// contents: inventory fingerprints, the effective source ordering, the
/// generator identity and detected version, the set of applicable
/// customization documents, and all template variable values.
///
/// Used by the cache manager (C8) to short-circuit rebuilds: a working
/// directory whose `.working-dir-cache` marker matches the freshly computed
/// hash is known-valid without re-walking any source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDirectoryManifest {
    pub hash: String,
}

impl WorkingDirectoryManifest {
    /// Builds the manifest hash from its constituent fingerprints. Each
    /// fingerprint is hashed in a fixed, named order so that the result is
    /// independent of caller iteration order (e.g. `BTreeMap` callers already
    /// give deterministic order; this re-sorts to be safe against any caller).
    pub fn compute(inputs: &ManifestInputs) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(b"generator:");
        hasher.update(inputs.generator_id.as_bytes());
        hasher.update(b"\nversion:");
        hasher.update(inputs.generator_version.as_deref().unwrap_or("").as_bytes());

        hasher.update(b"\nsources:");
        for fingerprint in &inputs.inventory_fingerprints {
            hasher.update(fingerprint.as_bytes());
            hasher.update(b",");
        }

        hasher.update(b"\norder:");
        for source in &inputs.effective_source_order {
            hasher.update(source.as_bytes());
            hasher.update(b",");
        }

        hasher.update(b"\ndocuments:");
        for doc_id in &inputs.applicable_document_ids {
            hasher.update(doc_id.as_bytes());
            hasher.update(b",");
        }

        hasher.update(b"\nvariables:");
        for (key, value) in &inputs.template_variables {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b";");
        }

        let digest = hasher.finalize();
        Self {
            hash: hex_encode(&digest),
        }
    }
}

/// Everything the manifest hash is computed from. Deliberately contains no
/// handles or closures: the working-directory builder and cache manager must
/// depend only on these immutable, serializable values, never on hidden
/// globals or ambient environment state not captured here.
#[derive(Debug, Clone, Default)]
pub struct ManifestInputs {
    pub generator_id: String,
    pub generator_version: Option<String>,
    pub inventory_fingerprints: Vec<String>,
    pub effective_source_order: Vec<String>,
    pub applicable_document_ids: Vec<String>,
    pub template_variables: BTreeMap<String, String>,
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_produce_identical_hash() {
        let inputs = ManifestInputs {
            generator_id: "spring".into(),
            generator_version: Some("7.14.0".into()),
            inventory_fingerprints: vec!["a".into(), "b".into()],
            effective_source_order: vec!["UserTemplate".into(), "GeneratorDefault".into()],
            applicable_document_ids: vec!["doc1".into()],
            template_variables: BTreeMap::new(),
        };
        let h1 = WorkingDirectoryManifest::compute(&inputs);
        let h2 = WorkingDirectoryManifest::compute(&inputs);
        assert_eq!(h1, h2);
    }

    #[test]
    fn variable_change_changes_hash() {
        let mut inputs = ManifestInputs {
            generator_id: "spring".into(),
            ..Default::default()
        };
        let h1 = WorkingDirectoryManifest::compute(&inputs);
        inputs
            .template_variables
            .insert("packageName".into(), "com.example".into());
        let h2 = WorkingDirectoryManifest::compute(&inputs);
        assert_ne!(h1, h2);
    }
}
