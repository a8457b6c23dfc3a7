//! Layered configuration surface: a flat, language-neutral key/value model
//! deserializable from a YAML/TOML file or constructed programmatically by
//! the embedding host.

use crate::error::ConfigurationError;
use crate::types::{SourceKind, SOURCE_CATEGORY_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreparationConfig {
    #[serde(rename = "templateSources")]
    pub template_sources: Vec<String>,

    #[serde(default = "default_true")]
    pub parallel: bool,

    #[serde(default, rename = "debugTemplateResolution")]
    pub debug_template_resolution: bool,

    #[serde(default, rename = "templateVariables")]
    pub template_variables: BTreeMap<String, String>,

    #[serde(default, rename = "userTemplateDir")]
    pub user_template_dir: Option<PathBuf>,

    #[serde(default, rename = "userTemplateCustomizationsDir")]
    pub user_template_customizations_dir: Option<PathBuf>,

    #[serde(rename = "generatorName")]
    pub generator_name: String,

    #[serde(default, rename = "generatorVersion")]
    pub generator_version: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Top-level keys `PreparationConfig` accepts, mirrored from its `#[serde]`
/// renames, used to produce a helpful suggestion for an unknown key instead
/// of relying on serde's own (suggestion-free) unknown-field error.
const KNOWN_KEYS: &[&str] = &[
    "templateSources",
    "parallel",
    "debugTemplateResolution",
    "templateVariables",
    "userTemplateDir",
    "userTemplateCustomizationsDir",
    "generatorName",
    "generatorVersion",
];

/// Parses a `PreparationConfig` from raw YAML, checking top-level keys
/// against [`KNOWN_KEYS`] first so an unknown key is reported with a
/// [`suggest_key`] suggestion (§6) rather than serde's generic
/// `deny_unknown_fields` error, which carries no alternatives.
pub fn parse(raw: &str) -> Result<PreparationConfig, ConfigurationError> {
    let value: serde_yaml::Value = serde_yaml::from_str(raw).map_err(|e| ConfigurationError::Parse {
        reason: e.to_string(),
    })?;

    if let serde_yaml::Value::Mapping(map) = &value {
        for key in map.keys() {
            if let Some(key) = key.as_str() {
                if !KNOWN_KEYS.contains(&key) {
                    return Err(ConfigurationError::UnknownKey {
                        key: key.to_string(),
                        suggestion: suggest_key(key, KNOWN_KEYS),
                    });
                }
            }
        }
    }

    serde_yaml::from_value(value).map_err(|e| ConfigurationError::Parse {
        reason: e.to_string(),
    })
}

impl PreparationConfig {
    /// Validates the configuration surface: rejects unknown `templateSources`
    /// entries (listing valid alternatives, per §6) and an empty ordering.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.template_sources.is_empty() {
            return Err(ConfigurationError::EmptySourceOrder);
        }
        for name in &self.template_sources {
            if !SOURCE_CATEGORY_NAMES.contains(&name.as_str()) {
                return Err(ConfigurationError::UnknownSource {
                    name: name.clone(),
                    valid: SOURCE_CATEGORY_NAMES.to_vec(),
                });
            }
        }
        Ok(())
    }

    /// The configured ordering as source *categories* (library tiers carry no
    /// index yet; the resolver expands `LibraryTemplate`/`LibraryCustomization`
    /// per discovered library when intersecting with the inventory).
    pub fn source_categories(&self) -> Vec<&str> {
        self.template_sources.iter().map(String::as_str).collect()
    }

    pub fn default_source_order() -> Vec<String> {
        SOURCE_CATEGORY_NAMES.iter().map(|s| s.to_string()).collect()
    }
}

/// Suggests the closest valid key by edit distance, for "unknown
/// configuration keys are rejected ... with valid alternatives listed" (§6).
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|candidate| (candidate, levenshtein(unknown, candidate)))
        .min_by_key(|(_, distance)| *distance)
        .filter(|(_, distance)| *distance <= 3)
        .map(|(candidate, _)| candidate.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let temp = row[j + 1];
            row[j + 1] = if ca == cb {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j + 1])
            };
            prev_diag = temp;
        }
    }
    row[b.len()]
}

/// Expands a configured source-category list into concrete [`SourceKind`]
/// values, fanning a `LibraryTemplate`/`LibraryCustomization` category entry
/// out across every discovered library index, in the order libraries were
/// supplied.
pub fn expand_source_order(categories: &[&str], library_count: usize) -> Vec<SourceKind> {
    let mut out = Vec::new();
    for category in categories {
        match *category {
            "UserTemplate" => out.push(SourceKind::UserTemplate),
            "UserCustomization" => out.push(SourceKind::UserCustomization),
            "PluginCustomization" => out.push(SourceKind::PluginCustomization),
            "GeneratorDefault" => out.push(SourceKind::GeneratorDefault),
            "LibraryTemplate" => {
                for idx in 0..library_count {
                    out.push(SourceKind::LibraryTemplate { library_index: idx });
                }
            }
            "LibraryCustomization" => {
                for idx in 0..library_count {
                    out.push(SourceKind::LibraryCustomization { library_index: idx });
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_source_name() {
        let config = PreparationConfig {
            template_sources: vec!["Bogus".into()],
            parallel: true,
            debug_template_resolution: false,
            template_variables: BTreeMap::new(),
            user_template_dir: None,
            user_template_customizations_dir: None,
            generator_name: "spring".into(),
            generator_version: None,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::UnknownSource { .. })
        ));
    }

    #[test]
    fn suggest_key_finds_close_match() {
        let valid = ["templateSources", "parallel", "generatorName"];
        assert_eq!(
            suggest_key("templateSource", &valid),
            Some("templateSources".to_string())
        );
    }

    #[test]
    fn parse_rejects_unknown_key_with_suggestion() {
        let raw = "templateSorces:\n  - UserTemplate\ngeneratorName: spring\n";
        let err = parse(raw).unwrap_err();
        match err {
            ConfigurationError::UnknownKey { key, suggestion } => {
                assert_eq!(key, "templateSorces");
                assert_eq!(suggestion, Some("templateSources".to_string()));
            }
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }

    #[test]
    fn parse_accepts_known_keys() {
        let raw = "templateSources:\n  - UserTemplate\ngeneratorName: spring\n";
        let config = parse(raw).unwrap();
        assert_eq!(config.generator_name, "spring");
        assert_eq!(config.template_sources, vec!["UserTemplate".to_string()]);
    }

    #[test]
    fn expand_source_order_fans_out_libraries() {
        let expanded = expand_source_order(&["LibraryTemplate", "UserTemplate"], 3);
        assert_eq!(
            expanded,
            vec![
                SourceKind::LibraryTemplate { library_index: 0 },
                SourceKind::LibraryTemplate { library_index: 1 },
                SourceKind::LibraryTemplate { library_index: 2 },
                SourceKind::UserTemplate,
            ]
        );
    }
}
