//! YAML Loader & Validator (C3): parses a customization document, rejects
//! unsafe or malformed input, and normalizes it to the internal model.

mod security;

pub use security::scan_for_dangerous_tokens;

use crate::error::{SecurityError, YamlError};
use crate::types::{CustomizationDocument, FindPattern, Insertion, Replacement, ReplacementType};

const MAX_ALIAS_COUNT: usize = 50;

/// Outcome of loading one customization file: either a usable document, or
/// the full list of collected errors (the loader reports every problem found,
/// not just the first — §4.3).
pub enum LoadOutcome {
    Document(CustomizationDocument),
    Rejected(Vec<LoadError>),
}

#[derive(Debug)]
pub enum LoadError {
    Yaml(YamlError),
    Security(SecurityError),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Yaml(e) => write!(f, "{e}"),
            LoadError::Security(e) => write!(f, "{e}"),
        }
    }
}

/// Parses and validates one customization document's raw text.
///
/// `path` is used only for diagnostics. `document_id` is stamped onto the
/// resulting document so later provenance (e.g. `.source-resolution-cache`)
/// can name it even when `metadata.name` is absent.
pub fn load(path: &str, document_id: &str, raw: &str) -> LoadOutcome {
    let mut errors = Vec::new();

    if let Err(e) = check_duplicate_keys(path, raw) {
        errors.push(LoadError::Yaml(e));
    }

    match check_alias_bounds(path, raw) {
        Ok(()) => {}
        Err(e) => errors.push(LoadError::Yaml(e)),
    }

    let mut document: CustomizationDocument = match serde_yaml::from_str(raw) {
        Ok(doc) => doc,
        Err(e) => {
            errors.push(LoadError::Yaml(YamlError::Parse {
                path: path.to_string(),
                reason: e.to_string(),
            }));
            return LoadOutcome::Rejected(errors);
        }
    };

    if document.is_empty_of_operations() {
        errors.push(LoadError::Yaml(YamlError::EmptyDocument {
            path: path.to_string(),
        }));
    }

    for insertion in &document.insertions {
        check_anchor_shape(path, insertion, &mut errors);
    }
    for smart_insertion in &document.smart_insertions {
        check_discriminator_shape(
            path,
            "smartInsertion",
            &[
                smart_insertion.discriminator.find_insertion_point.is_some(),
                smart_insertion.discriminator.semantic.is_some(),
            ],
            &mut errors,
        );
        if let Some(fallback) = &smart_insertion.fallback {
            check_anchor_shape(path, fallback, &mut errors);
        }
    }
    for smart_replacement in &document.smart_replacements {
        check_discriminator_shape(
            path,
            "smartReplacement",
            &[
                smart_replacement.discriminator.find_any.is_some(),
                smart_replacement.discriminator.semantic.is_some(),
                smart_replacement.discriminator.find_pattern.is_some(),
            ],
            &mut errors,
        );
        if let Some(pattern) = &smart_replacement.discriminator.find_pattern {
            check_find_pattern_regex(path, pattern, &mut errors);
        }
    }
    for replacement in &document.replacements {
        check_replacement_regex(path, replacement, &mut errors);
    }

    for finding in scan_for_dangerous_tokens(path, &document) {
        errors.push(LoadError::Security(finding));
    }

    if !errors.is_empty() {
        return LoadOutcome::Rejected(errors);
    }

    document.document_id = Some(document_id.to_string());
    LoadOutcome::Document(document)
}

/// `serde_yaml::Value` deduplicates mapping keys silently (last one wins),
/// so duplicates must be caught before that normalization, directly over the
/// raw text. This is an indentation-tracking scanner, not a full YAML
/// grammar: it groups `key:` lines by indentation level (treating a `- `
/// list-item marker as opening a new level at `indent + 2`) and flags a
/// second occurrence of the same key within one level. Good enough for the
/// DSL's shape (flat mappings, shallow list-of-mapping nesting); it does not
/// attempt to handle flow-style `{ }` mappings, which the DSL doesn't use.
fn check_duplicate_keys(path: &str, raw: &str) -> Result<(), YamlError> {
    let key_line = regex::Regex::new(r"^(\s*)(-\s+)?([A-Za-z_][A-Za-z0-9_-]*):(\s|$)").unwrap();
    let mut stack: Vec<(usize, std::collections::HashSet<String>)> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let Some(caps) = key_line.captures(line) else {
            continue;
        };
        let base_indent = caps.get(1).unwrap().as_str().len();
        let list_marker = caps.get(2);
        let key = caps.get(3).unwrap().as_str().to_string();
        let effective_indent = base_indent + list_marker.map(|m| m.as_str().len()).unwrap_or(0);

        while stack.last().is_some_and(|(indent, _)| *indent > effective_indent) {
            stack.pop();
        }

        if list_marker.is_some() {
            // A list item always opens a fresh mapping scope.
            stack.push((effective_indent, std::collections::HashSet::new()));
        }

        match stack.last_mut() {
            Some((indent, keys)) if *indent == effective_indent => {
                if !keys.insert(key.clone()) {
                    return Err(YamlError::DuplicateKey {
                        path: path.to_string(),
                        key,
                    });
                }
            }
            _ => {
                let mut keys = std::collections::HashSet::new();
                keys.insert(key.clone());
                stack.push((effective_indent, keys));
            }
        }
    }
    Ok(())
}

/// Counts `*alias` occurrences in the raw text as a conservative bound check;
/// a full anchor/alias graph walk happens implicitly because `serde_yaml`
/// refuses to expand cyclic anchors (surfaced as a parse error, which is
/// reported as `YamlError::Parse` above, not `RecursiveAnchor` — that variant
/// is reserved for engines whose parser would otherwise loop).
fn check_alias_bounds(path: &str, raw: &str) -> Result<(), YamlError> {
    let count = raw
        .lines()
        .flat_map(|line| line.split_whitespace())
        .filter(|token| token.starts_with('*'))
        .count();
    if count > MAX_ALIAS_COUNT {
        return Err(YamlError::TooManyAliases {
            path: path.to_string(),
            count,
            bound: MAX_ALIAS_COUNT,
        });
    }
    Ok(())
}

/// Walks an insertion's anchor and, recursively, every `fallback` chain link,
/// rejecting any that sets zero or more than one of `after`/`before`/`at`
/// (§3/§4.3: "exactly one anchor").
fn check_anchor_shape(path: &str, insertion: &Insertion, errors: &mut Vec<LoadError>) {
    let set_count = [
        insertion.anchor.after.is_some(),
        insertion.anchor.before.is_some(),
        insertion.anchor.at.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if set_count != 1 {
        errors.push(LoadError::Yaml(YamlError::SchemaViolation {
            path: path.to_string(),
            reason: format!(
                "insertion must set exactly one of after/before/at, found {set_count}"
            ),
        }));
    }
    if let Some(fallback) = &insertion.fallback {
        check_anchor_shape(path, fallback, errors);
    }
}

/// Rejects a smart-variant discriminator that sets zero or more than one of
/// its mutually exclusive fields (§3: "exactly one discriminator").
fn check_discriminator_shape(path: &str, kind: &str, flags: &[bool], errors: &mut Vec<LoadError>) {
    let set_count = flags.iter().filter(|set| **set).count();
    if set_count != 1 {
        errors.push(LoadError::Yaml(YamlError::SchemaViolation {
            path: path.to_string(),
            reason: format!("{kind} must set exactly one discriminator, found {set_count}"),
        }));
    }
}

/// Compiles every regex `find` in a replacement's fallback chain, and every
/// regex-typed `FindPattern` variant, rejecting at load time rather than
/// silently skipping the pattern when it's applied (§3 Replacement: "For
/// regex, `find` must compile").
fn check_replacement_regex(path: &str, replacement: &Replacement, errors: &mut Vec<LoadError>) {
    if replacement.kind == ReplacementType::Regex {
        if let Err(e) = regex::Regex::new(&replacement.find) {
            errors.push(LoadError::Yaml(YamlError::SchemaViolation {
                path: path.to_string(),
                reason: format!("replacement regex {:?} failed to compile: {e}", replacement.find),
            }));
        }
    }
    if let Some(fallback) = &replacement.fallback {
        check_replacement_regex(path, fallback, errors);
    }
}

fn check_find_pattern_regex(path: &str, pattern: &FindPattern, errors: &mut Vec<LoadError>) {
    if pattern.kind != ReplacementType::Regex {
        return;
    }
    for variant in &pattern.variants {
        if let Err(e) = regex::Regex::new(variant) {
            errors.push(LoadError::Yaml(YamlError::SchemaViolation {
                path: path.to_string(),
                reason: format!("findPattern regex {variant:?} failed to compile: {e}"),
            }));
        }
    }
}
