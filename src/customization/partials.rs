//! Partial expansion: `{{> name}}` references inside a customization's own
//! `content`/`replace` strings are expanded once, before that string is
//! spliced into the template body. A reference to a name this resolver
//! doesn't carry is left untouched — it then reads as an ordinary template
//! partial reference and falls to the working-directory builder's (C7)
//! transitive dependency discovery instead of failing here.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::types::CustomizationDocument;

static PARTIAL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{>\s*([A-Za-z0-9_.-]+)\s*\}\}").unwrap());

#[derive(Debug, Clone, Default)]
pub struct PartialsResolver {
    map: BTreeMap<String, String>,
}

impl PartialsResolver {
    /// Merges the `partials` map of each document, lowest precedence first.
    /// A later document's entry for the same name overwrites an earlier one,
    /// matching the fold order the resolver (C6) applies to everything else.
    pub fn from_documents_lowest_first<'a>(
        documents: impl IntoIterator<Item = &'a CustomizationDocument>,
    ) -> Self {
        let mut map = BTreeMap::new();
        for doc in documents {
            for (name, body) in &doc.partials {
                map.insert(name.clone(), body.clone());
            }
        }
        Self { map }
    }

    pub fn expand(&self, content: &str) -> String {
        PARTIAL_REF
            .replace_all(content, |caps: &regex::Captures| {
                let name = &caps[1];
                self.map.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Anchor, InsertAt, Insertion};

    fn doc_with_partial(name: &str, body: &str) -> CustomizationDocument {
        let mut doc = CustomizationDocument {
            insertions: vec![Insertion {
                anchor: Anchor { at: Some(InsertAt::Start), ..Default::default() },
                content: String::new(),
                conditions: None,
                fallback: None,
            }],
            ..Default::default()
        };
        doc.partials.insert(name.to_string(), body.to_string());
        doc
    }

    #[test]
    fn expands_known_partial() {
        let resolver = PartialsResolver::from_documents_lowest_first(vec![&doc_with_partial(
            "header",
            "// generated\n",
        )]);
        assert_eq!(resolver.expand("{{> header}}body"), "// generated\nbody");
    }

    #[test]
    fn leaves_unknown_partial_untouched() {
        let resolver = PartialsResolver::default();
        assert_eq!(resolver.expand("{{>missing}}"), "{{>missing}}");
    }

    #[test]
    fn later_document_wins_on_name_collision() {
        let low = doc_with_partial("x", "low");
        let high = doc_with_partial("x", "high");
        let resolver = PartialsResolver::from_documents_lowest_first(vec![&low, &high]);
        assert_eq!(resolver.expand("{{>x}}"), "high");
    }
}
