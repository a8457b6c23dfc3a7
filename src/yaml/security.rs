use crate::error::SecurityError;
use crate::types::CustomizationDocument;

/// Tokens that make a customization's `content`/`find`/`replace`/`partials.*`
/// fields an anti-deserialization-gadget / code-execution vector rather than
/// a surgical text edit. Rejection is fatal for the document, not the run.
const DANGEROUS_TOKENS: &[&str] = &[
    "<%", // JSP-style directive
    "<%@",
    "Runtime.getRuntime",
    "ProcessBuilder",
    "System.exit",
    "<script",
    "javascript:",
    "file://",
    "exec(",
    "<!--#include", // server-side include
];

pub fn scan_for_dangerous_tokens(path: &str, document: &CustomizationDocument) -> Vec<SecurityError> {
    let mut findings = Vec::new();

    for insertion in &document.insertions {
        scan_field(path, "insertions[].content", &insertion.content, &mut findings);
    }
    for replacement in &document.replacements {
        scan_field(path, "replacements[].find", &replacement.find, &mut findings);
        scan_field(path, "replacements[].replace", &replacement.replace, &mut findings);
    }
    for smart in &document.smart_replacements {
        scan_field(path, "smartReplacements[].replace", &smart.replace, &mut findings);
        if let Some(patterns) = &smart.discriminator.find_any {
            for p in patterns {
                scan_field(path, "smartReplacements[].findAny", p, &mut findings);
            }
        }
    }
    for smart in &document.smart_insertions {
        scan_field(path, "smartInsertions[].content", &smart.content, &mut findings);
    }
    for (name, body) in &document.partials {
        scan_field(path, &format!("partials.{name}"), body, &mut findings);
    }

    findings
}

fn scan_field(path: &str, field: &str, value: &str, out: &mut Vec<SecurityError>) {
    for token in DANGEROUS_TOKENS {
        if value.contains(token) {
            out.push(SecurityError {
                path: path.to_string(),
                field: field.to_string(),
                token: token.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Anchor, InsertAt, Insertion};

    #[test]
    fn detects_process_builder() {
        let doc = CustomizationDocument {
            insertions: vec![Insertion {
                anchor: Anchor {
                    at: Some(InsertAt::Start),
                    ..Default::default()
                },
                content: "new ProcessBuilder(\"sh\").start();".to_string(),
                conditions: None,
                fallback: None,
            }],
            ..Default::default()
        };
        let findings = scan_for_dangerous_tokens("x.yaml", &doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].token, "ProcessBuilder");
    }

    #[test]
    fn clean_content_has_no_findings() {
        let doc = CustomizationDocument {
            insertions: vec![Insertion {
                anchor: Anchor {
                    at: Some(InsertAt::Start),
                    ..Default::default()
                },
                content: "// a normal header comment\n".to_string(),
                conditions: None,
                fallback: None,
            }],
            ..Default::default()
        };
        assert!(scan_for_dangerous_tokens("x.yaml", &doc).is_empty());
    }
}
