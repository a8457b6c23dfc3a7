//! Customization Engine (C5): applies one customization document's operations
//! to a template body, in the fixed order §4.5 specifies — replacements,
//! then smart replacements, then insertions, then smart insertions — folding
//! each document's output into the next. Guarded throughout by the condition
//! evaluator (C4).

pub mod partials;
pub mod semantic;

pub use partials::PartialsResolver;

use crate::condition::evaluate;
use crate::types::{
    Anchor, CustomizationDocument, EvaluationContext, FindInsertionPoint, FindPattern, InsertAt,
    Insertion, InsertionPointPattern, Replacement, ReplacementType, SmartInsertion,
    SmartInsertionDiscriminator, SmartReplacement, SmartReplacementDiscriminator,
};
use regex::Regex;
use semantic::SemanticCatalog;

/// Result of folding one document into a body.
pub struct ApplyOutcome {
    pub body: String,
    pub operations_applied: usize,
}

/// Applies `document` to `body`. `generator_id` selects the semantic catalog;
/// `ctx_base` carries everything an [`crate::types::EvaluationContext`] needs
/// except `template_body`, which this function overwrites with the
/// in-progress body before every condition check, since the DSL's
/// `templateContains`-family predicates reason about the *current* body, not
/// the document's starting point.
pub fn apply_document(
    body: &str,
    document: &CustomizationDocument,
    ctx_base: &EvaluationContext,
    partials: &PartialsResolver,
    generator_id: &str,
) -> ApplyOutcome {
    if let Some(cond) = &document.conditions {
        let ctx = ctx_base.clone().with_template_body(body);
        if !evaluate(cond, &ctx) {
            return ApplyOutcome {
                body: body.to_string(),
                operations_applied: 0,
            };
        }
    }

    let catalog = semantic::catalog_for(generator_id);
    let mut current = body.to_string();
    let mut applied = 0usize;

    for replacement in &document.replacements {
        if apply_replacement(replacement, &mut current, ctx_base, partials) {
            applied += 1;
        }
    }
    for smart in &document.smart_replacements {
        if apply_smart_replacement(smart, &mut current, ctx_base, partials, catalog) {
            applied += 1;
        }
    }
    for insertion in &document.insertions {
        if apply_insertion(insertion, &mut current, ctx_base, partials) {
            applied += 1;
        }
    }
    for smart in &document.smart_insertions {
        if apply_smart_insertion(smart, &mut current, ctx_base, partials, catalog) {
            applied += 1;
        }
    }

    ApplyOutcome {
        body: current,
        operations_applied: applied,
    }
}

fn conditions_allow(
    conditions: &Option<crate::types::ConditionSet>,
    current: &str,
    ctx_base: &EvaluationContext,
) -> bool {
    match conditions {
        Some(cond) => {
            let ctx = ctx_base.clone().with_template_body(current);
            evaluate(cond, &ctx)
        }
        None => true,
    }
}

fn apply_replacement(
    replacement: &Replacement,
    current: &mut String,
    ctx_base: &EvaluationContext,
    partials: &PartialsResolver,
) -> bool {
    if !conditions_allow(&replacement.conditions, current, ctx_base) {
        return try_fallback_replacement(replacement, current, ctx_base, partials);
    }

    let replace_text = partials.expand(&replacement.replace);
    let applied = match replacement.kind {
        ReplacementType::Literal => {
            if current.contains(replacement.find.as_str()) {
                *current = current.replace(replacement.find.as_str(), &replace_text);
                true
            } else {
                false
            }
        }
        ReplacementType::Regex => match Regex::new(&replacement.find) {
            Ok(re) if re.is_match(current) => {
                *current = re.replace_all(current, replace_text.as_str()).into_owned();
                true
            }
            _ => false,
        },
    };

    if applied {
        true
    } else {
        try_fallback_replacement(replacement, current, ctx_base, partials)
    }
}

fn try_fallback_replacement(
    replacement: &Replacement,
    current: &mut String,
    ctx_base: &EvaluationContext,
    partials: &PartialsResolver,
) -> bool {
    match &replacement.fallback {
        Some(fb) => apply_replacement(fb, current, ctx_base, partials),
        None => false,
    }
}

fn apply_smart_replacement(
    smart: &SmartReplacement,
    current: &mut String,
    ctx_base: &EvaluationContext,
    partials: &PartialsResolver,
    catalog: &dyn SemanticCatalog,
) -> bool {
    if !conditions_allow(&smart.conditions, current, ctx_base) {
        return false;
    }
    let Some((start, end)) = locate_smart_replacement_range(&smart.discriminator, current, catalog)
    else {
        return false;
    };
    let replace_text = partials.expand(&smart.replace);
    current.replace_range(start..end, &replace_text);
    true
}

fn locate_smart_replacement_range(
    disc: &SmartReplacementDiscriminator,
    body: &str,
    catalog: &dyn SemanticCatalog,
) -> Option<(usize, usize)> {
    if let Some(patterns) = &disc.find_any {
        for p in patterns {
            if let Some(pos) = body.find(p.as_str()) {
                return Some((pos, pos + p.len()));
            }
        }
        return None;
    }
    if let Some(key) = disc.semantic {
        return catalog.locate_replacement_range(key, body);
    }
    if let Some(find_pattern) = &disc.find_pattern {
        return locate_first_matching_variant(find_pattern, body);
    }
    None
}

fn locate_first_matching_variant(find_pattern: &FindPattern, body: &str) -> Option<(usize, usize)> {
    for variant in &find_pattern.variants {
        let found = match find_pattern.kind {
            ReplacementType::Literal => body.find(variant.as_str()).map(|pos| (pos, pos + variant.len())),
            ReplacementType::Regex => Regex::new(variant)
                .ok()
                .and_then(|re| re.find(body))
                .map(|m| (m.start(), m.end())),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn locate_insertion_point(anchor: &Anchor, body: &str) -> Option<usize> {
    if let Some(pattern) = &anchor.after {
        return body.find(pattern.as_str()).map(|pos| pos + pattern.len());
    }
    if let Some(pattern) = &anchor.before {
        return body.find(pattern.as_str());
    }
    match anchor.at {
        Some(InsertAt::Start) => Some(0),
        Some(InsertAt::End) => Some(body.len()),
        None => None,
    }
}

fn apply_insertion(
    insertion: &Insertion,
    current: &mut String,
    ctx_base: &EvaluationContext,
    partials: &PartialsResolver,
) -> bool {
    if conditions_allow(&insertion.conditions, current, ctx_base) {
        if let Some(pos) = locate_insertion_point(&insertion.anchor, current) {
            let content = partials.expand(&insertion.content);
            current.insert_str(pos, &content);
            return true;
        }
    }
    match &insertion.fallback {
        Some(fb) => apply_insertion(fb, current, ctx_base, partials),
        None => false,
    }
}

fn locate_smart_insertion_point(
    disc: &SmartInsertionDiscriminator,
    body: &str,
    catalog: &dyn SemanticCatalog,
) -> Option<usize> {
    if let Some(find_point) = &disc.find_insertion_point {
        return locate_first_insertion_pattern(find_point, body);
    }
    if let Some(point) = disc.semantic {
        return catalog.locate_insertion_point(point, body);
    }
    None
}

fn locate_first_insertion_pattern(find_point: &FindInsertionPoint, body: &str) -> Option<usize> {
    for candidate in &find_point.patterns {
        if let Some(pos) = locate_insertion_point_pattern(candidate, body) {
            return Some(pos);
        }
    }
    None
}

fn locate_insertion_point_pattern(pattern: &InsertionPointPattern, body: &str) -> Option<usize> {
    if let Some(p) = &pattern.after {
        return body.find(p.as_str()).map(|pos| pos + p.len());
    }
    if let Some(p) = &pattern.before {
        return body.find(p.as_str());
    }
    None
}

fn apply_smart_insertion(
    smart: &SmartInsertion,
    current: &mut String,
    ctx_base: &EvaluationContext,
    partials: &PartialsResolver,
    catalog: &dyn SemanticCatalog,
) -> bool {
    if conditions_allow(&smart.conditions, current, ctx_base) {
        if let Some(pos) = locate_smart_insertion_point(&smart.discriminator, current, catalog) {
            let content = partials.expand(&smart.content);
            current.insert_str(pos, &content);
            return true;
        }
    }
    match &smart.fallback {
        Some(fb) => apply_insertion(fb, current, ctx_base, partials),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Anchor, ConditionSet, FindPattern, InsertAt, Insertion, Replacement, ReplacementType,
        SemanticInsertionPoint, SemanticReplacementKey,
    };

    fn ctx() -> EvaluationContext {
        EvaluationContext::default()
    }

    fn document(
        replacements: Vec<Replacement>,
        smart_replacements: Vec<SmartReplacement>,
        insertions: Vec<Insertion>,
        smart_insertions: Vec<SmartInsertion>,
    ) -> CustomizationDocument {
        CustomizationDocument {
            replacements,
            smart_replacements,
            insertions,
            smart_insertions,
            ..Default::default()
        }
    }

    #[test]
    fn literal_replacement_replaces_all_occurrences() {
        let doc = document(
            vec![Replacement {
                find: "Foo".into(),
                replace: "Bar".into(),
                kind: ReplacementType::Literal,
                conditions: None,
                fallback: None,
            }],
            vec![],
            vec![],
            vec![],
        );
        let out = apply_document("class Foo extends Foo {}", &doc, &ctx(), &PartialsResolver::default(), "java");
        assert_eq!(out.body, "class Bar extends Bar {}");
        assert_eq!(out.operations_applied, 1);
    }

    #[test]
    fn replacement_falls_back_when_find_is_absent() {
        let doc = document(
            vec![Replacement {
                find: "NeverThere".into(),
                replace: "X".into(),
                kind: ReplacementType::Literal,
                conditions: None,
                fallback: Some(Box::new(Replacement {
                    find: "class".into(),
                    replace: "final class".into(),
                    kind: ReplacementType::Literal,
                    conditions: None,
                    fallback: None,
                })),
            }],
            vec![],
            vec![],
            vec![],
        );
        let out = apply_document("class Foo {}", &doc, &ctx(), &PartialsResolver::default(), "java");
        assert_eq!(out.body, "final class Foo {}");
        assert_eq!(out.operations_applied, 1);
    }

    #[test]
    fn insertion_with_gated_condition_is_skipped_when_condition_false() {
        let doc = document(
            vec![],
            vec![],
            vec![Insertion {
                anchor: Anchor { at: Some(InsertAt::End), ..Default::default() },
                content: "// extra\n".into(),
                conditions: Some(ConditionSet::HasFeature("useLombok".into())),
                fallback: None,
            }],
            vec![],
        );
        let out = apply_document("class Foo {}\n", &doc, &ctx(), &PartialsResolver::default(), "java");
        assert_eq!(out.body, "class Foo {}\n");
        assert_eq!(out.operations_applied, 0);
    }

    #[test]
    fn smart_replacement_semantic_key_replaces_class_declaration_line() {
        let doc = document(
            vec![],
            vec![SmartReplacement {
                discriminator: SmartReplacementDiscriminator {
                    semantic: Some(SemanticReplacementKey::ClassDeclaration),
                    ..Default::default()
                },
                replace: "public final class Foo {".into(),
                conditions: None,
            }],
            vec![],
            vec![],
        );
        let out = apply_document(
            "public class Foo {\n}\n",
            &doc,
            &ctx(),
            &PartialsResolver::default(),
            "java",
        );
        assert!(out.body.starts_with("public final class Foo {"));
        assert_eq!(out.operations_applied, 1);
    }

    #[test]
    fn smart_insertion_semantic_point_inserts_after_imports() {
        let doc = document(
            vec![],
            vec![],
            vec![],
            vec![SmartInsertion {
                discriminator: SmartInsertionDiscriminator {
                    semantic: Some(SemanticInsertionPoint::EndOfImports),
                    ..Default::default()
                },
                content: "import com.example.Extra;\n".into(),
                conditions: None,
                fallback: None,
            }],
        );
        let body = "package p;\n\nimport a.B;\n\npublic class X {}\n";
        let out = apply_document(body, &doc, &ctx(), &PartialsResolver::default(), "java");
        assert_eq!(
            out.body,
            "package p;\n\nimport a.B;\nimport com.example.Extra;\n\npublic class X {}\n"
        );
    }

    #[test]
    fn smart_insertion_falls_back_to_plain_insertion_when_point_not_found() {
        let doc = document(
            vec![],
            vec![],
            vec![],
            vec![SmartInsertion {
                discriminator: SmartInsertionDiscriminator {
                    find_insertion_point: Some(FindInsertionPoint {
                        patterns: vec![InsertionPointPattern {
                            after: Some("NOPE".into()),
                            before: None,
                        }],
                    }),
                    semantic: None,
                },
                content: "// smart\n".into(),
                conditions: None,
                fallback: Some(Box::new(Insertion {
                    anchor: Anchor { at: Some(InsertAt::End), ..Default::default() },
                    content: "// fallback\n".into(),
                    conditions: None,
                    fallback: None,
                })),
            }],
        );
        let out = apply_document("class X {}\n", &doc, &ctx(), &PartialsResolver::default(), "java");
        assert_eq!(out.body, "class X {}\n// fallback\n");
    }

    #[test]
    fn document_level_condition_gates_entire_document() {
        let mut doc = document(
            vec![Replacement {
                find: "X".into(),
                replace: "Y".into(),
                kind: ReplacementType::Literal,
                conditions: None,
                fallback: None,
            }],
            vec![],
            vec![],
            vec![],
        );
        doc.conditions = Some(ConditionSet::HasFeature("reactive".into()));
        let out = apply_document("class X {}\n", &doc, &ctx(), &PartialsResolver::default(), "java");
        assert_eq!(out.body, "class X {}\n");
        assert_eq!(out.operations_applied, 0);
    }

    #[test]
    fn content_with_partial_reference_is_expanded_before_insertion() {
        let mut doc = document(
            vec![],
            vec![],
            vec![Insertion {
                anchor: Anchor { at: Some(InsertAt::Start), ..Default::default() },
                content: "{{> header}}".into(),
                conditions: None,
                fallback: None,
            }],
            vec![],
        );
        doc.partials.insert("header".into(), "// generated\n".into());
        let partials = PartialsResolver::from_documents_lowest_first(vec![&doc]);
        let out = apply_document("class X {}\n", &doc, &ctx(), &partials, "java");
        assert_eq!(out.body, "// generated\nclass X {}\n");
    }
}
