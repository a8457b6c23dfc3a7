//! Condition Evaluator (C4): evaluates the boolean predicate language against
//! a template-and-environment context. Never throws — a leaf referencing
//! missing context evaluates to `false`.

mod semver;

pub use semver::{compare_versions, VersionConstraint};

use crate::types::{ConditionSet, EvaluationContext};

const BUILTIN_FEATURES: &[&str] = &[
    "useBeanValidation",
    "useOptional",
    "useJakartaEe",
    "reactive",
    "useLombok",
    "recordModels",
];

pub fn evaluate(condition: &ConditionSet, ctx: &EvaluationContext) -> bool {
    match condition {
        ConditionSet::GeneratorVersion(constraint) => match &ctx.detected_generator_version {
            Some(detected) => VersionConstraint::parse(constraint)
                .map(|c| c.matches(detected))
                .unwrap_or(false),
            None => false,
        },
        ConditionSet::TemplateContains(needle) => ctx.template_body.contains(needle.as_str()),
        ConditionSet::TemplateNotContains(needle) => !ctx.template_body.contains(needle.as_str()),
        ConditionSet::TemplateContainsAll(needles) => {
            needles.iter().all(|n| ctx.template_body.contains(n.as_str()))
        }
        ConditionSet::TemplateContainsAny(needles) => {
            needles.iter().any(|n| ctx.template_body.contains(n.as_str()))
        }
        ConditionSet::HasFeature(name) => has_feature(name, ctx),
        ConditionSet::HasAllFeatures(names) => names.iter().all(|n| has_feature(n, ctx)),
        ConditionSet::HasAnyFeatures(names) => names.iter().any(|n| has_feature(n, ctx)),
        ConditionSet::ProjectProperty(spec) => eval_kv(spec, &ctx.project_properties),
        ConditionSet::EnvironmentVariable(spec) => eval_kv(spec, &ctx.environment),
        ConditionSet::BuildType(expected) => {
            ctx.build_type.as_deref() == Some(expected.as_str())
        }
        ConditionSet::AllOf(children) => children.iter().all(|c| evaluate(c, ctx)),
        ConditionSet::AnyOf(children) => children.iter().any(|c| evaluate(c, ctx)),
        ConditionSet::Not(child) => !evaluate(child, ctx),
    }
}

fn has_feature(name: &str, ctx: &EvaluationContext) -> bool {
    if !BUILTIN_FEATURES.contains(&name) && !name.starts_with("custom_") {
        return false;
    }
    ctx.features.contains(name)
}

/// Accepts either `"k"` (presence check) or `"k=v"` (exact value check).
fn eval_kv(spec: &str, map: &std::collections::BTreeMap<String, String>) -> bool {
    match spec.split_once('=') {
        Some((key, value)) => map.get(key).map(|v| v == value).unwrap_or(false),
        None => map.contains_key(spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EvaluationContext {
        EvaluationContext::default()
    }

    #[test]
    fn empty_all_of_is_true() {
        assert!(evaluate(&ConditionSet::AllOf(vec![]), &ctx()));
    }

    #[test]
    fn empty_any_of_is_false() {
        assert!(!evaluate(&ConditionSet::AnyOf(vec![]), &ctx()));
    }

    #[test]
    fn not_not_is_identity_for_decidable_leaves() {
        let leaf = ConditionSet::BuildType("debug".into());
        let double_not = ConditionSet::Not(Box::new(ConditionSet::Not(Box::new(leaf.clone()))));
        let c = ctx().with_build_type("debug");
        assert_eq!(evaluate(&leaf, &c), evaluate(&double_not, &c));
    }

    #[test]
    fn missing_context_leaf_is_false() {
        let c = ctx();
        assert!(!evaluate(&ConditionSet::GeneratorVersion(">=8.0.0".into()), &c));
    }

    #[test]
    fn template_contains_is_literal_substring() {
        let c = ctx().with_template_body("class Foo { @Schema(description = \"x\") }");
        assert!(evaluate(
            &ConditionSet::TemplateContains("@Schema(".into()),
            &c
        ));
        assert!(!evaluate(
            &ConditionSet::TemplateContains("@NotFound(".into()),
            &c
        ));
    }

    #[test]
    fn has_feature_accepts_custom_prefixed_names() {
        let c = ctx().with_feature("custom_thing");
        assert!(evaluate(&ConditionSet::HasFeature("custom_thing".into()), &c));
    }

    #[test]
    fn has_feature_rejects_unknown_non_custom_names() {
        let mut c = ctx();
        c.features.insert("totallyMadeUp".into());
        assert!(!evaluate(&ConditionSet::HasFeature("totallyMadeUp".into()), &c));
    }

    #[test]
    fn project_property_supports_presence_and_value_forms() {
        let c = ctx().with_project_property("useLombok", "true");
        assert!(evaluate(&ConditionSet::ProjectProperty("useLombok".into()), &c));
        assert!(evaluate(
            &ConditionSet::ProjectProperty("useLombok=true".into()),
            &c
        ));
        assert!(!evaluate(
            &ConditionSet::ProjectProperty("useLombok=false".into()),
            &c
        ));
    }
}
