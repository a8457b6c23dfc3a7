use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The boolean predicate language evaluated by the condition evaluator (C4)
/// against an [`EvaluationContext`]. Modeled as a tagged sum type with owned
/// children — the algebra is naturally recursive (`allOf`/`anyOf`/`not`) and
/// needs no back-references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionSet {
    GeneratorVersion(String),
    TemplateContains(String),
    TemplateNotContains(String),
    TemplateContainsAll(Vec<String>),
    TemplateContainsAny(Vec<String>),
    HasFeature(String),
    HasAllFeatures(Vec<String>),
    HasAnyFeatures(Vec<String>),
    ProjectProperty(String),
    EnvironmentVariable(String),
    BuildType(String),
    AllOf(Vec<ConditionSet>),
    AnyOf(Vec<ConditionSet>),
    Not(Box<ConditionSet>),
}

/// Context a [`ConditionSet`] is evaluated against. Threaded explicitly
/// through C4/C5 call chains instead of via thread-locals, per the "Global
/// state -> explicit context" design note.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub template_body: String,
    pub detected_generator_version: Option<String>,
    pub features: BTreeSet<String>,
    pub project_properties: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
    pub build_type: Option<String>,
}

impl EvaluationContext {
    pub fn with_template_body(mut self, body: impl Into<String>) -> Self {
        self.template_body = body.into();
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    pub fn with_generator_version(mut self, version: impl Into<String>) -> Self {
        self.detected_generator_version = Some(version.into());
        self
    }

    pub fn with_project_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.project_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_environment_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_build_type(mut self, build_type: impl Into<String>) -> Self {
        self.build_type = Some(build_type.into());
        self
    }
}
