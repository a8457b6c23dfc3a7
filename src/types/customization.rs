use serde::{Deserialize, Serialize};

/// A literal substring or regular expression, tagged by where it's used.
/// Most DSL fields are plain `String`; this alias documents intent.
pub type Pattern = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementType {
    Literal,
    Regex,
}

impl Default for ReplacementType {
    fn default() -> Self {
        ReplacementType::Literal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertAt {
    Start,
    End,
}

/// Exactly one of `after`, `before`, `at` must be set; enforced at load time
/// by the YAML validator rather than by the shape of this type, so that a
/// document with multiple anchors can be rejected with a precise diagnostic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(default)]
    pub after: Option<Pattern>,
    #[serde(default)]
    pub before: Option<Pattern>,
    #[serde(default)]
    pub at: Option<InsertAt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insertion {
    #[serde(flatten)]
    pub anchor: Anchor,
    pub content: String,
    #[serde(default)]
    pub conditions: Option<crate::types::condition::ConditionSet>,
    #[serde(default)]
    pub fallback: Option<Box<Insertion>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
    pub find: Pattern,
    #[serde(default)]
    pub replace: String,
    #[serde(default, rename = "type")]
    pub kind: ReplacementType,
    #[serde(default)]
    pub conditions: Option<crate::types::condition::ConditionSet>,
    #[serde(default)]
    pub fallback: Option<Box<Replacement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPattern {
    #[serde(default, rename = "type")]
    pub kind: ReplacementType,
    pub variants: Vec<Pattern>,
}

/// Exactly one of `find_any`, `semantic`, `find_pattern` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartReplacementDiscriminator {
    #[serde(default)]
    pub find_any: Option<Vec<Pattern>>,
    #[serde(default)]
    pub semantic: Option<SemanticReplacementKey>,
    #[serde(default)]
    pub find_pattern: Option<FindPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartReplacement {
    #[serde(flatten)]
    pub discriminator: SmartReplacementDiscriminator,
    pub replace: String,
    #[serde(default)]
    pub conditions: Option<crate::types::condition::ConditionSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionPointPattern {
    #[serde(default)]
    pub after: Option<Pattern>,
    #[serde(default)]
    pub before: Option<Pattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindInsertionPoint {
    pub patterns: Vec<InsertionPointPattern>,
}

/// Exactly one of `find_insertion_point`, `semantic` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartInsertionDiscriminator {
    #[serde(default)]
    pub find_insertion_point: Option<FindInsertionPoint>,
    #[serde(default)]
    pub semantic: Option<SemanticInsertionPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartInsertion {
    #[serde(flatten)]
    pub discriminator: SmartInsertionDiscriminator,
    pub content: String,
    #[serde(default)]
    pub conditions: Option<crate::types::condition::ConditionSet>,
    #[serde(default)]
    pub fallback: Option<Box<Insertion>>,
}

/// Closed enum of named locations resolved by a per-generator probe rather
/// than by a literal pattern. See the semantic catalog in `customization::semantic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticInsertionPoint {
    StartOfFile,
    EndOfFile,
    AfterLicense,
    AfterPackage,
    EndOfImports,
    AfterClassDeclaration,
    AfterModelDeclaration,
    BeforeClassEnd,
    AfterConstructor,
    AfterFields,
    AfterGettersSetters,
}

/// Closed enum of named byte ranges usable as a `smartReplacements.semantic`
/// discriminator. Distinct from [`SemanticInsertionPoint`] because a
/// replacement target is a *range*, not a point, though several names overlap
/// in spirit (e.g. the class declaration line itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticReplacementKey {
    ClassDeclaration,
    PackageDeclaration,
    License,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomizationDocument {
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
    #[serde(default)]
    pub conditions: Option<crate::types::condition::ConditionSet>,
    #[serde(default)]
    pub insertions: Vec<Insertion>,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    #[serde(default, rename = "smartReplacements")]
    pub smart_replacements: Vec<SmartReplacement>,
    #[serde(default, rename = "smartInsertions")]
    pub smart_insertions: Vec<SmartInsertion>,
    #[serde(default)]
    pub partials: std::collections::BTreeMap<String, String>,

    /// Not part of the YAML shape: stamped in by the loader from the
    /// document's file path / ordinal so provenance can name a concrete
    /// document even when `metadata.name` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl CustomizationDocument {
    pub fn is_empty_of_operations(&self) -> bool {
        self.insertions.is_empty()
            && self.replacements.is_empty()
            && self.smart_replacements.is_empty()
            && self.smart_insertions.is_empty()
    }

    pub fn id(&self) -> &str {
        self.document_id.as_deref().unwrap_or("<unknown>")
    }
}
