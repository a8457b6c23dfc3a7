use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a code generator (e.g. `"spring"`). Namespaces template
/// name spaces so that templates from different generators never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratorId(pub String);

impl GeneratorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GeneratorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GeneratorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A relative path under a generator namespace (e.g. `pojo.mustache`).
/// Unique within (GeneratorId, Source).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateName(pub String);

impl TemplateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TemplateName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TemplateName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Tagged variant with a total ordering by precedence: lower ordinal wins.
///
/// Precedence is a pure function of the variant; declaration order in a
/// caller-supplied `templateSources` list is irrelevant to *which* source wins
/// a given template name (it only affects which sources are even considered,
/// see [`SourceKind::from_config_name`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    UserTemplate,
    UserCustomization,
    LibraryTemplate { library_index: usize },
    LibraryCustomization { library_index: usize },
    PluginCustomization,
    GeneratorDefault,
}

impl SourceKind {
    /// Precedence ordinal: lower wins. Total and deterministic regardless of
    /// `library_index`, which only disambiguates between multiple libraries at
    /// the same precedence tier (see [`SourceKind::precedence`] note below).
    pub fn precedence(&self) -> u8 {
        match self {
            SourceKind::UserTemplate => 1,
            SourceKind::UserCustomization => 2,
            SourceKind::LibraryTemplate { .. } => 3,
            SourceKind::LibraryCustomization { .. } => 4,
            SourceKind::PluginCustomization => 5,
            SourceKind::GeneratorDefault => 6,
        }
    }

    pub fn is_template_source(&self) -> bool {
        matches!(
            self,
            SourceKind::UserTemplate
                | SourceKind::LibraryTemplate { .. }
                | SourceKind::GeneratorDefault
        )
    }

    pub fn is_customization_source(&self) -> bool {
        matches!(
            self,
            SourceKind::UserCustomization
                | SourceKind::LibraryCustomization { .. }
                | SourceKind::PluginCustomization
        )
    }

    /// Parses the closed set of configuration names from the config surface.
    /// Library-tiered kinds cannot be parsed this way (they require a library
    /// index) — this is only used to validate `templateSources` entries that
    /// don't carry a library index, i.e. the literal strings
    /// `LibraryTemplate` / `LibraryCustomization` as source *categories*.
    pub fn category_name(&self) -> &'static str {
        match self {
            SourceKind::UserTemplate => "UserTemplate",
            SourceKind::UserCustomization => "UserCustomization",
            SourceKind::LibraryTemplate { .. } => "LibraryTemplate",
            SourceKind::LibraryCustomization { .. } => "LibraryCustomization",
            SourceKind::PluginCustomization => "PluginCustomization",
            SourceKind::GeneratorDefault => "GeneratorDefault",
        }
    }
}

impl PartialOrd for SourceKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.precedence().cmp(&other.precedence())
    }
}

/// The closed set of source category names accepted in the `templateSources`
/// configuration list. Unlike [`SourceKind`], this has no library index.
pub const SOURCE_CATEGORY_NAMES: &[&str] = &[
    "UserTemplate",
    "UserCustomization",
    "LibraryTemplate",
    "LibraryCustomization",
    "PluginCustomization",
    "GeneratorDefault",
];
