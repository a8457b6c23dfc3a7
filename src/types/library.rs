use serde::{Deserialize, Serialize};

/// Parsed from a library archive's `META-INF/openapi-library.yaml`. Used only
/// for validation (compatibility checks) and error messages — never consulted
/// by the resolver or customization engine directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, rename = "supportedGenerators")]
    pub supported_generators: Vec<String>,
    #[serde(default, rename = "minOpenApiGeneratorVersion")]
    pub min_open_api_generator_version: Option<String>,
    #[serde(default, rename = "maxOpenApiGeneratorVersion")]
    pub max_open_api_generator_version: Option<String>,
    #[serde(default, rename = "minPluginVersion")]
    pub min_plugin_version: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}
