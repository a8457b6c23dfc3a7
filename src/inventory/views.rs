use super::{file_tree_path, scan_file_tree, SourceView, TemplateNameSuffix};
use crate::archive::Archive;
use crate::types::{GeneratorId, TemplateName};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Backs `UserTemplate` (plain file bodies) or `UserCustomization` (YAML
/// files named `<templateName>.yaml`, selected via `suffix`).
pub struct FileTreeView {
    root: PathBuf,
    generator: GeneratorId,
    suffix: TemplateNameSuffix,
    names: BTreeSet<TemplateName>,
}

impl FileTreeView {
    pub fn new(root: &std::path::Path, generator: &GeneratorId, suffix: TemplateNameSuffix) -> Self {
        let names = scan_file_tree(root, generator, suffix);
        Self {
            root: root.to_path_buf(),
            generator: generator.clone(),
            suffix,
            names,
        }
    }
}

impl SourceView for FileTreeView {
    fn list_templates(&self) -> BTreeSet<TemplateName> {
        self.names.clone()
    }

    fn read_template(&self, name: &TemplateName) -> Option<Vec<u8>> {
        if !self.names.contains(name) {
            return None;
        }
        std::fs::read(file_tree_path(&self.root, &self.generator, name, self.suffix)).ok()
    }

    fn read_customization(&self, name: &TemplateName) -> Option<String> {
        if !self.names.contains(name) {
            return None;
        }
        std::fs::read_to_string(file_tree_path(&self.root, &self.generator, name, self.suffix)).ok()
    }
}

fn archive_prefix(generator: &GeneratorId, kind: &str) -> String {
    format!("META-INF/openapi-{kind}/{}/", generator.as_str())
}

pub struct ArchiveTemplateView {
    archive: Arc<Archive>,
    prefix: String,
    names: BTreeSet<TemplateName>,
}

impl ArchiveTemplateView {
    pub fn new(archive: Arc<Archive>, generator: &GeneratorId) -> Self {
        let prefix = archive_prefix(generator, "templates");
        let names = archive
            .list(&prefix)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(TemplateName::new))
            .collect();
        Self { archive, prefix, names }
    }
}

impl SourceView for ArchiveTemplateView {
    fn list_templates(&self) -> BTreeSet<TemplateName> {
        self.names.clone()
    }

    fn read_template(&self, name: &TemplateName) -> Option<Vec<u8>> {
        if !self.names.contains(name) {
            return None;
        }
        self.archive.read(&format!("{}{}", self.prefix, name.as_str())).ok()
    }

    fn read_customization(&self, _name: &TemplateName) -> Option<String> {
        None
    }
}

pub struct ArchiveCustomizationView {
    archive: Arc<Archive>,
    prefix: String,
    names: BTreeSet<TemplateName>,
}

impl ArchiveCustomizationView {
    pub fn new(archive: Arc<Archive>, generator: &GeneratorId) -> Self {
        let prefix = archive_prefix(generator, "customizations");
        let names = archive
            .list(&prefix)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&prefix)?.strip_suffix(".yaml").map(TemplateName::new))
            .collect();
        Self { archive, prefix, names }
    }
}

impl SourceView for ArchiveCustomizationView {
    fn list_templates(&self) -> BTreeSet<TemplateName> {
        self.names.clone()
    }

    fn read_template(&self, _name: &TemplateName) -> Option<Vec<u8>> {
        None
    }

    fn read_customization(&self, name: &TemplateName) -> Option<String> {
        if !self.names.contains(name) {
            return None;
        }
        let bytes = self
            .archive
            .read(&format!("{}{}.yaml", self.prefix, name.as_str()))
            .ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Backs `PluginCustomization`: a bundled resource tree supplied already
/// loaded into memory by the embedding host (there is no plugin-template
/// variant in [`crate::types::SourceKind`] — only customizations are
/// plugin-sourced, per §3's precedence chain).
pub struct PluginResourceView {
    resources: BTreeMap<TemplateName, String>,
}

impl PluginResourceView {
    pub fn new(resources: BTreeMap<TemplateName, String>) -> Self {
        Self { resources }
    }
}

impl SourceView for PluginResourceView {
    fn list_templates(&self) -> BTreeSet<TemplateName> {
        self.resources.keys().cloned().collect()
    }

    fn read_template(&self, _name: &TemplateName) -> Option<Vec<u8>> {
        None
    }

    fn read_customization(&self, name: &TemplateName) -> Option<String> {
        self.resources.get(name).cloned()
    }
}
