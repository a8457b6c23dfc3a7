//! Source Inventory (C2): discovers which of the six sources exist for one
//! generator and indexes their available template/customization names.
//!
//! Scoped to a single generator per inventory (the resolver (C6) always
//! operates "for one (generator, specification)" per §4.6, so a multi-generator
//! host simply builds one inventory per generator it touches).

use crate::error::InventoryError;
use crate::types::{GeneratorId, LibraryMetadata, SourceKind, TemplateName};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

mod views;

pub use views::{ArchiveTemplateView, ArchiveCustomizationView, FileTreeView, PluginResourceView};

/// A per-source lookup surface. The resolver iterates sources by precedence,
/// never by polymorphism over source *kind* (see §9's "dynamic dispatch over
/// sources" note) — this trait only exists to let C2 treat the five
/// eagerly-indexed sources uniformly during construction and lookup.
pub trait SourceView: Send + Sync {
    fn list_templates(&self) -> BTreeSet<TemplateName> {
        BTreeSet::new()
    }
    fn list_customizations(&self) -> BTreeSet<TemplateName> {
        BTreeSet::new()
    }
    fn has_template(&self, name: &TemplateName) -> bool {
        self.list_templates().contains(name)
    }
    fn read_template(&self, name: &TemplateName) -> Option<Vec<u8>>;
    fn read_customization(&self, name: &TemplateName) -> Option<String>;
}

/// Backs `SourceKind::GeneratorDefault`. Membership is reported lazily, by
/// name, because the upstream code generator's template list may be large
/// and opaque (§4.2).
pub trait GeneratorDefaultsProvider: Send + Sync {
    fn has(&self, name: &TemplateName) -> bool;
    fn read(&self, name: &TemplateName) -> Option<Vec<u8>>;
}

/// One library archive contributing both a `LibraryTemplate` and a
/// `LibraryCustomization` view at the same `library_index`.
pub struct LibraryHandle {
    pub archive: crate::archive::Archive,
}

pub struct SourceInventory {
    generator: GeneratorId,
    views: std::collections::HashMap<SourceKind, Box<dyn SourceView>>,
    templates: std::collections::HashMap<SourceKind, BTreeSet<TemplateName>>,
    customizations: std::collections::HashMap<SourceKind, BTreeSet<TemplateName>>,
    metadata: std::collections::HashMap<SourceKind, LibraryMetadata>,
    generator_defaults: Arc<dyn GeneratorDefaultsProvider>,
    library_count: usize,
}

impl SourceInventory {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        generator: GeneratorId,
        user_template_dir: Option<&Path>,
        user_customization_dir: Option<&Path>,
        libraries: Vec<LibraryHandle>,
        plugin_customizations: std::collections::BTreeMap<TemplateName, String>,
        generator_defaults: Arc<dyn GeneratorDefaultsProvider>,
    ) -> Result<Self, InventoryError> {
        let mut views: std::collections::HashMap<SourceKind, Box<dyn SourceView>> =
            std::collections::HashMap::new();
        let mut templates = std::collections::HashMap::new();
        let mut customizations = std::collections::HashMap::new();
        let mut metadata = std::collections::HashMap::new();

        if let Some(dir) = user_template_dir {
            let view = FileTreeView::new(dir, &generator, TemplateNameSuffix::None);
            templates.insert(SourceKind::UserTemplate, view.list_templates());
            views.insert(SourceKind::UserTemplate, Box::new(view));
        }
        if let Some(dir) = user_customization_dir {
            let view = FileTreeView::new(dir, &generator, TemplateNameSuffix::Yaml);
            customizations.insert(SourceKind::UserCustomization, view.list_templates());
            views.insert(SourceKind::UserCustomization, Box::new(view));
        }

        let library_count = libraries.len();
        for (index, handle) in libraries.into_iter().enumerate() {
            let meta = handle
                .archive
                .read_metadata()
                .map_err(|e| InventoryError::MalformedLibraryMetadata {
                    path: handle.archive.label().to_string(),
                    reason: e.to_string(),
                })?
                .ok_or_else(|| InventoryError::MalformedLibraryMetadata {
                    path: handle.archive.label().to_string(),
                    reason: "missing META-INF/openapi-library.yaml".to_string(),
                })?;

            let archive = Arc::new(handle.archive);
            let template_kind = SourceKind::LibraryTemplate { library_index: index };
            let customization_kind = SourceKind::LibraryCustomization { library_index: index };

            let template_view = ArchiveTemplateView::new(archive.clone(), &generator);
            let customization_view = ArchiveCustomizationView::new(archive.clone(), &generator);

            templates.insert(template_kind, template_view.list_templates());
            customizations.insert(customization_kind, customization_view.list_templates());
            views.insert(template_kind, Box::new(template_view));
            views.insert(customization_kind, Box::new(customization_view));
            metadata.insert(template_kind, meta.clone());
            metadata.insert(customization_kind, meta);
        }

        let plugin_view = PluginResourceView::new(plugin_customizations);
        customizations.insert(SourceKind::PluginCustomization, plugin_view.list_templates());
        views.insert(SourceKind::PluginCustomization, Box::new(plugin_view));

        Ok(Self {
            generator,
            views,
            templates,
            customizations,
            metadata,
            generator_defaults,
            library_count,
        })
    }

    pub fn generator(&self) -> &GeneratorId {
        &self.generator
    }

    pub fn library_count(&self) -> usize {
        self.library_count
    }

    pub fn metadata_for(&self, source: SourceKind) -> Option<&LibraryMetadata> {
        self.metadata.get(&source)
    }

    /// True iff `source` can provide an explicit template body for `name`.
    pub fn has_template(&self, source: SourceKind, name: &TemplateName) -> bool {
        if source == SourceKind::GeneratorDefault {
            return self.generator_defaults.has(name);
        }
        self.templates
            .get(&source)
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    pub fn has_customization(&self, source: SourceKind, name: &TemplateName) -> bool {
        self.customizations
            .get(&source)
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    pub fn read_template(&self, source: SourceKind, name: &TemplateName) -> Option<Vec<u8>> {
        if source == SourceKind::GeneratorDefault {
            return self.generator_defaults.read(name);
        }
        self.views.get(&source)?.read_template(name)
    }

    pub fn read_customization(&self, source: SourceKind, name: &TemplateName) -> Option<String> {
        self.views.get(&source)?.read_customization(name)
    }

    pub fn template_names_for(&self, source: SourceKind) -> BTreeSet<TemplateName> {
        self.templates.get(&source).cloned().unwrap_or_default()
    }

    pub fn customization_names_for(&self, source: SourceKind) -> BTreeSet<TemplateName> {
        self.customizations.get(&source).cloned().unwrap_or_default()
    }

    /// Every distinct template name any eagerly-indexed (non-default) source
    /// declares, template or customization. Used by the resolver to seed the
    /// set of templates to resolve before dependency discovery runs.
    pub fn all_known_template_names(&self) -> BTreeSet<TemplateName> {
        let mut names = BTreeSet::new();
        for set in self.templates.values() {
            names.extend(set.iter().cloned());
        }
        for set in self.customizations.values() {
            names.extend(set.iter().cloned());
        }
        names
    }

    /// Source kinds present in this inventory (i.e. non-empty / configured),
    /// used to intersect a caller's configured ordering against availability.
    pub fn available_sources(&self) -> BTreeSet<SourceKind> {
        let mut sources: BTreeSet<SourceKind> = self.views.keys().copied().collect();
        sources.insert(SourceKind::GeneratorDefault);
        sources
    }
}

#[derive(Clone, Copy)]
pub(crate) enum TemplateNameSuffix {
    None,
    Yaml,
}

fn scan_file_tree(root: &Path, generator: &GeneratorId, suffix: TemplateNameSuffix) -> BTreeSet<TemplateName> {
    let base = root.join(&generator.0);
    if !base.is_dir() {
        return BTreeSet::new();
    }
    let mut names = BTreeSet::new();
    for entry in WalkDir::new(&base).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&base) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
        let name = match suffix {
            TemplateNameSuffix::None => relative,
            TemplateNameSuffix::Yaml => match relative.strip_suffix(".yaml") {
                Some(stripped) => stripped.to_string(),
                None => continue,
            },
        };
        names.insert(TemplateName::new(name));
    }
    names
}

fn file_tree_path(root: &Path, generator: &GeneratorId, name: &TemplateName, suffix: TemplateNameSuffix) -> PathBuf {
    let mut path = root.join(&generator.0).join(name.as_str());
    if matches!(suffix, TemplateNameSuffix::Yaml) {
        path.set_extension("yaml");
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct NullDefaults;
    impl GeneratorDefaultsProvider for NullDefaults {
        fn has(&self, _name: &TemplateName) -> bool {
            false
        }
        fn read(&self, _name: &TemplateName) -> Option<Vec<u8>> {
            None
        }
    }

    fn write_file(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn user_template_dir_is_indexed_eagerly() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "spring/pojo.mustache", "USR");

        let inventory = SourceInventory::build(
            GeneratorId::new("spring"),
            Some(tmp.path()),
            None,
            vec![],
            Default::default(),
            Arc::new(NullDefaults),
        )
        .unwrap();

        let name = TemplateName::new("pojo.mustache");
        assert!(inventory.has_template(SourceKind::UserTemplate, &name));
        assert_eq!(
            inventory.read_template(SourceKind::UserTemplate, &name),
            Some(b"USR".to_vec())
        );
    }

    #[test]
    fn generator_default_membership_is_queried_lazily() {
        struct OnlyFoo;
        impl GeneratorDefaultsProvider for OnlyFoo {
            fn has(&self, name: &TemplateName) -> bool {
                name.as_str() == "foo.mustache"
            }
            fn read(&self, name: &TemplateName) -> Option<Vec<u8>> {
                self.has(name).then(|| b"default body".to_vec())
            }
        }

        let inventory = SourceInventory::build(
            GeneratorId::new("spring"),
            None,
            None,
            vec![],
            Default::default(),
            Arc::new(OnlyFoo),
        )
        .unwrap();

        assert!(inventory.has_template(SourceKind::GeneratorDefault, &TemplateName::new("foo.mustache")));
        assert!(!inventory.has_template(SourceKind::GeneratorDefault, &TemplateName::new("bar.mustache")));
    }

    #[test]
    fn missing_library_metadata_is_fatal() {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer.start_file("META-INF/openapi-templates/spring/pojo.mustache", zip::write::FileOptions::default()).unwrap();
            writer.write_all(b"LIB").unwrap();
            writer.finish().unwrap();
        }
        let archive = crate::archive::Archive::from_bytes("bad.jar", buf.into_inner());

        let result = SourceInventory::build(
            GeneratorId::new("spring"),
            None,
            None,
            vec![LibraryHandle { archive }],
            Default::default(),
            Arc::new(NullDefaults),
        );
        assert!(matches!(result, Err(InventoryError::MalformedLibraryMetadata { .. })));
    }
}
