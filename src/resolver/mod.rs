//! Template Resolver (C6): for one (generator, specification), chooses the
//! base template per name by precedence and folds the applicable
//! customization stack over it via C5.

use crate::cache::SessionCache;
use crate::condition::compare_versions;
use crate::customization::{apply_document, PartialsResolver};
use crate::error::{LibraryCompatibilityError, LibraryCompatibilityIssue, ShadowedProvider};
use crate::inventory::SourceInventory;
use crate::types::{
    AppliedCustomization, CustomizationDocument, EvaluationContext, GeneratorId, ResolvedTemplate,
    SourceKind, TemplateBody, TemplateName,
};
use crate::yaml::{self, LoadOutcome};
use std::collections::BTreeSet;

/// Everything the resolver needs besides the inventory and the set of names
/// to resolve: the concrete (already library-expanded and availability
/// intersected) source order, the generator id string used to pick a
/// semantic catalog, the evaluation context base (every field except
/// `template_body`, which is overwritten per fold step), and the session
/// cache (C8 tier 1) that base-body reads consult and populate.
pub struct ResolveContext<'a> {
    pub inventory: &'a SourceInventory,
    pub source_order: Vec<SourceKind>,
    pub generator_id: String,
    pub eval_ctx_base: EvaluationContext,
    pub session_cache: &'a SessionCache,
}

pub struct ResolveOutcome {
    pub templates: Vec<ResolvedTemplate>,
    pub shadowed: Vec<ShadowedProvider>,
}

/// Narrows a configured source order down to the sources actually present in
/// the inventory (§4.6 step 1). Declaration order is preserved; unavailable
/// entries are silently dropped.
pub fn applicable_source_order(configured: &[SourceKind], inventory: &SourceInventory) -> Vec<SourceKind> {
    let available = inventory.available_sources();
    configured.iter().copied().filter(|s| available.contains(s)).collect()
}

/// Validates every library's declared compatibility range against the
/// detected generator/plugin versions. Checks all four bounds the data model
/// carries (§10.6): `minOpenApiGeneratorVersion`, `maxOpenApiGeneratorVersion`,
/// `minPluginVersion`; there is no `maxPluginVersion` field in
/// [`crate::types::LibraryMetadata`], so only the lower bound applies there.
pub fn check_library_compatibility(
    inventory: &SourceInventory,
    detected_generator_version: Option<&str>,
    detected_plugin_version: Option<&str>,
) -> Result<(), LibraryCompatibilityError> {
    let mut issues = Vec::new();
    for index in 0..inventory.library_count() {
        let Some(meta) = inventory.metadata_for(SourceKind::LibraryTemplate { library_index: index }) else {
            continue;
        };
        if let (Some(min), Some(detected)) = (&meta.min_open_api_generator_version, detected_generator_version) {
            if compare_versions(detected, min) == std::cmp::Ordering::Less {
                issues.push(LibraryCompatibilityIssue {
                    library: meta.name.clone(),
                    version: meta.version.clone(),
                    constraint: format!(">={min}"),
                    detected: detected.to_string(),
                });
            }
        }
        if let (Some(max), Some(detected)) = (&meta.max_open_api_generator_version, detected_generator_version) {
            if compare_versions(detected, max) == std::cmp::Ordering::Greater {
                issues.push(LibraryCompatibilityIssue {
                    library: meta.name.clone(),
                    version: meta.version.clone(),
                    constraint: format!("<={max}"),
                    detected: detected.to_string(),
                });
            }
        }
        if let (Some(min_plugin), Some(detected)) = (&meta.min_plugin_version, detected_plugin_version) {
            if compare_versions(detected, min_plugin) == std::cmp::Ordering::Less {
                issues.push(LibraryCompatibilityIssue {
                    library: meta.name.clone(),
                    version: meta.version.clone(),
                    constraint: format!("plugin >={min_plugin}"),
                    detected: detected.to_string(),
                });
            }
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(LibraryCompatibilityError { issues })
    }
}

/// Resolves every name in `names`, returning resolved templates plus
/// diagnostics for explicit providers that lost a precedence tie. Names with
/// no base anywhere (an orphaned customization-only entry) are skipped with
/// a warning rather than failing the run — see `DESIGN.md`.
pub fn resolve_all(names: &BTreeSet<TemplateName>, ctx: &ResolveContext) -> ResolveOutcome {
    let mut templates = Vec::new();
    let mut shadowed = Vec::new();

    for name in names {
        let Some((base_source, base_bytes, claims)) = select_base(name, ctx) else {
            tracing::warn!(template = %name, "no source provides a base body; skipping");
            continue;
        };
        for shadowed_source in claims.into_iter().skip(1) {
            shadowed.push(ShadowedProvider {
                template_name: name.as_str().to_string(),
                shadowed_source,
                winning_source: base_source,
            });
        }

        let stack = collect_customization_stack(name, &ctx.source_order, ctx.inventory);
        let partials = PartialsResolver::from_documents_lowest_first(
            stack.iter().rev().map(|(_, doc)| doc),
        );

        let base_body_str = String::from_utf8_lossy(&base_bytes).into_owned();
        let mut current = base_body_str.clone();
        let mut applied_customizations = Vec::new();

        for (source, document) in stack.iter().rev() {
            let outcome = apply_document(&current, document, &ctx.eval_ctx_base, &partials, &ctx.generator_id);
            if outcome.operations_applied > 0 {
                applied_customizations.push(AppliedCustomization {
                    source: *source,
                    document_id: document.id().to_string(),
                });
            }
            current = outcome.body;
        }

        templates.push(ResolvedTemplate {
            name: name.clone(),
            body: TemplateBody::from(current),
            base_body: TemplateBody::from(base_body_str),
            base_source,
            applied_customizations,
        });
    }

    ResolveOutcome { templates, shadowed }
}

/// Returns the winning (source, body) plus the full ordered list of sources
/// that claimed to provide this name (first element is the winner), so
/// callers can record shadowed providers for diagnostics (§4.6 step 2).
///
/// The winning body is read through the session cache (§4.8: "shared across
/// specs within one preparation"): a hit avoids re-reading the winning
/// source (e.g. re-extracting a library archive entry) for every spec that
/// resolves the same name; a miss reads through the inventory once and
/// populates the cache for the next spec to consult.
fn select_base(name: &TemplateName, ctx: &ResolveContext) -> Option<(SourceKind, Vec<u8>, Vec<SourceKind>)> {
    let mut claims = Vec::new();
    let mut winner: Option<(SourceKind, Vec<u8>)> = None;
    for &source in &ctx.source_order {
        if !source.is_template_source() {
            continue;
        }
        if ctx.inventory.has_template(source, name) {
            claims.push(source);
            if winner.is_none() {
                if let Some(body) = fetch_base_body(source, name, ctx) {
                    winner = Some((source, body));
                }
            }
        }
    }
    winner.map(|(source, body)| (source, body, claims))
}

/// Consults `ctx.session_cache` keyed by `(generator, detected generator
/// version, name)` before falling back to a fresh inventory read, populating
/// the cache on a fresh read so later lookups within the same preparation
/// (across specs) hit it.
fn fetch_base_body(source: SourceKind, name: &TemplateName, ctx: &ResolveContext) -> Option<Vec<u8>> {
    let generator = GeneratorId::new(ctx.generator_id.clone());
    let version = ctx.eval_ctx_base.detected_generator_version.clone();

    if let Some(cached) = ctx.session_cache.get(&generator, version.as_deref(), name) {
        return Some(cached.into_bytes());
    }

    let body = ctx.inventory.read_template(source, name)?;
    ctx.session_cache
        .insert(generator, version, name.clone(), TemplateBody::new(body.clone()));
    Some(body)
}

/// Collects every customization document targeting `name`, in precedence
/// order (highest first, matching §4.6 step 3's description); callers fold
/// in reverse so the highest-precedence document applies last (§4.6 step 4).
/// A document whose own load fails (bad YAML, dangerous content) is logged
/// and excluded; it does not fail the template or the run (§4.3, §7).
fn collect_customization_stack(
    name: &TemplateName,
    source_order: &[SourceKind],
    inventory: &SourceInventory,
) -> Vec<(SourceKind, CustomizationDocument)> {
    let mut stack = Vec::new();
    for &source in source_order {
        if !source.is_customization_source() {
            continue;
        }
        if !inventory.has_customization(source, name) {
            continue;
        }
        let Some(raw) = inventory.read_customization(source, name) else {
            continue;
        };
        let doc_id = format!("{}:{}", source.category_name(), name.as_str());
        let path = format!("{}/{}.yaml", source.category_name(), name.as_str());
        match yaml::load(&path, &doc_id, &raw) {
            LoadOutcome::Document(doc) => stack.push((source, doc)),
            LoadOutcome::Rejected(errors) => {
                for error in errors {
                    tracing::warn!(template = %name, source = ?source, %error, "customization document rejected");
                }
            }
        }
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{GeneratorDefaultsProvider, LibraryHandle, SourceInventory};
    use crate::types::GeneratorId;
    use std::sync::Arc;

    struct MapDefaults(std::collections::BTreeMap<String, Vec<u8>>);
    impl GeneratorDefaultsProvider for MapDefaults {
        fn has(&self, name: &TemplateName) -> bool {
            self.0.contains_key(name.as_str())
        }
        fn read(&self, name: &TemplateName) -> Option<Vec<u8>> {
            self.0.get(name.as_str()).cloned()
        }
    }

    fn inventory_with_default(name: &str, body: &str) -> SourceInventory {
        let mut map = std::collections::BTreeMap::new();
        map.insert(name.to_string(), body.as_bytes().to_vec());
        SourceInventory::build(
            GeneratorId::new("spring"),
            None,
            None,
            vec![],
            Default::default(),
            Arc::new(MapDefaults(map)),
        )
        .unwrap()
    }

    #[test]
    fn user_template_overrides_library_template() {
        use std::io::Write;
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("META-INF/openapi-library.yaml", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(b"name: lib\nversion: 1.0.0\n").unwrap();
            writer
                .start_file("META-INF/openapi-templates/spring/pojo.mustache", zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(b"LIB").unwrap();
            writer.finish().unwrap();
        }
        let archive = crate::archive::Archive::from_bytes("lib.jar", buf.into_inner());

        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("spring")).unwrap();
        std::fs::write(tmp.path().join("spring/pojo.mustache"), "USR").unwrap();

        let inventory = SourceInventory::build(
            GeneratorId::new("spring"),
            Some(tmp.path()),
            None,
            vec![LibraryHandle { archive }],
            Default::default(),
            Arc::new(MapDefaults(Default::default())),
        )
        .unwrap();

        let source_order = vec![
            SourceKind::UserTemplate,
            SourceKind::UserCustomization,
            SourceKind::LibraryTemplate { library_index: 0 },
            SourceKind::LibraryCustomization { library_index: 0 },
            SourceKind::PluginCustomization,
            SourceKind::GeneratorDefault,
        ];
        let session_cache = SessionCache::new();
        let ctx = ResolveContext {
            inventory: &inventory,
            source_order,
            generator_id: "spring".into(),
            eval_ctx_base: EvaluationContext::default(),
            session_cache: &session_cache,
        };

        let mut names = BTreeSet::new();
        names.insert(TemplateName::new("pojo.mustache"));
        let outcome = resolve_all(&names, &ctx);

        assert_eq!(outcome.templates.len(), 1);
        assert_eq!(outcome.templates[0].body.as_str_lossy(), "USR");
        assert!(!outcome.templates[0].was_modified());
        assert_eq!(outcome.shadowed.len(), 1);
        assert_eq!(outcome.shadowed[0].winning_source, SourceKind::UserTemplate);
    }

    #[test]
    fn customization_is_cumulative_over_generator_default() {
        let inventory = inventory_with_default("pojo.mustache", "public class X {}");
        let source_order = vec![SourceKind::GeneratorDefault];
        let session_cache = SessionCache::new();
        let ctx = ResolveContext {
            inventory: &inventory,
            source_order,
            generator_id: "spring".into(),
            eval_ctx_base: EvaluationContext::default(),
            session_cache: &session_cache,
        };
        let mut names = BTreeSet::new();
        names.insert(TemplateName::new("pojo.mustache"));
        let outcome = resolve_all(&names, &ctx);
        assert_eq!(outcome.templates.len(), 1);
        assert_eq!(outcome.templates[0].base_body.as_str_lossy(), "public class X {}");
    }

    #[test]
    fn resolving_a_base_body_populates_the_session_cache() {
        let inventory = inventory_with_default("pojo.mustache", "public class X {}");
        let source_order = vec![SourceKind::GeneratorDefault];
        let session_cache = SessionCache::new();
        let mut names = BTreeSet::new();
        names.insert(TemplateName::new("pojo.mustache"));

        let ctx = ResolveContext {
            inventory: &inventory,
            source_order,
            generator_id: "spring".into(),
            eval_ctx_base: EvaluationContext::default(),
            session_cache: &session_cache,
        };
        resolve_all(&names, &ctx);
        assert_eq!(session_cache.len(), 1);
        assert_eq!(
            session_cache
                .get(&GeneratorId::new("spring"), None, &TemplateName::new("pojo.mustache"))
                .unwrap()
                .as_str_lossy(),
            "public class X {}"
        );
    }

    #[test]
    fn library_incompatibility_is_detected() {
        use std::io::Write;
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("META-INF/openapi-library.yaml", zip::write::FileOptions::default())
                .unwrap();
            writer
                .write_all(b"name: acme\nversion: 2.0.0\nminOpenApiGeneratorVersion: \"8.0.0\"\n")
                .unwrap();
            writer.finish().unwrap();
        }
        let archive = crate::archive::Archive::from_bytes("acme.jar", buf.into_inner());
        let inventory = SourceInventory::build(
            GeneratorId::new("spring"),
            None,
            None,
            vec![LibraryHandle { archive }],
            Default::default(),
            Arc::new(MapDefaults(Default::default())),
        )
        .unwrap();

        let result = check_library_compatibility(&inventory, Some("7.14.0"), None);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].library, "acme");
    }
}
