//! OAS Template Forge - multi-source template resolution and customization
//! engine for API code generators.
//!
//! This crate discovers the templates and declarative customizations
//! available to a code generator run from up to six precedence-ordered
//! sources, folds the applicable customization stack over the winning base
//! template, and materializes the result into a per-specification working
//! directory with content-addressed caching across three tiers.

pub mod archive;
pub mod cache;
pub mod condition;
pub mod config;
pub mod customization;
pub mod error;
pub mod inventory;
pub mod resolver;
pub mod scheduler;
pub mod types;
pub mod workdir;
pub mod yaml;

pub use config::PreparationConfig;
pub use error::{PreparationError, Result};
pub use inventory::SourceInventory;
pub use scheduler::CancellationToken;
pub use workdir::WorkingDirectoryReport;

use crate::cache::{GlobalCache, SessionCache};
use crate::types::{EvaluationContext, ManifestInputs, WorkingDirectoryManifest};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a single `prepare_one` call needs beyond the specification
/// name itself: the already-built inventory (C2, shared across every
/// specification for one generator), the validated configuration, the root
/// directory under which per-spec working directories are created, and the
/// cache tiers (C8) that persist across specs (`session_cache`, always) and
/// across preparations (`global_cache`, when the embedding host opts in).
///
/// `detected_plugin_version` is the generator-plugin version the embedding
/// host observed for this run (e.g. a Maven/Gradle plugin version) — this
/// crate has no way to detect it itself, since it has no build-tool host to
/// query, so a caller that cares about `minPluginVersion` bounds (§10.6)
/// must supply it; `None` simply skips that one bound during compatibility
/// checking.
pub struct PreparationInputs {
    pub config: PreparationConfig,
    pub inventory: SourceInventory,
    pub build_root: PathBuf,
    pub session_cache: Arc<SessionCache>,
    pub global_cache: Option<Arc<GlobalCache>>,
    pub detected_plugin_version: Option<String>,
}

/// Orchestrates C6 (resolve) -> C7 (materialize) for one specification,
/// per the data-flow note in the expanded spec: "C2 produces an inventory;
/// for each specification, C6 consults C2 + C8 to resolve templates ... C7
/// writes outputs and updates C8".
///
/// Library compatibility (`resolver::check_library_compatibility`) is
/// validated here, before any working directory is touched, since it
/// depends only on C2's state and the detected generator/plugin versions —
/// an incompatible library is fatal for the whole run (§7), so this must
/// run before C7 ever materializes output for this spec.
///
/// Acquires the per-spec directory lock (§5) before touching the working
/// directory, so concurrent `prepare_one` calls for the same `spec_name`
/// (e.g. from two scheduler workers racing a misconfigured spec list) never
/// interleave writes.
pub async fn prepare_one(
    spec_name: &str,
    inputs: &PreparationInputs,
    cancellation: CancellationToken,
) -> Result<WorkingDirectoryReport> {
    cancellation.check(spec_name)?;
    inputs.config.validate()?;
    resolver::check_library_compatibility(
        &inputs.inventory,
        inputs.config.generator_version.as_deref(),
        inputs.detected_plugin_version.as_deref(),
    )?;

    let categories = inputs.config.source_categories();
    let configured = config::expand_source_order(&categories, inputs.inventory.library_count());
    let source_order = resolver::applicable_source_order(&configured, &inputs.inventory);

    let mut eval_ctx_base = EvaluationContext::default();
    if let Some(version) = &inputs.config.generator_version {
        eval_ctx_base = eval_ctx_base.with_generator_version(version.clone());
    }
    for (key, value) in &inputs.config.template_variables {
        eval_ctx_base = eval_ctx_base.with_project_property(key.clone(), value.clone());
    }

    let names: BTreeSet<_> = inputs.inventory.all_known_template_names();
    let ctx = resolver::ResolveContext {
        inventory: &inputs.inventory,
        source_order: source_order.clone(),
        generator_id: inputs.config.generator_name.clone(),
        eval_ctx_base,
        session_cache: &inputs.session_cache,
    };

    cancellation.check(spec_name)?;
    let outcome = resolver::resolve_all(&names, &ctx);
    for shadowed in &outcome.shadowed {
        tracing::debug!(
            template = %shadowed.template_name,
            shadowed_source = ?shadowed.shadowed_source,
            winning_source = ?shadowed.winning_source,
            "explicit template provider shadowed by higher-precedence source"
        );
    }

    let manifest = WorkingDirectoryManifest::compute(&ManifestInputs {
        generator_id: inputs.config.generator_name.clone(),
        generator_version: inputs.config.generator_version.clone(),
        inventory_fingerprints: inventory_fingerprints(&inputs.inventory, &source_order),
        effective_source_order: source_order.iter().map(|s| format!("{s:?}")).collect(),
        applicable_document_ids: outcome
            .templates
            .iter()
            .flat_map(|t| t.applied_customizations.iter().map(|c| c.document_id.clone()))
            .collect(),
        template_variables: inputs.config.template_variables.clone(),
    });

    cancellation.check(spec_name)?;
    let spec_dir = inputs
        .build_root
        .join(format!("{}-{}", inputs.config.generator_name, spec_name));
    let _lock = workdir::acquire_lock(&spec_dir).await;

    workdir::build(
        &spec_dir,
        &types::GeneratorId::new(inputs.config.generator_name.clone()),
        &outcome.templates,
        &inputs.inventory,
        &source_order,
        &manifest.hash,
        inputs.config.debug_template_resolution,
        &inputs.session_cache,
        inputs.config.generator_version.as_deref(),
        inputs.global_cache.as_deref(),
    )
    .await
}

/// Runs [`prepare_one`] for every entry in `specs` through the scheduler
/// (C9), honoring `config.parallel` (§4.9: "falling back to fully sequential
/// when `parallel` is false" maps to a parallelism cap of 1).
pub async fn prepare_all(
    specs: Vec<String>,
    inputs: std::sync::Arc<PreparationInputs>,
    cancellation: CancellationToken,
) -> std::collections::BTreeMap<String, Result<WorkingDirectoryReport>> {
    let parallelism = if inputs.config.parallel {
        scheduler::default_parallelism()
    } else {
        1
    };
    scheduler::run_all(specs, parallelism, cancellation, move |spec, token| {
        let inputs = inputs.clone();
        async move { prepare_one(&spec, &inputs, token).await }
    })
    .await
}

/// Consults the global cache (C8's disk tier) for a single template body,
/// used by embedding hosts that want to short-circuit per-template re-reads
/// across otherwise-independent `prepare_one` runs sharing one `GlobalCache`.
pub async fn global_cache_lookup(
    cache: &GlobalCache,
    generator: &str,
    version: &str,
    name: &types::TemplateName,
) -> Result<Option<types::TemplateBody>> {
    cache
        .get(generator, version, name)
        .await
        .map_err(PreparationError::from)
}

/// One fingerprint string per source present in `source_order`: the sorted,
/// joined set of names it contributes. A coarser but adequate stand-in for
/// hashing every source's actual byte content on every run (see
/// `DESIGN.md`'s note on the global cache's own digest simplification).
fn inventory_fingerprints(inventory: &SourceInventory, source_order: &[types::SourceKind]) -> Vec<String> {
    source_order
        .iter()
        .map(|&source| {
            let mut names: Vec<&str> = inventory
                .template_names_for(source)
                .iter()
                .map(|n| n.as_str())
                .chain(inventory.customization_names_for(source).iter().map(|n| n.as_str()))
                .collect();
            names.sort_unstable();
            format!("{:?}:{}", source, names.join(","))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::GeneratorDefaultsProvider;
    use std::sync::Arc;

    struct MapDefaults(std::collections::BTreeMap<String, Vec<u8>>);
    impl GeneratorDefaultsProvider for MapDefaults {
        fn has(&self, name: &types::TemplateName) -> bool {
            self.0.contains_key(name.as_str())
        }
        fn read(&self, name: &types::TemplateName) -> Option<Vec<u8>> {
            self.0.get(name.as_str()).cloned()
        }
    }

    fn config() -> PreparationConfig {
        PreparationConfig {
            template_sources: PreparationConfig::default_source_order(),
            parallel: false,
            debug_template_resolution: false,
            template_variables: Default::default(),
            user_template_dir: None,
            user_template_customizations_dir: None,
            generator_name: "spring".into(),
            generator_version: None,
        }
    }

    #[tokio::test]
    async fn prepare_one_materializes_a_working_directory() {
        let mut defaults = std::collections::BTreeMap::new();
        defaults.insert("pojo.mustache".to_string(), b"public class X {}".to_vec());
        let inventory = SourceInventory::build(
            types::GeneratorId::new("spring"),
            None,
            None,
            vec![],
            Default::default(),
            Arc::new(MapDefaults(defaults)),
        )
        .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let inputs = PreparationInputs {
            config: config(),
            inventory,
            build_root: tmp.path().to_path_buf(),
            session_cache: Arc::new(SessionCache::new()),
            global_cache: None,
            detected_plugin_version: None,
        };

        let report = prepare_one("petstore", &inputs, CancellationToken::new())
            .await
            .unwrap();
        assert!(!report.cache_hit);
        assert_eq!(report.templates_written, 1);
        assert!(report.path.join("pojo.mustache").exists());
        assert_eq!(inputs.session_cache.len(), 1);
    }

    #[tokio::test]
    async fn prepare_one_rejects_invalid_configuration() {
        let inventory = SourceInventory::build(
            types::GeneratorId::new("spring"),
            None,
            None,
            vec![],
            Default::default(),
            Arc::new(MapDefaults(Default::default())),
        )
        .unwrap();
        let mut bad_config = config();
        bad_config.template_sources = vec![];

        let tmp = tempfile::tempdir().unwrap();
        let inputs = PreparationInputs {
            config: bad_config,
            inventory,
            build_root: tmp.path().to_path_buf(),
            session_cache: Arc::new(SessionCache::new()),
            global_cache: None,
            detected_plugin_version: None,
        };

        let result = prepare_one("petstore", &inputs, CancellationToken::new()).await;
        assert!(matches!(result, Err(PreparationError::Configuration(_))));
    }

    #[tokio::test]
    async fn prepare_one_aborts_on_incompatible_library() {
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
            types::GeneratorId::new("spring"),
            None,
            None,
            vec![crate::inventory::LibraryHandle { archive }],
            Default::default(),
            Arc::new(MapDefaults(Default::default())),
        )
        .unwrap();

        let mut incompatible_config = config();
        incompatible_config.generator_version = Some("7.14.0".into());

        let tmp = tempfile::tempdir().unwrap();
        let inputs = PreparationInputs {
            config: incompatible_config,
            inventory,
            build_root: tmp.path().to_path_buf(),
            session_cache: Arc::new(SessionCache::new()),
            global_cache: None,
            detected_plugin_version: None,
        };

        let result = prepare_one("petstore", &inputs, CancellationToken::new()).await;
        assert!(matches!(result, Err(PreparationError::LibraryCompatibility(_))));
        assert!(!tmp.path().join("spring-petstore").exists());
    }

    #[tokio::test]
    async fn prepare_all_runs_every_spec_independently() {
        let mut defaults = std::collections::BTreeMap::new();
        defaults.insert("pojo.mustache".to_string(), b"public class X {}".to_vec());
        let inventory = SourceInventory::build(
            types::GeneratorId::new("spring"),
            None,
            None,
            vec![],
            Default::default(),
            Arc::new(MapDefaults(defaults)),
        )
        .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let inputs = std::sync::Arc::new(PreparationInputs {
            config: config(),
            inventory,
            build_root: tmp.path().to_path_buf(),
            session_cache: Arc::new(SessionCache::new()),
            global_cache: None,
            detected_plugin_version: None,
        });

        let results = prepare_all(
            vec!["petstore".to_string(), "inventory-api".to_string()],
            inputs,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(results.len(), 2);
        assert!(results["petstore"].is_ok());
        assert!(results["inventory-api"].is_ok());
    }
}
