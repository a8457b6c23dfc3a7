use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oas_template_forge::cache::{GlobalCache, SessionCache};
use oas_template_forge::inventory::{GeneratorDefaultsProvider, LibraryHandle, SourceInventory};
use oas_template_forge::types::{GeneratorId, TemplateName};
use oas_template_forge::{CancellationToken, PreparationConfig, PreparationInputs};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "template-prep")]
#[command(about = "Inspect and debug multi-source template resolution")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct TemplatePrepCli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one specification and materialize its working directory
    Resolve {
        /// Target code generator, e.g. "spring"
        #[arg(long)]
        generator: String,

        /// Specification name identifying the working directory
        #[arg(long)]
        spec: String,

        /// Path to a PreparationConfig YAML file
        #[arg(long)]
        config: PathBuf,

        /// Root directory under which per-spec working directories are built
        #[arg(long, default_value = "./build/template-work")]
        build_root: PathBuf,

        /// Emit `.source-resolution-cache` for this run regardless of config
        #[arg(long)]
        debug_template_resolution: bool,

        /// Detected generator-plugin version (e.g. the Maven/Gradle plugin
        /// version), used for library `minPluginVersion` compatibility
        /// checks; this front-end has no build-tool host to detect it from
        #[arg(long)]
        plugin_version: Option<String>,

        /// Skip the global on-disk cache (C8's cross-preparation tier)
        #[arg(long)]
        no_global_cache: bool,
    },
    /// Inspect or clear the global on-disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the global cache root and whether it exists
    Stats,
    /// Delete the entire global cache directory
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TemplatePrepCli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Command::Resolve {
            generator,
            spec,
            config,
            build_root,
            debug_template_resolution,
            plugin_version,
            no_global_cache,
        } => {
            resolve(
                generator,
                spec,
                config,
                build_root,
                debug_template_resolution,
                plugin_version,
                no_global_cache,
            )
            .await
        }
        Command::Cache { action } => cache_action(action).await,
    }
}

async fn resolve(
    generator: String,
    spec: String,
    config_path: PathBuf,
    build_root: PathBuf,
    force_debug_resolution: bool,
    plugin_version: Option<String>,
    no_global_cache: bool,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(&config_path)
        .await
        .with_context(|| format!("reading config file {}", config_path.display()))?;
    let mut config: PreparationConfig = oas_template_forge::config::parse(&raw)
        .with_context(|| format!("parsing config file {}", config_path.display()))?;
    if force_debug_resolution {
        config.debug_template_resolution = true;
    }
    config.validate().context("invalid configuration")?;

    let user_template_dir = config.user_template_dir.clone();
    let user_customization_dir = config.user_template_customizations_dir.clone();

    let inventory = SourceInventory::build(
        GeneratorId::new(generator.clone()),
        user_template_dir.as_deref(),
        user_customization_dir.as_deref(),
        Vec::<LibraryHandle>::new(),
        Default::default(),
        std::sync::Arc::new(EmptyGeneratorDefaults),
    )
    .context("building source inventory")?;

    let global_cache = if no_global_cache {
        None
    } else {
        Some(Arc::new(GlobalCache::new(GlobalCache::default_root())))
    };

    let inputs = PreparationInputs {
        config,
        inventory,
        build_root,
        session_cache: Arc::new(SessionCache::new()),
        global_cache,
        detected_plugin_version: plugin_version,
    };

    info!(%spec, %generator, "resolving specification");
    let report = oas_template_forge::prepare_one(&spec, &inputs, CancellationToken::new())
        .await
        .context("preparation failed")?;

    println!("working directory: {}", report.path.display());
    println!("cache hit: {}", report.cache_hit);
    println!("templates written: {}", report.templates_written);
    println!("customizations applied: {}", report.customizations_applied);
    println!("dependency templates written: {}", report.dependency_templates_written);
    Ok(())
}

async fn cache_action(action: CacheAction) -> Result<()> {
    let root = GlobalCache::default_root();
    match action {
        CacheAction::Stats => {
            println!("global cache root: {}", root.display());
            println!("exists: {}", root.exists());
        }
        CacheAction::Clear => {
            if root.exists() {
                tokio::fs::remove_dir_all(&root)
                    .await
                    .with_context(|| format!("clearing global cache at {}", root.display()))?;
                println!("cleared {}", root.display());
            } else {
                println!("nothing to clear at {}", root.display());
            }
        }
    }
    Ok(())
}

/// The CLI has no generator plugin host to query for built-in default
/// templates, so `GeneratorDefault` is always empty in this front-end.
/// Embedding hosts supply a real provider through the library API directly.
struct EmptyGeneratorDefaults;

impl GeneratorDefaultsProvider for EmptyGeneratorDefaults {
    fn has(&self, _name: &TemplateName) -> bool {
        false
    }
    fn read(&self, _name: &TemplateName) -> Option<Vec<u8>> {
        None
    }
}
