//! Working-Directory Builder (C7): materializes the per-spec working
//! directory — final templates, `.orig` backups, transitively discovered
//! partial dependencies, and the `.working-dir-cache` marker.

use crate::cache::{GlobalCache, SessionCache};
use crate::error::PreparationError;
use crate::inventory::SourceInventory;
use crate::types::{GeneratorId, ResolvedTemplate, SourceKind, TemplateBody, TemplateName};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

static LOCK_REGISTRY: Lazy<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static PARTIAL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{>\s*([A-Za-z0-9_.-]+)\s*\}\}").unwrap());

/// Exclusive ownership of one spec's working directory for the duration of
/// its preparation (§5: "a per-spec file lock ... enforces this"). Held for
/// the lifetime of this guard; dropping it releases the slot.
pub struct DirectoryLock(#[allow(dead_code)] OwnedMutexGuard<()>);

pub async fn acquire_lock(path: &Path) -> DirectoryLock {
    let mutex = {
        let mut registry = LOCK_REGISTRY.lock().unwrap();
        registry
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    };
    DirectoryLock(mutex.lock_owned().await)
}

#[derive(Debug, Default)]
pub struct WorkingDirectoryReport {
    pub path: PathBuf,
    pub cache_hit: bool,
    pub templates_written: usize,
    pub customizations_applied: usize,
    pub dependency_templates_written: usize,
}

/// Builds `build/template-work/<generator>-<spec>/`. The caller already holds
/// the directory lock (via [`acquire_lock`]) and has computed `manifest_hash`
/// (C8's job); this function only consults/writes the marker, it does not
/// compute the hash itself, keeping C7 a pure function of its explicit inputs
/// per §9's config-cache note.
///
/// Also the component that updates C8's remaining two tiers: every written
/// base body is pushed into `session_cache` (so a later dependency-discovery
/// read in this same preparation can skip the inventory) and, when
/// `global_cache` is supplied, into the on-disk cross-preparation cache too
/// (§2: "C7 writes outputs and updates C8").
#[allow(clippy::too_many_arguments)]
pub async fn build(
    spec_dir: &Path,
    generator: &GeneratorId,
    resolved: &[ResolvedTemplate],
    inventory: &SourceInventory,
    source_order: &[SourceKind],
    manifest_hash: &str,
    debug_resolution: bool,
    session_cache: &SessionCache,
    generator_version: Option<&str>,
    global_cache: Option<&GlobalCache>,
) -> Result<WorkingDirectoryReport, PreparationError> {
    let marker_path = spec_dir.join(".working-dir-cache");

    if crate::cache::marker::is_valid(&marker_path, manifest_hash).await {
        return Ok(WorkingDirectoryReport {
            path: spec_dir.to_path_buf(),
            cache_hit: true,
            ..Default::default()
        });
    }

    if spec_dir.exists() {
        tokio::fs::remove_dir_all(spec_dir)
            .await
            .map_err(|e| PreparationError::io(spec_dir.display().to_string(), e))?;
    }
    tokio::fs::create_dir_all(spec_dir)
        .await
        .map_err(|e| PreparationError::io(spec_dir.display().to_string(), e))?;

    let mut customizations_applied = 0;
    let mut visited: BTreeSet<TemplateName> = BTreeSet::new();

    for template in resolved {
        write_template_file(spec_dir, &template.name, template.body.as_bytes()).await?;
        visited.insert(template.name.clone());

        if template.was_modified() {
            customizations_applied += template.applied_customizations.len();
            write_orig_backup(spec_dir, generator, &template.name, template.base_body.as_bytes()).await?;
        }

        session_cache.insert(
            generator.clone(),
            generator_version.map(str::to_string),
            template.name.clone(),
            template.base_body.clone(),
        );
        if let Some(cache) = global_cache {
            let version = cache_version_key(generator_version);
            if let Err(e) = cache.put(generator.as_str(), version, &template.name, &template.base_body).await {
                tracing::warn!(template = %template.name, error = %e, "failed to populate global cache");
            }
        }
    }

    let mut pending: Vec<(TemplateName, Vec<u8>)> = resolved
        .iter()
        .map(|t| (t.name.clone(), t.body.as_bytes().to_vec()))
        .collect();
    let mut dependency_templates_written = 0;

    while let Some((_origin, body)) = pending.pop() {
        let text = String::from_utf8_lossy(&body).into_owned();
        for capture in PARTIAL_REF.captures_iter(&text) {
            let dep_name = TemplateName::new(capture[1].to_string());
            if visited.contains(&dep_name) {
                continue;
            }
            visited.insert(dep_name.clone());

            let Some((_, dep_bytes)) = fetch_highest_precedence(
                &dep_name,
                source_order,
                inventory,
                session_cache,
                global_cache,
                generator,
                generator_version,
            )
            .await
            else {
                continue;
            };
            write_template_file(spec_dir, &dep_name, &dep_bytes).await?;
            dependency_templates_written += 1;
            pending.push((dep_name, dep_bytes));
        }
    }

    if debug_resolution {
        write_source_resolution_cache(spec_dir, resolved).await?;
    }

    crate::cache::marker::write(&marker_path, manifest_hash)
        .await
        .map_err(|e| PreparationError::io(marker_path.display().to_string(), e))?;

    Ok(WorkingDirectoryReport {
        path: spec_dir.to_path_buf(),
        cache_hit: false,
        templates_written: resolved.len(),
        customizations_applied,
        dependency_templates_written,
    })
}

/// Resolves one transitively-discovered `{{> name }}` dependency's body,
/// consulting the session cache first, then the global cache, before
/// falling back to a fresh inventory read; populates both on a fresh read or
/// a global-cache hit so later lookups within this preparation (or a later
/// one, for the global cache) skip the inventory entirely.
async fn fetch_highest_precedence(
    name: &TemplateName,
    source_order: &[SourceKind],
    inventory: &SourceInventory,
    session_cache: &SessionCache,
    global_cache: Option<&GlobalCache>,
    generator: &GeneratorId,
    generator_version: Option<&str>,
) -> Option<(SourceKind, Vec<u8>)> {
    if let Some(cached) = session_cache.get(generator, generator_version, name) {
        return Some((SourceKind::GeneratorDefault, cached.into_bytes()));
    }

    for &source in source_order {
        if !source.is_template_source() {
            continue;
        }
        if !inventory.has_template(source, name) {
            continue;
        }

        if let Some(cache) = global_cache {
            let version = cache_version_key(generator_version);
            if let Ok(Some(body)) = cache.get(generator.as_str(), version, name).await {
                session_cache.insert(generator.clone(), generator_version.map(str::to_string), name.clone(), body.clone());
                return Some((source, body.into_bytes()));
            }
        }

        if let Some(body) = inventory.read_template(source, name) {
            let template_body = TemplateBody::new(body.clone());
            session_cache.insert(
                generator.clone(),
                generator_version.map(str::to_string),
                name.clone(),
                template_body.clone(),
            );
            if let Some(cache) = global_cache {
                let version = cache_version_key(generator_version);
                if let Err(e) = cache.put(generator.as_str(), version, name, &template_body).await {
                    tracing::warn!(template = %name, error = %e, "failed to populate global cache");
                }
            }
            return Some((source, body));
        }
    }
    None
}

/// `GlobalCache`'s on-disk layout needs a concrete version string; an
/// unversioned run still gets a stable, distinct cache directory rather than
/// colliding with every other unversioned generator invocation for the
/// wrong reason (it doesn't — it's namespaced by generator name too — but a
/// literal sentinel is clearer in the cache path than an empty segment).
fn cache_version_key(generator_version: Option<&str>) -> &str {
    generator_version.unwrap_or("unversioned")
}

async fn write_template_file(spec_dir: &Path, name: &TemplateName, body: &[u8]) -> Result<(), PreparationError> {
    let path = spec_dir.join(name.as_str());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PreparationError::io(parent.display().to_string(), e))?;
    }
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| PreparationError::io(path.display().to_string(), e))
}

async fn write_orig_backup(
    spec_dir: &Path,
    generator: &GeneratorId,
    name: &TemplateName,
    base_body: &[u8],
) -> Result<(), PreparationError> {
    let path = spec_dir
        .join("orig")
        .join(generator.as_str())
        .join(format!("{}.orig", name.as_str()));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PreparationError::io(parent.display().to_string(), e))?;
    }
    tokio::fs::write(&path, base_body)
        .await
        .map_err(|e| PreparationError::io(path.display().to_string(), e))
}

#[derive(serde::Serialize)]
struct SourceResolutionEntry {
    template: String,
    base_source: String,
    applied_customizations: Vec<String>,
}

async fn write_source_resolution_cache(
    spec_dir: &Path,
    resolved: &[ResolvedTemplate],
) -> Result<(), PreparationError> {
    let entries: Vec<SourceResolutionEntry> = resolved
        .iter()
        .map(|t| SourceResolutionEntry {
            template: t.name.as_str().to_string(),
            base_source: t.base_source.category_name().to_string(),
            applied_customizations: t
                .applied_customizations
                .iter()
                .map(|c| c.document_id.clone())
                .collect(),
        })
        .collect();
    let path = spec_dir.join(".source-resolution-cache");
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| PreparationError::io(path.display().to_string(), std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| PreparationError::io(path.display().to_string(), e))
}
