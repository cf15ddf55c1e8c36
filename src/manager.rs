//! Skill Manager
//!
//! The orchestration layer and single entry point: discovery populates the
//! registry, `invoke` serves processed skill content through the cache, and
//! `execute_script` delegates to the validated script pipeline.

use crate::cache::{CacheStats, ContentCache};
use crate::config::SkillManagerConfig;
use crate::discovery;
use crate::error::{Result, SkillError};
use crate::parser;
use crate::processors::{normalize_arguments, process_skill_content};
use crate::scripts::{ScriptExecutionResult, ScriptExecutor};
use crate::types::{Skill, SkillMetadata, SkillSource};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Central skill registry with discovery, cached invocation, and script
/// execution.
///
/// Discovery degrades gracefully (log and continue); invocation validates
/// strictly (typed errors). The manager is `Send + Sync` and is meant to be
/// shared behind an `Arc`: any number of tasks may invoke concurrently.
/// Invocations of the same skill serialize on that skill's cache lock;
/// different skills run fully in parallel.
pub struct SkillManager {
    sources: Vec<SkillSource>,
    skills: RwLock<HashMap<String, SkillMetadata>>,
    discovered: AtomicBool,
    cache: ContentCache,
    default_script_timeout: Duration,
}

impl SkillManager {
    /// Build a manager from configuration. Fails when an explicitly
    /// configured directory does not exist.
    pub fn new(config: SkillManagerConfig) -> Result<Self> {
        let sources = discovery::build_sources(&config)?;
        Ok(Self {
            sources,
            skills: RwLock::new(HashMap::new()),
            discovered: AtomicBool::new(false),
            cache: ContentCache::new(config.max_cache_size),
            default_script_timeout: config.default_script_timeout,
        })
    }

    /// Zero-configuration manager: default directories when they exist.
    pub fn with_defaults() -> Result<Self> {
        Self::new(SkillManagerConfig::default())
    }

    /// Configured sources in priority order.
    pub fn sources(&self) -> &[SkillSource] {
        &self.sources
    }

    /// Scan all sources and rebuild the registry.
    ///
    /// Malformed skills are logged and skipped. When the same name appears
    /// in several sources the highest-priority source wins and the conflict
    /// is logged. Returns the number of registered skills.
    pub async fn discover(&self) -> Result<usize> {
        info!(sources = self.sources.len(), "starting skill discovery");
        let mut registry: HashMap<String, SkillMetadata> = HashMap::new();

        for source in &self.sources {
            let skill_files = discovery::discover_skills(source).await?;
            for skill_file in skill_files {
                match parser::parse_skill_file(&skill_file).await {
                    Ok(metadata) => {
                        if let Some(existing) = registry.get(&metadata.name) {
                            warn!(
                                skill = %metadata.name,
                                keeping = %existing.skill_path.display(),
                                ignoring = %skill_file.display(),
                                source = source.source_type.as_str(),
                                "skill name conflict; higher-priority source wins"
                            );
                            continue;
                        }
                        debug!(
                            skill = %metadata.name,
                            source = source.source_type.as_str(),
                            "registered skill"
                        );
                        registry.insert(metadata.name.clone(), metadata);
                    }
                    Err(e) => {
                        error!(
                            path = %skill_file.display(),
                            error = %e,
                            "failed to parse skill; skipping"
                        );
                    }
                }
            }
        }

        let count = registry.len();
        *self.skills.write() = registry;
        self.discovered.store(true, Ordering::Release);
        info!(count, "skill discovery complete");
        Ok(count)
    }

    /// All discovered skill metadata, sorted by name.
    pub fn list_skills(&self) -> Vec<SkillMetadata> {
        let mut skills: Vec<_> = self.skills.read().values().cloned().collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    /// Metadata lookup by exact name.
    pub fn get_skill(&self, name: &str) -> Result<SkillMetadata> {
        let skills = self.skills.read();
        skills
            .get(name)
            .cloned()
            .ok_or_else(|| SkillError::SkillNotFound {
                name: name.to_string(),
                available: available_names(&skills),
            })
    }

    /// Full skill instance; content stays on disk until invoked.
    pub fn load_skill(&self, name: &str) -> Result<Skill> {
        let metadata = self.get_skill(name)?;
        let base_directory = metadata
            .skill_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Skill::new(metadata, base_directory))
    }

    /// Invoke a skill: load, process, and cache its content.
    ///
    /// Read-through lookup keyed by (name, normalized arguments) and
    /// validated against the skill file's mtime. The skill lock is released
    /// around the content load, so two concurrent misses for the same key
    /// may both load; last write wins and the result is identical. The
    /// mtime observed before the load is stored with the entry; a file
    /// changing inside that window is caught on the next lookup.
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<String> {
        self.ensure_discovered()?;
        let metadata = self.get_skill(name)?;
        let file_path = metadata.skill_path.clone();
        let base_dir = skill_base_dir(&metadata);
        let normalized = normalize_arguments(arguments);

        let lock = self.cache.skill_lock(name);
        let guard = lock.lock().await;
        let current_mtime = file_mtime(&file_path).await?;
        if let Some(content) = self.cache.get(name, &normalized, current_mtime) {
            debug!(skill = name, "cache hit");
            return Ok(content);
        }
        drop(guard); // never held across the content load

        debug!(skill = name, "cache miss; loading content");
        let raw = tokio::fs::read_to_string(&file_path)
            .await
            .map_err(|e| SkillError::ContentLoad {
                path: file_path.clone(),
                source: e,
            })?;
        let processed = process_skill_content(&raw, &base_dir, arguments)?;

        let _guard = lock.lock().await;
        self.cache
            .put(name, &normalized, processed.clone(), current_mtime);
        Ok(processed)
    }

    /// Execute a named script bundled with a skill.
    ///
    /// `timeout` falls back to the configured default when `None`. Results
    /// are never cached. Security, permission, missing-interpreter, and
    /// serialization failures are errors raised before any process spawns;
    /// runtime outcomes land in the returned result.
    pub async fn execute_script(
        &self,
        skill_name: &str,
        script_name: &str,
        arguments: &HashMap<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<ScriptExecutionResult> {
        self.ensure_discovered()?;
        let skill = self.load_skill(skill_name)?;
        let scripts = skill.scripts().await?;
        let script = scripts
            .iter()
            .find(|s| s.name == script_name)
            .ok_or_else(|| SkillError::ScriptNotFound {
                skill: skill_name.to_string(),
                script: script_name.to_string(),
                available: if scripts.is_empty() {
                    "none".to_string()
                } else {
                    scripts
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                },
            })?;

        let executor = ScriptExecutor::new(timeout.unwrap_or(self.default_script_timeout));
        executor
            .execute(script, &skill.metadata, &skill.base_directory, arguments)
            .await
    }

    /// Cache statistics snapshot.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Clear one skill's cache entries, or everything (resetting counters)
    /// when `skill_name` is `None`. Returns the number of entries dropped.
    ///
    /// A scoped clear holds the skill's lock for the whole sweep so it is
    /// atomic with respect to concurrent invocations of that skill.
    pub async fn clear_cache(&self, skill_name: Option<&str>) -> usize {
        match skill_name {
            Some(name) => {
                let lock = self.cache.skill_lock(name);
                let _guard = lock.lock().await;
                self.cache.invalidate(name)
            }
            None => self.cache.clear(),
        }
    }

    fn ensure_discovered(&self) -> Result<()> {
        if self.discovered.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(SkillError::NotDiscovered)
        }
    }
}

fn skill_base_dir(metadata: &SkillMetadata) -> PathBuf {
    metadata
        .skill_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn available_names(skills: &HashMap<String, SkillMetadata>) -> String {
    if skills.is_empty() {
        return "none".to_string();
    }
    let mut names: Vec<_> = skills.keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

async fn file_mtime(path: &Path) -> Result<SystemTime> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| SkillError::ContentLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
    metadata.modified().map_err(SkillError::Io)
}
