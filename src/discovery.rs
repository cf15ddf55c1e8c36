//! Filesystem discovery of skill directories.
//!
//! Sources are scanned in priority order; a skill is any subdirectory of a
//! source that contains a `SKILL.md` file. Discovery degrades gracefully:
//! unreadable directories are skipped with a log line rather than aborting
//! the scan.

use crate::config::{DirSetting, SkillManagerConfig};
use crate::error::{Result, SkillError};
use crate::types::{SkillSource, SourceType};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default locations checked when a source is left on `Auto`.
pub const DEFAULT_PROJECT_DIR: &str = "skills";
pub const DEFAULT_AGENT_CONFIG_DIR: &str = ".claude/skills";

const PRIORITY_PROJECT: i32 = 100;
const PRIORITY_AGENT_CONFIG: i32 = 50;
const PRIORITY_CUSTOM_BASE: i32 = 5;

/// Build the priority-ordered source list from configuration.
///
/// `Auto` sources are added only when their default directory exists;
/// explicit paths must exist or the call fails with a configuration error.
pub fn build_sources(config: &SkillManagerConfig) -> Result<Vec<SkillSource>> {
    let mut sources = Vec::new();

    if let Some(dir) = resolve_setting(
        &config.project_dir,
        Path::new(DEFAULT_PROJECT_DIR),
        "project_dir",
    )? {
        sources.push(SkillSource {
            source_type: SourceType::Project,
            directory: dir,
            priority: PRIORITY_PROJECT,
        });
    }

    if let Some(dir) = resolve_setting(
        &config.agent_config_dir,
        Path::new(DEFAULT_AGENT_CONFIG_DIR),
        "agent_config_dir",
    )? {
        sources.push(SkillSource {
            source_type: SourceType::AgentConfig,
            directory: dir,
            priority: PRIORITY_AGENT_CONFIG,
        });
    }

    for (i, path) in config.additional_search_paths.iter().enumerate() {
        if !path.is_dir() {
            return Err(SkillError::Configuration {
                parameter: "additional_search_paths",
                path: path.clone(),
            });
        }
        sources.push(SkillSource {
            source_type: SourceType::Custom,
            directory: canonical_or_owned(path),
            priority: PRIORITY_CUSTOM_BASE - i as i32,
        });
    }

    sources.sort_by_key(|s| std::cmp::Reverse(s.priority));

    if sources.is_empty() {
        info!("no skill directories found; initialized with empty skill list");
    }
    debug!(count = sources.len(), "built skill sources");

    Ok(sources)
}

fn resolve_setting(
    setting: &DirSetting,
    default: &Path,
    parameter: &'static str,
) -> Result<Option<PathBuf>> {
    match setting {
        DirSetting::Auto => {
            if default.is_dir() {
                Ok(Some(canonical_or_owned(default)))
            } else {
                Ok(None)
            }
        }
        DirSetting::Disabled => Ok(None),
        DirSetting::Path(path) => {
            if path.is_dir() {
                Ok(Some(canonical_or_owned(path)))
            } else {
                Err(SkillError::Configuration {
                    parameter,
                    path: path.clone(),
                })
            }
        }
    }
}

fn canonical_or_owned(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// List SKILL.md files under a source, one per skill subdirectory.
///
/// Results are sorted by path for deterministic registration order.
pub async fn discover_skills(source: &SkillSource) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries = match tokio::fs::read_dir(&source.directory).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                directory = %source.directory.display(),
                error = %e,
                "skipping unreadable skill source"
            );
            return Ok(found);
        }
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let skill_file = path.join("SKILL.md");
        if tokio::fs::try_exists(&skill_file).await.unwrap_or(false) {
            found.push(skill_file);
        } else {
            debug!(directory = %path.display(), "directory without SKILL.md skipped");
        }
    }

    found.sort();
    Ok(found)
}
