//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

/// Bounds for the default script timeout.
const MIN_SCRIPT_TIMEOUT_SECS: u64 = 1;
const MAX_SCRIPT_TIMEOUT_SECS: u64 = 600;

/// Tri-state directory setting for a skill source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirSetting {
    /// Use the default location if it exists; silently skip otherwise.
    #[default]
    Auto,
    /// Explicit opt-out: never scan this source.
    Disabled,
    /// Explicit path: must exist or configuration fails.
    Path(PathBuf),
}

/// Skill manager configuration
#[derive(Debug, Clone)]
pub struct SkillManagerConfig {
    /// Project skills directory (default `./skills`, priority 100).
    pub project_dir: DirSetting,

    /// Agent config skills directory (default `./.claude/skills`, priority 50).
    pub agent_config_dir: DirSetting,

    /// Additional skill directories (priority 5, 4, 3, ...). Each must exist.
    pub additional_search_paths: Vec<PathBuf>,

    /// Timeout applied when a script execution does not specify one.
    pub default_script_timeout: Duration,

    /// Maximum number of cached skill content entries.
    pub max_cache_size: usize,
}

impl Default for SkillManagerConfig {
    fn default() -> Self {
        Self {
            project_dir: DirSetting::Auto,
            agent_config_dir: DirSetting::Auto,
            additional_search_paths: Vec::new(),
            default_script_timeout: Duration::from_secs(30),
            max_cache_size: 100,
        }
    }
}

impl SkillManagerConfig {
    /// Load configuration from environment variables.
    ///
    /// `SKILLKIT_PROJECT_DIR` / `SKILLKIT_CONFIG_DIR` follow the tri-state
    /// rule: unset keeps the default location, an empty value opts out, any
    /// other value is an explicit path. `SKILLKIT_SCRIPT_TIMEOUT` is clamped
    /// to 1-600 seconds.
    pub fn from_env() -> Self {
        let project_dir = dir_setting_from_env("SKILLKIT_PROJECT_DIR");
        let agent_config_dir = dir_setting_from_env("SKILLKIT_CONFIG_DIR");

        let default_script_timeout = std::env::var("SKILLKIT_SCRIPT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs.clamp(MIN_SCRIPT_TIMEOUT_SECS, MAX_SCRIPT_TIMEOUT_SECS))
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_cache_size = std::env::var("SKILLKIT_CACHE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(100);

        Self {
            project_dir,
            agent_config_dir,
            additional_search_paths: Vec::new(),
            default_script_timeout,
            max_cache_size,
        }
    }
}

fn dir_setting_from_env(var: &str) -> DirSetting {
    match std::env::var(var) {
        Ok(value) if value.is_empty() => DirSetting::Disabled,
        Ok(value) => DirSetting::Path(PathBuf::from(value)),
        Err(_) => DirSetting::Auto,
    }
}
