//! Error taxonomy for skill loading and script execution.
//!
//! Pre-spawn failures (security, permissions, missing skill/script/interpreter,
//! argument serialization) surface as [`SkillError`] variants. A script that
//! runs and fails (non-zero exit, timeout, signal) is *not* an error: that
//! outcome is reported inside [`crate::scripts::ScriptExecutionResult`] so the
//! caller can still inspect captured output.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SkillError>;

/// All failures the skill system can surface to a caller.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Requested skill is not in the registry.
    #[error("skill '{name}' not found. Available skills: {available}")]
    SkillNotFound { name: String, available: String },

    /// Requested script does not exist in the skill's scripts directory.
    #[error("script '{script}' not found in skill '{skill}'. Available scripts: {available}")]
    ScriptNotFound {
        skill: String,
        script: String,
        available: String,
    },

    /// Interpreter required by the script's extension is not on PATH.
    #[error("interpreter '{0}' not found on PATH")]
    InterpreterNotFound(String),

    /// Resolved path escapes the skill's base directory.
    #[error("path '{}' resolves outside the skill directory '{}'", path.display(), base.display())]
    PathSecurity { path: PathBuf, base: PathBuf },

    /// Script carries setuid/setgid bits or similar dangerous permissions.
    #[error("script '{}' has dangerous permissions (mode {mode:o})", path.display())]
    ScriptPermission { path: PathBuf, mode: u32 },

    /// Script arguments could not be serialized to JSON.
    #[error("failed to serialize script arguments: {0}")]
    ArgumentSerialization(#[from] serde_json::Error),

    /// Serialized arguments exceed the configured size ceiling.
    #[error("arguments exceed size limit: {size} bytes (max {limit})")]
    ArgumentsTooLarge { size: usize, limit: usize },

    /// Skill file disappeared or became unreadable after discovery.
    #[error("failed to load skill content from '{}': {source}", path.display())]
    ContentLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed SKILL.md (front matter missing or invalid).
    #[error("failed to parse skill at '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Explicitly configured directory does not exist.
    #[error("configured directory does not exist: {parameter}='{}'", path.display())]
    Configuration {
        parameter: &'static str,
        path: PathBuf,
    },

    /// A registry operation was attempted before `discover()`.
    #[error("manager not initialized; call discover() before invoking skills")]
    NotDiscovered,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
