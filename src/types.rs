//! Skill Type Definitions
//!
//! Core data structures for the skill system: discovered metadata, loaded
//! skills, skill sources, and bundled script references.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How deep inside `scripts/` bundled scripts may be nested.
const MAX_SCRIPT_DEPTH: usize = 5;

/// Lightweight skill metadata parsed from SKILL.md front matter.
///
/// Only metadata is held after discovery; the skill body is loaded on demand
/// when the skill is invoked (progressive disclosure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Unique skill name (alphanumeric plus `-`/`_`).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Semantic version from front matter (default "0.0.0").
    pub version: String,
    /// Declared tool names, carried through for compatibility.
    /// Never inspected by the executor; restriction is not enforced.
    pub allowed_tools: Vec<String>,
    /// Absolute path of the SKILL.md file.
    pub skill_path: PathBuf,
}

/// A loaded skill: metadata plus the directory its resources live under.
#[derive(Debug, Clone)]
pub struct Skill {
    pub metadata: SkillMetadata,
    /// Parent directory of SKILL.md; the containment root for script paths.
    pub base_directory: PathBuf,
}

impl Skill {
    pub fn new(metadata: SkillMetadata, base_directory: PathBuf) -> Self {
        Self {
            metadata,
            base_directory,
        }
    }

    /// Detect executable scripts bundled under `scripts/`.
    ///
    /// Detection is lazy: nothing is scanned until a caller asks. Scripts in
    /// nested subdirectories are named by their relative path without the
    /// extension (e.g. `pdf/extract`). Files with unrecognized extensions are
    /// skipped. A missing `scripts/` directory is not an error.
    pub async fn scripts(&self) -> Result<Vec<ScriptMetadata>> {
        let scripts_dir = self.base_directory.join("scripts");
        let mut found = Vec::new();
        collect_scripts(&scripts_dir, String::new(), 0, &mut found).await?;
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

/// Recursive scan of the scripts directory, bounded by `MAX_SCRIPT_DEPTH`.
async fn collect_scripts(
    dir: &Path,
    prefix: String,
    depth: usize,
    out: &mut Vec<ScriptMetadata>,
) -> Result<()> {
    if depth > MAX_SCRIPT_DEPTH {
        return Ok(());
    }
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        if file_type.is_dir() {
            let nested = if prefix.is_empty() {
                format!("{file_name}/")
            } else {
                format!("{prefix}{file_name}/")
            };
            Box::pin(collect_scripts(&path, nested, depth + 1, out)).await?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        let Some(script_type) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ScriptType::from_extension)
        else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        out.push(ScriptMetadata {
            name: format!("{prefix}{stem}"),
            path,
            script_type,
        });
    }
    Ok(())
}

/// A bundled script: logical name, location, and interpreter classification.
#[derive(Debug, Clone)]
pub struct ScriptMetadata {
    /// Logical name without extension, relative to `scripts/`.
    pub name: String,
    /// Path of the script file as discovered.
    pub path: PathBuf,
    /// Interpreter classification derived from the file extension.
    pub script_type: ScriptType,
}

/// Script interpreter classes, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    Python,
    Shell,
    Node,
}

impl ScriptType {
    /// Map a file extension to an interpreter class.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "py" => Some(Self::Python),
            "sh" => Some(Self::Shell),
            "js" => Some(Self::Node),
            _ => None,
        }
    }

    /// Interpreter binary expected on PATH.
    pub fn interpreter(&self) -> &'static str {
        match self {
            Self::Python => "python3",
            Self::Shell => "sh",
            Self::Node => "node",
        }
    }
}

/// Where a skill directory was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// Project-local skills (`./skills`), highest priority.
    Project,
    /// Agent config skills (`./.claude/skills`).
    AgentConfig,
    /// Additional search paths, lowest priority.
    Custom,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::AgentConfig => "agent-config",
            Self::Custom => "custom",
        }
    }
}

/// A skill directory with its conflict-resolution priority.
#[derive(Debug, Clone)]
pub struct SkillSource {
    pub source_type: SourceType,
    pub directory: PathBuf,
    pub priority: i32,
}
