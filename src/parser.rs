//! SKILL.md front matter parsing.
//!
//! A skill file starts with a YAML block between `---` fences, followed by
//! the markdown body that becomes the skill content:
//!
//! ```text
//! ---
//! name: code-reviewer
//! description: Review code for best practices
//! version: 1.2.0
//! allowed-tools:
//!   - Read
//!   - Grep
//! ---
//! Review the following code: $ARGUMENTS
//! ```

use crate::error::{Result, SkillError};
use crate::types::SkillMetadata;
use serde::Deserialize;
use std::path::Path;

/// Raw front matter shape as written in SKILL.md.
#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: String,
    description: String,
    #[serde(default)]
    version: Option<String>,
    /// Inert pass-through; never wired into any enforcement path.
    #[serde(rename = "allowed-tools", default)]
    allowed_tools: Vec<String>,
}

/// Split a skill file into its front matter and body.
///
/// Returns `None` when the file does not open with a `---` fence.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    for fence in ["\n---\n", "\n---\r\n", "\r\n---\r\n", "\r\n---\n"] {
        if let Some(idx) = rest.find(fence) {
            return Some((&rest[..idx], &rest[idx + fence.len()..]));
        }
    }
    // Fence on the last line without a trailing newline.
    if let Some(stripped) = rest.strip_suffix("\n---").or_else(|| rest.strip_suffix("\r\n---")) {
        return Some((stripped, ""));
    }
    None
}

/// Body of a skill file with the front matter removed.
///
/// Files without a front matter block are returned unchanged so that a
/// malformed body still produces usable content for the caller that already
/// holds validated metadata.
pub fn skill_body(content: &str) -> &str {
    match split_front_matter(content) {
        Some((_, body)) => body,
        None => content,
    }
}

/// Parse skill metadata from file content.
pub fn parse_skill_str(content: &str, path: &Path) -> Result<SkillMetadata> {
    let (front, _) = split_front_matter(content).ok_or_else(|| SkillError::Parse {
        path: path.to_path_buf(),
        reason: "missing YAML front matter (expected leading '---' block)".into(),
    })?;

    let front: FrontMatter = serde_yaml::from_str(front).map_err(|e| SkillError::Parse {
        path: path.to_path_buf(),
        reason: format!("invalid front matter: {e}"),
    })?;

    if front.name.is_empty() {
        return Err(SkillError::Parse {
            path: path.to_path_buf(),
            reason: "front matter field 'name' is empty".into(),
        });
    }
    if !front
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SkillError::Parse {
            path: path.to_path_buf(),
            reason: format!("invalid skill name '{}'", front.name),
        });
    }
    if front.description.is_empty() {
        return Err(SkillError::Parse {
            path: path.to_path_buf(),
            reason: "front matter field 'description' is empty".into(),
        });
    }

    Ok(SkillMetadata {
        name: front.name,
        description: front.description,
        version: front.version.unwrap_or_else(|| "0.0.0".to_string()),
        allowed_tools: front.allowed_tools,
        skill_path: path.to_path_buf(),
    })
}

/// Read and parse a SKILL.md file.
pub async fn parse_skill_file(path: &Path) -> Result<SkillMetadata> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SkillError::ContentLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
    parse_skill_str(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID: &str = "---\nname: code-reviewer\ndescription: Review code\nversion: 1.2.0\nallowed-tools:\n  - Read\n  - Grep\n---\nReview: $ARGUMENTS\n";

    #[test]
    fn parses_valid_front_matter() {
        let meta = parse_skill_str(VALID, &PathBuf::from("SKILL.md")).unwrap();
        assert_eq!(meta.name, "code-reviewer");
        assert_eq!(meta.description, "Review code");
        assert_eq!(meta.version, "1.2.0");
        assert_eq!(meta.allowed_tools, vec!["Read", "Grep"]);
    }

    #[test]
    fn version_defaults_when_absent() {
        let content = "---\nname: x\ndescription: y\n---\nbody\n";
        let meta = parse_skill_str(content, &PathBuf::from("SKILL.md")).unwrap();
        assert_eq!(meta.version, "0.0.0");
        assert!(meta.allowed_tools.is_empty());
    }

    #[test]
    fn missing_front_matter_is_parse_error() {
        let err = parse_skill_str("just markdown", &PathBuf::from("SKILL.md")).unwrap_err();
        assert!(matches!(err, SkillError::Parse { .. }));
    }

    #[test]
    fn missing_name_is_parse_error() {
        let content = "---\ndescription: y\n---\nbody\n";
        assert!(parse_skill_str(content, &PathBuf::from("SKILL.md")).is_err());
    }

    #[test]
    fn invalid_name_characters_rejected() {
        let content = "---\nname: \"bad name!\"\ndescription: y\n---\nbody\n";
        assert!(parse_skill_str(content, &PathBuf::from("SKILL.md")).is_err());
    }

    #[test]
    fn body_excludes_front_matter() {
        assert_eq!(skill_body(VALID), "Review: $ARGUMENTS\n");
        assert_eq!(skill_body("no fences"), "no fences");
    }
}
