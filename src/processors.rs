//! Argument normalization and skill content processing.

use crate::error::{Result, SkillError};
use crate::parser::skill_body;
use std::path::Path;

/// Ceiling on user-provided invocation arguments.
pub const MAX_ARGUMENT_BYTES: usize = 1024 * 1024;

/// Placeholder replaced with the caller's arguments inside a skill body.
const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

/// Normalize invocation arguments for cache keying.
///
/// Leading/trailing whitespace is dropped and internal whitespace runs
/// collapse to a single space, so formatting variations of the same request
/// share one cache entry. Case is preserved: file paths and other
/// case-sensitive arguments must stay distinct keys.
pub fn normalize_arguments(arguments: &str) -> String {
    arguments.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Produce the final skill content delivered to the agent.
///
/// The first line anchors the skill's base directory so the agent can
/// resolve bundled resources, then the body follows with `$ARGUMENTS`
/// substituted. Bodies without the placeholder get the arguments appended
/// as a `User input:` trailer instead.
pub fn process_skill_content(raw: &str, base_dir: &Path, arguments: &str) -> Result<String> {
    if arguments.len() > MAX_ARGUMENT_BYTES {
        return Err(SkillError::ArgumentsTooLarge {
            size: arguments.len(),
            limit: MAX_ARGUMENT_BYTES,
        });
    }

    let body = skill_body(raw);
    let mut out = format!("Base directory for this skill: {}\n\n", base_dir.display());
    if body.contains(ARGUMENTS_PLACEHOLDER) {
        out.push_str(&body.replace(ARGUMENTS_PLACEHOLDER, arguments));
    } else {
        out.push_str(body);
        if !arguments.is_empty() {
            out.push_str("\n\nUser input: ");
            out.push_str(arguments);
        }
    }
    Ok(out)
}
