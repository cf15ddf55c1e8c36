//! Path containment validation for skill resources.
//!
//! Scripts and other bundled resources are referenced relative to a skill's
//! base directory. Every reference is canonicalized and checked for
//! containment before use, so `..` segments, absolute-path overrides, and
//! symlinks pointing outside the skill directory are all rejected by the
//! same prefix check. Validation is pure: no side effects beyond `stat`.

use crate::error::{Result, SkillError};
use std::path::{Path, PathBuf};

/// Validates that resolved paths stay inside a skill's base directory.
#[derive(Debug, Clone)]
pub struct PathValidator {
    base: PathBuf,
}

impl PathValidator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolve a reference against the base directory.
    ///
    /// Returns the canonical absolute path, or a security error when the
    /// canonical result is not a descendant of the canonical base. Nested
    /// subdirectories resolve through the same containment check; there is
    /// no per-level special casing.
    pub fn resolve(&self, reference: impl AsRef<Path>) -> Result<PathBuf> {
        let canonical_base = self.base.canonicalize()?;
        // An absolute reference replaces the base on join; the containment
        // check below still catches any escape.
        let candidate = canonical_base.join(reference.as_ref());
        let resolved = candidate.canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SkillError::ContentLoad {
                    path: candidate.clone(),
                    source: e,
                }
            } else {
                SkillError::Io(e)
            }
        })?;

        if !resolved.starts_with(&canonical_base) {
            return Err(SkillError::PathSecurity {
                path: resolved,
                base: canonical_base,
            });
        }
        Ok(resolved)
    }
}
