//! skillkit
//!
//! On-demand loading of agent "skills": markdown instruction bundles with
//! optional executable scripts, discovered from the filesystem and served
//! through a concurrency-safe content cache.
//!
//! # Features
//!
//! - **Progressive disclosure**: discovery keeps only front-matter metadata;
//!   full content is loaded, processed, and cached on first invocation
//! - **Content cache**: per-skill locking granularity, global LRU eviction,
//!   mtime-based invalidation, hit/miss statistics
//! - **Script execution**: path containment, setuid/setgid rejection,
//!   interpreter resolution, hard timeouts, 10 MiB output ceilings
//! - **Multi-source discovery**: project, agent-config, and custom skill
//!   directories with priority-based conflict resolution
//!
//! # Architecture
//!
//! ```text
//! SkillManager ──► ContentCache ──► [hit] processed content
//!      │               │
//!      │             [miss] ──► load + process ──► put ──► content
//!      │
//!      └── execute_script ──► PathValidator ──► ScriptExecutor
//!                                                   │
//!                                        ScriptExecutionResult
//!                                        (never cached)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skillkit::{SkillManager, SkillManagerConfig};
//!
//! # async fn run() -> skillkit::Result<()> {
//! let manager = SkillManager::new(SkillManagerConfig::default())?;
//! manager.discover().await?;
//!
//! let content = manager.invoke("code-reviewer", "review main.rs").await?;
//! println!("{content}");
//!
//! let stats = manager.cache_stats();
//! println!("hit rate: {:.1}%", stats.hit_rate() * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod parser;
pub mod path_security;
pub mod processors;
pub mod scripts;
pub mod types;

pub use cache::{CacheKey, CacheStats, ContentCache};
pub use config::{DirSetting, SkillManagerConfig};
pub use error::{Result, SkillError};
pub use manager::SkillManager;
pub use path_security::PathValidator;
pub use scripts::{ScriptExecutionResult, ScriptExecutor, MAX_OUTPUT_BYTES};
pub use types::{ScriptMetadata, ScriptType, Skill, SkillMetadata, SkillSource, SourceType};
