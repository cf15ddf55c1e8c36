//! Skill Content Cache
//!
//! LRU cache for processed skill content, keyed by (skill name, normalized
//! arguments), with modification-time invalidation and hit/miss statistics.
//!
//! # Locking model
//!
//! Three kinds of locks, always acquired in this order and never nested the
//! other way:
//!
//! 1. **Per-skill locks** — one canonical `tokio::sync::Mutex` per skill
//!    name, handed out by [`ContentCache::skill_lock`]. Callers hold it
//!    around lookup and insert so same-skill invocations serialize while
//!    different skills proceed fully in parallel. The lock registry is
//!    guarded by its own narrow mutex so exactly one lock object ever
//!    exists per skill name; constructing a fresh lock per lookup would
//!    break mutual exclusion silently.
//! 2. **Entry map lock** — a short-critical-section `parking_lot::Mutex`
//!    over the entry map, never held across I/O or `.await`.
//! 3. **Stats lock** — a dedicated mutex for the hit/miss counters.
//!
//! Callers must not hold a skill lock across the slow content load: the
//! read-through pattern is lock → lookup → unlock → load → lock → insert.
//! Two concurrent misses for the same key may then both perform the load;
//! last write wins and the cache stays correct. That duplicate work is an
//! accepted trade for parallelism, not a bug.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Composite cache key. The arguments component is pre-normalized by the
/// caller and treated as opaque, exact-match only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub skill: String,
    pub args: String,
}

/// One cached piece of processed content. Replaced wholesale on reload,
/// never mutated field-by-field.
#[derive(Debug, Clone)]
struct CachedEntry {
    content: String,
    /// Source mtime observed at load. The entry is valid only while this
    /// equals the file's current mtime; any change makes it a miss.
    source_mtime: SystemTime,
    /// Global access sequence number, used for LRU ordering. Insertion
    /// assigns a sequence too, so eviction order has no ties.
    last_access: u64,
}

/// Point-in-time cache statistics snapshot.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CachedEntry>,
    access_seq: u64,
}

/// Concurrency-safe content cache with per-skill locking granularity.
pub struct ContentCache {
    max_size: usize,
    inner: Mutex<Inner>,
    counters: Mutex<Counters>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContentCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            inner: Mutex::new(Inner::default()),
            counters: Mutex::new(Counters::default()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get or lazily create the canonical lock for a skill.
    ///
    /// All argument variants of one skill share this lock. Repeated calls
    /// for the same name return the same `Arc` for the lifetime of the
    /// cache.
    pub fn skill_lock(&self, skill: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(skill.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Look up cached content, validating against the source's current mtime.
    ///
    /// A present entry whose stored mtime differs from `current_mtime` is
    /// stale: it is removed and the lookup counts as a miss. Every call
    /// records exactly one hit or one miss.
    pub fn get(&self, skill: &str, args: &str, current_mtime: SystemTime) -> Option<String> {
        let key = CacheKey {
            skill: skill.to_string(),
            args: args.to_string(),
        };

        let mut inner = self.inner.lock();
        inner.access_seq += 1;
        let seq = inner.access_seq;

        let mut content = None;
        let mut stale = false;
        if let Some(entry) = inner.entries.get_mut(&key) {
            if entry.source_mtime == current_mtime {
                entry.last_access = seq;
                content = Some(entry.content.clone());
            } else {
                stale = true;
            }
        }
        if stale {
            inner.entries.remove(&key);
            debug!(skill, "stale cache entry dropped (source modified)");
        }
        drop(inner);

        let mut counters = self.counters.lock();
        if content.is_some() {
            counters.hits += 1;
        } else {
            counters.misses += 1;
        }
        content
    }

    /// Insert or replace an entry, evicting the global least-recently-used
    /// entry if the cache grew past its maximum size.
    pub fn put(&self, skill: &str, args: &str, content: String, source_mtime: SystemTime) {
        let key = CacheKey {
            skill: skill.to_string(),
            args: args.to_string(),
        };

        let mut inner = self.inner.lock();
        inner.access_seq += 1;
        let seq = inner.access_seq;
        inner.entries.insert(
            key,
            CachedEntry {
                content,
                source_mtime,
                last_access: seq,
            },
        );

        if inner.entries.len() > self.max_size {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                inner.entries.remove(&victim);
                debug!(skill = %victim.skill, "evicted least-recently-used cache entry");
            }
        }
    }

    /// Drop every entry whose key's skill component matches.
    ///
    /// Callers hold the skill's lock for the whole sweep so invalidation is
    /// atomic with respect to concurrent lookups on that skill.
    pub fn invalidate(&self, skill: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| key.skill != skill);
        let cleared = before - inner.entries.len();
        if cleared > 0 {
            debug!(skill, cleared, "invalidated cache entries");
        }
        cleared
    }

    /// Drop everything and reset statistics.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let cleared = inner.entries.len();
        inner.entries.clear();
        inner.access_seq = 0;
        drop(inner);

        let mut counters = self.counters.lock();
        counters.hits = 0;
        counters.misses = 0;
        cleared
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let size = self.inner.lock().entries.len();
        let counters = self.counters.lock();
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            size,
            max_size: self.max_size,
        }
    }
}
