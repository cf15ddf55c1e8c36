//! Skill Manager Integration Tests
//!
//! End-to-end: discovery over a fixture tree, cached invocation, argument
//! normalization, mtime invalidation, and cache clearing.

use skillkit::{DirSetting, SkillError, SkillManager, SkillManagerConfig};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_skill(root: &Path, name: &str, body: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("SKILL.md"),
        format!("---\nname: {name}\ndescription: a test skill\nversion: 1.0.0\n---\n{body}\n"),
    )
    .unwrap();
}

fn fixture_manager(root: &Path) -> SkillManager {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    SkillManager::new(SkillManagerConfig {
        project_dir: DirSetting::Path(root.to_path_buf()),
        agent_config_dir: DirSetting::Disabled,
        ..SkillManagerConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_discover_and_list() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "code-reviewer", "Review: $ARGUMENTS");
    write_skill(tmp.path(), "git-helper", "Generate commit messages");

    let manager = fixture_manager(tmp.path());
    let count = manager.discover().await.unwrap();
    assert_eq!(count, 2);

    let names: Vec<_> = manager.list_skills().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["code-reviewer", "git-helper"]);
}

#[tokio::test]
async fn test_invoke_processes_content() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "code-reviewer", "Review: $ARGUMENTS");

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    let content = manager.invoke("code-reviewer", "main.rs").await.unwrap();
    let first_line = content.lines().next().unwrap();
    assert!(first_line.starts_with("Base directory for this skill: "));
    assert!(first_line.ends_with("code-reviewer"));
    assert!(content.contains("Review: main.rs"));
}

#[tokio::test]
async fn test_cache_hit_on_repeated_invocation() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "skill", "Body: $ARGUMENTS");

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    for _ in 0..5 {
        manager.invoke("skill", "same-args").await.unwrap();
    }

    let stats = manager.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 4);
    assert!((stats.hit_rate() - 0.8).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_whitespace_variations_share_cache_entry() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "skill", "Body: $ARGUMENTS");

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    manager.invoke("skill", " file.pdf").await.unwrap();
    manager.invoke("skill", "file.pdf ").await.unwrap();
    manager.invoke("skill", "  file.pdf  ").await.unwrap();

    let stats = manager.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_case_differences_are_distinct_entries() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "skill", "Body: $ARGUMENTS");

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    manager.invoke("skill", "file.pdf").await.unwrap();
    manager.invoke("skill", "FILE.PDF").await.unwrap();

    let stats = manager.cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.size, 2);
}

#[tokio::test]
async fn test_mtime_change_invalidates_cached_content() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "skill", "old body");

    let skill_file = tmp.path().join("skill").join("SKILL.md");
    // Backdate so the rewrite below is guaranteed to change the mtime even
    // on coarse-grained filesystems.
    let old = SystemTime::now() - Duration::from_secs(3600);
    let file = std::fs::File::options().write(true).open(&skill_file).unwrap();
    file.set_modified(old).unwrap();
    drop(file);

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    let first = manager.invoke("skill", "").await.unwrap();
    assert!(first.contains("old body"));
    assert_eq!(manager.cache_stats().misses, 1);

    std::fs::write(
        &skill_file,
        "---\nname: skill\ndescription: a test skill\n---\nnew body\n",
    )
    .unwrap();

    let second = manager.invoke("skill", "").await.unwrap();
    assert!(second.contains("new body"));
    let stats = manager.cache_stats();
    assert_eq!(stats.misses, 2, "mtime change must be a miss");
}

#[tokio::test]
async fn test_clear_cache_scoped_and_unscoped() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "alpha", "A: $ARGUMENTS");
    write_skill(tmp.path(), "beta", "B: $ARGUMENTS");

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    manager.invoke("alpha", "one").await.unwrap();
    manager.invoke("alpha", "two").await.unwrap();
    manager.invoke("beta", "one").await.unwrap();
    assert_eq!(manager.cache_stats().size, 3);

    // Scoped clear drops only alpha's entries, counters keep running.
    let cleared = manager.clear_cache(Some("alpha")).await;
    assert_eq!(cleared, 2);
    let stats = manager.cache_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.misses, 3);

    // Unscoped clear drops everything and resets counters.
    let cleared = manager.clear_cache(None).await;
    assert_eq!(cleared, 1);
    let stats = manager.cache_stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_priority_conflict_resolution() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    let config = tmp.path().join("config");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::create_dir_all(&config).unwrap();

    let write_with_desc = |root: &Path, desc: &str| {
        let dir = root.join("shared-skill");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: shared-skill\ndescription: {desc}\n---\nbody\n"),
        )
        .unwrap();
    };
    write_with_desc(&project, "project version");
    write_with_desc(&config, "config version");

    let manager = SkillManager::new(SkillManagerConfig {
        project_dir: DirSetting::Path(project),
        agent_config_dir: DirSetting::Path(config),
        ..SkillManagerConfig::default()
    })
    .unwrap();
    manager.discover().await.unwrap();

    let skill = manager.get_skill("shared-skill").unwrap();
    assert_eq!(skill.description, "project version");
}

#[tokio::test]
async fn test_allowed_tools_carried_but_inert() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("restricted");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("SKILL.md"),
        "---\nname: restricted\ndescription: carries tool list\nallowed-tools:\n  - Read\n  - Bash\n---\nbody\n",
    )
    .unwrap();

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    let skill = manager.get_skill("restricted").unwrap();
    assert_eq!(skill.allowed_tools, vec!["Read", "Bash"]);
    // The field is a pass-through; invocation ignores it entirely.
    assert!(manager.invoke("restricted", "anything").await.is_ok());
}

#[tokio::test]
async fn test_concurrent_invocations_of_distinct_skills() {
    let tmp = TempDir::new().unwrap();
    for i in 0..10 {
        write_skill(tmp.path(), &format!("skill-{i}"), "Body: $ARGUMENTS");
    }

    let manager = std::sync::Arc::new(fixture_manager(tmp.path()));
    manager.discover().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let manager = std::sync::Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.invoke(&format!("skill-{i}"), "args").await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().contains("Body: args"));
    }

    let stats = manager.cache_stats();
    assert_eq!(stats.size, 10);
    assert_eq!(stats.misses, 10);
}

#[tokio::test]
async fn test_invoke_missing_skill() {
    let tmp = TempDir::new().unwrap();
    write_skill(tmp.path(), "present", "body");

    let manager = fixture_manager(tmp.path());
    manager.discover().await.unwrap();

    let err = manager.invoke("absent", "").await.unwrap_err();
    assert!(matches!(err, SkillError::SkillNotFound { .. }));
}
