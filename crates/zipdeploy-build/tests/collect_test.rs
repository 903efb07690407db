mod common;

use common::{MockRepo, git_failed, no_vcs, text, write, write_zip};
use std::path::Path;
use tempfile::TempDir;
use zipdeploy_build::{CollectError, CollectStrategy, IgnoreSpec, SourceCollector};

fn repo_vcs() -> MockRepo {
    let mut vcs = MockRepo::new();
    vcs.expect_is_repository().return_const(true);
    vcs
}

fn sample_project(root: &Path) {
    write(root, "app.py", "print('hi')");
    write(root, "src/lib.py", "X = 1");
    write(root, "logs/debug.log", "noise");
    write(root, "logs/important.log", "keep me");
    write(root, ".git/HEAD", "ref: refs/heads/main");
    std::fs::create_dir_all(root.join("empty")).unwrap();
}

// ── Strategy selection ──

#[test]
fn strategy_choose_rules() {
    assert_eq!(CollectStrategy::choose(false, false, false), CollectStrategy::Walk);
    assert_eq!(CollectStrategy::choose(false, true, true), CollectStrategy::Walk);
    assert_eq!(CollectStrategy::choose(true, true, false), CollectStrategy::Walk);
    assert_eq!(
        CollectStrategy::choose(true, false, false),
        CollectStrategy::Snapshot { staged: false }
    );
    assert_eq!(
        CollectStrategy::choose(true, false, true),
        CollectStrategy::Snapshot { staged: true }
    );
}

#[test]
fn repository_without_ignore_file_uses_snapshot() {
    let tmp = TempDir::new().unwrap();
    let vcs = repo_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let collector = SourceCollector::new(tmp.path(), &vcs, &ignore, false);

    assert_eq!(collector.strategy(), CollectStrategy::Snapshot { staged: false });
}

#[test]
fn repository_with_ignore_file_uses_walk() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".ebignore", "*.log\n");
    let vcs = repo_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let collector = SourceCollector::new(tmp.path(), &vcs, &ignore, true);

    assert_eq!(collector.strategy(), CollectStrategy::Walk);
}

// ── Walk mode ──

#[test]
fn walk_without_ignore_file_includes_everything_but_git() {
    let tmp = TempDir::new().unwrap();
    sample_project(tmp.path());
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();
    let scratch = TempDir::new().unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .collect(scratch.path())
        .unwrap();

    assert_eq!(
        archive.paths().collect::<Vec<_>>(),
        vec![
            "app.py",
            "empty",
            "logs",
            "logs/debug.log",
            "logs/important.log",
            "src",
            "src/lib.py",
        ]
    );
    assert!(archive.get("empty").unwrap().is_dir());
    assert_eq!(text(&archive, "src/lib.py"), "X = 1");
}

#[test]
fn walk_applies_ignore_patterns_with_negation() {
    let tmp = TempDir::new().unwrap();
    sample_project(tmp.path());
    write(tmp.path(), ".ebignore", "*.log\n!important.log\nempty/\n");
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();
    let scratch = TempDir::new().unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .collect(scratch.path())
        .unwrap();

    assert!(archive.contains("logs/important.log"));
    assert!(!archive.contains("logs/debug.log"));
    assert!(!archive.contains("empty"));
    assert!(archive.contains(".ebignore"));
    assert!(!archive.contains(".git"));
    assert!(!archive.contains(".git/HEAD"));
}

#[test]
fn walk_adds_parent_markers_for_reincluded_files() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "build/out.bin", "bin");
    write(tmp.path(), "build/keep/manifest.json", "{}");
    write(tmp.path(), ".ebignore", "build/\n!build/keep/manifest.json\n");
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();
    let scratch = TempDir::new().unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .collect(scratch.path())
        .unwrap();

    assert!(archive.contains("build/keep/manifest.json"));
    assert!(archive.get("build").unwrap().is_dir());
    assert!(archive.get("build/keep").unwrap().is_dir());
    assert!(!archive.contains("build/out.bin"));
}

#[cfg(unix)]
#[test]
fn walk_preserves_permissions() {
    use std::os::unix::fs::PermissionsExt;
    use zipdeploy_build::Entry;

    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bin/start.sh", "#!/bin/sh\n");
    std::fs::set_permissions(
        tmp.path().join("bin/start.sh"),
        std::fs::Permissions::from_mode(0o755),
    )
    .unwrap();
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();
    let scratch = TempDir::new().unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .collect(scratch.path())
        .unwrap();

    match archive.get("bin/start.sh").unwrap() {
        Entry::File { mode, .. } => assert_eq!(*mode, Some(0o755)),
        other => panic!("expected file, got {other:?}"),
    }
}

#[test]
fn walk_preserves_modification_time() {
    use chrono::TimeZone;
    use zipdeploy_build::Entry;

    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "app.py", "print('hi')");
    let stamp = chrono::Local
        .with_ymd_and_hms(2023, 6, 15, 10, 30, 20)
        .single()
        .unwrap();
    std::fs::File::options()
        .write(true)
        .open(tmp.path().join("app.py"))
        .unwrap()
        .set_modified(stamp.into())
        .unwrap();
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();
    let scratch = TempDir::new().unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .collect(scratch.path())
        .unwrap();

    match archive.get("app.py").unwrap() {
        Entry::File { modified, .. } => assert_eq!(
            *modified,
            Some(zip::DateTime::from_date_and_time(2023, 6, 15, 10, 30, 20).unwrap())
        ),
        other => panic!("expected file, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn walk_records_symlinks_as_links() {
    use zipdeploy_build::Entry;

    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "releases/v1/app.py", "v1");
    std::os::unix::fs::symlink("releases/v1", tmp.path().join("current")).unwrap();
    std::os::unix::fs::symlink("missing.txt", tmp.path().join("dangling")).unwrap();
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();
    let scratch = TempDir::new().unwrap();

    let collector = SourceCollector::new(tmp.path(), &vcs, &ignore, false);
    let archive = collector.collect(scratch.path()).unwrap();

    assert_eq!(
        archive.get("current"),
        Some(&Entry::Symlink {
            target: "releases/v1".to_owned()
        })
    );
    assert_eq!(
        archive.get("dangling"),
        Some(&Entry::Symlink {
            target: "missing.txt".to_owned()
        })
    );
    assert!(!archive.contains("current/app.py"));
    assert!(collector.source_tree().unwrap().contains("current"));
}

#[test]
fn walk_source_tree_lists_files_only() {
    let tmp = TempDir::new().unwrap();
    sample_project(tmp.path());
    write(tmp.path(), ".ebignore", "logs/\n");
    let vcs = no_vcs();
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let tree = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .source_tree()
        .unwrap();

    assert_eq!(tree.paths(), &[".ebignore", "app.py", "src/lib.py"]);
    assert!(tree.contains("app.py"));
    assert!(!tree.contains("logs/debug.log"));
}

// ── Snapshot mode ──

#[test]
fn snapshot_exports_head_into_scratch() {
    let tmp = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let scratch_dir = scratch.path().to_path_buf();

    let mut vcs = repo_vcs();
    vcs.expect_write_intermediate_tree().never();
    vcs.expect_export_snapshot()
        .withf(move |treeish, dest| treeish == "HEAD" && dest.starts_with(&scratch_dir))
        .times(1)
        .returning(|_, dest| {
            write_zip(
                dest,
                &[("app.py", "print('hi')"), ("src/", ""), ("src/lib.py", "X = 1")],
            );
            Ok(())
        });
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .collect(scratch.path())
        .unwrap();

    assert_eq!(
        archive.paths().collect::<Vec<_>>(),
        vec!["app.py", "src", "src/lib.py"]
    );
    assert!(archive.get("src").unwrap().is_dir());
    assert_eq!(text(&archive, "app.py"), "print('hi')");
}

#[test]
fn staged_snapshot_exports_intermediate_tree() {
    let tmp = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();

    let mut vcs = repo_vcs();
    vcs.expect_write_intermediate_tree()
        .times(1)
        .returning(|| Ok("4b825dc6".to_owned()));
    vcs.expect_export_snapshot()
        .withf(|treeish, _| treeish == "4b825dc6")
        .times(1)
        .returning(|_, dest| {
            write_zip(dest, &[("staged.txt", "new")]);
            Ok(())
        });
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let archive = SourceCollector::new(tmp.path(), &vcs, &ignore, true)
        .collect(scratch.path())
        .unwrap();

    assert_eq!(text(&archive, "staged.txt"), "new");
}

#[test]
fn snapshot_export_failure_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();

    let mut vcs = repo_vcs();
    vcs.expect_export_snapshot().returning(|_, _| Err(git_failed()));
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let result =
        SourceCollector::new(tmp.path(), &vcs, &ignore, false).collect(scratch.path());

    assert!(matches!(result, Err(CollectError::Git { .. })));
}

#[test]
fn snapshot_source_tree_uses_tracked_paths() {
    let tmp = TempDir::new().unwrap();

    let mut vcs = repo_vcs();
    vcs.expect_list_tracked_paths()
        .withf(|treeish| treeish == "HEAD")
        .times(1)
        .returning(|_| Ok(vec!["src/lib.py".to_owned(), "app.py".to_owned()]));
    let ignore = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    let tree = SourceCollector::new(tmp.path(), &vcs, &ignore, false)
        .source_tree()
        .unwrap();

    assert_eq!(tree.paths(), &["app.py", "src/lib.py"]);
}
