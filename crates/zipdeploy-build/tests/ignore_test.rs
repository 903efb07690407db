mod common;

use common::write;
use proptest::prelude::*;
use tempfile::TempDir;
use zipdeploy_build::IgnoreSpec;

#[test]
fn load_reads_configured_ignore_file() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "deploy/prod.ignore", "*.log\n!important.log\n");

    let spec = IgnoreSpec::load(tmp.path(), "deploy/prod.ignore").unwrap();

    assert!(spec.is_custom());
    assert_eq!(spec.source(), Some(tmp.path().join("deploy/prod.ignore").as_path()));
    assert!(spec.matches("logs/debug.log", false));
    assert!(!spec.matches("logs/important.log", false));
    assert!(spec.matches(".git", true));
}

#[test]
fn ignore_file_directory_is_treated_as_missing() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join(".ebignore")).unwrap();

    let spec = IgnoreSpec::load(tmp.path(), ".ebignore").unwrap();

    assert!(!spec.is_custom());
}

// ── Properties ──

fn pattern() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "*.log", "!keep.log", "build/", "/root.txt", "docs/**/*.md", "!docs/", "a?c", "# note", "",
    ])
    .prop_map(str::to_owned)
}

fn rel_path() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["build", "docs", "keep.log", "x.log", "abc", "root.txt", "a.md"]),
        1..4,
    )
    .prop_map(|parts| parts.join("/"))
}

proptest! {
    #[test]
    fn matching_is_pure(
        lines in prop::collection::vec(pattern(), 0..6),
        path in rel_path(),
        is_dir in any::<bool>(),
    ) {
        let spec = IgnoreSpec::from_lines(&lines);
        let first = spec.matches(&path, is_dir);

        prop_assert_eq!(spec.matches(&path, is_dir), first);
        prop_assert_eq!(IgnoreSpec::from_lines(&lines).matches(&path, is_dir), first);
    }

    #[test]
    fn git_metadata_always_excluded(lines in prop::collection::vec(pattern(), 0..6)) {
        let spec = IgnoreSpec::from_lines(&lines);

        prop_assert!(spec.matches(".git", true));
        prop_assert!(spec.matches(".git/objects/ab", false));
    }
}
