#![allow(dead_code)]

use mockall::mock;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;
use zipdeploy_build::Archive;
use zipdeploy_vcs::{GitError, Vcs};

mock! {
    pub Repo {}

    impl Vcs for Repo {
        fn is_repository(&self) -> bool;
        fn list_tracked_paths(&self, treeish: &str) -> Result<Vec<String>, GitError>;
        fn write_intermediate_tree(&self) -> Result<String, GitError>;
        fn short_revision(&self) -> Result<String, GitError>;
        fn last_log_subject(&self) -> Result<String, GitError>;
        fn export_snapshot(&self, treeish: &str, dest: &Path) -> Result<(), GitError>;
    }
}

pub fn git_failed() -> GitError {
    GitError::CommandFailed {
        args: vec![],
        stderr: "fatal: not a git repository".to_owned(),
    }
}

/// A VCS that reports no repository; every other call fails.
pub fn no_vcs() -> MockRepo {
    let mut vcs = MockRepo::new();
    vcs.expect_is_repository().return_const(false);
    vcs.expect_short_revision().returning(|| Err(git_failed()));
    vcs.expect_last_log_subject().returning(|| Err(git_failed()));
    vcs
}

/// Writes `files` as a zip to `dest`, the way `git archive` would.
pub fn write_zip(dest: &Path, files: &[(&str, &str)]) {
    let file = std::fs::File::create(dest).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, content) in files {
        if let Some(dir) = name.strip_suffix('/') {
            zip.add_directory(dir, SimpleFileOptions::default()).unwrap();
            continue;
        }
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn text(archive: &Archive, path: &str) -> String {
    let data = archive
        .get(path)
        .and_then(|e| e.data())
        .unwrap_or_else(|| panic!("no file entry at {path}"));
    String::from_utf8(data.to_vec()).unwrap()
}

pub fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
        .status;
    assert!(status.success(), "git {args:?} failed");
}

/// Initialize a git repo and commit everything currently in `dir`.
pub fn init_git_project(dir: &Path) {
    git(dir, &["init"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", "Initial deploy setup"]);
}
