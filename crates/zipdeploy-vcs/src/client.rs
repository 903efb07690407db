use crate::executor::{GitExecutor, RealExecutor};
use crate::git::GitError;
use std::path::Path;

/// Version-control capabilities the packager relies on.
///
/// [`GitClient`] is the production implementation; tests substitute fakes.
pub trait Vcs {
    /// Whether the project directory is inside a working tree.
    fn is_repository(&self) -> bool;

    /// Every path tracked in `treeish`, in git's order.
    fn list_tracked_paths(&self, treeish: &str) -> Result<Vec<String>, GitError>;

    /// Write the current index as a tree object and return its id.
    fn write_intermediate_tree(&self) -> Result<String, GitError>;

    /// Short revision identifier of `HEAD`.
    fn short_revision(&self) -> Result<String, GitError>;

    /// One-line summary of the latest commit (`<rev> <subject>`).
    fn last_log_subject(&self) -> Result<String, GitError>;

    /// Export `treeish` as a zip file at `dest`.
    fn export_snapshot(&self, treeish: &str, dest: &Path) -> Result<(), GitError>;
}

/// Git operations client, parameterized over the executor for testability.
pub struct GitClient<E: GitExecutor = RealExecutor> {
    executor: E,
}

impl GitClient<RealExecutor> {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            executor: RealExecutor::new(project_dir),
        }
    }
}

impl<E: GitExecutor> GitClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    fn exec_line(&self, command: &[&str]) -> Result<String, GitError> {
        let command = args(command);
        let out = self.executor.exec(&command)?;
        match out.lines().map(str::trim).find(|line| !line.is_empty()) {
            Some(line) => Ok(line.to_owned()),
            None => Err(GitError::EmptyOutput { args: command }),
        }
    }
}

impl<E: GitExecutor> Vcs for GitClient<E> {
    fn is_repository(&self) -> bool {
        match self
            .executor
            .exec(&args(&["rev-parse", "--is-inside-work-tree"]))
        {
            Ok(out) => out.trim() == "true",
            Err(e) => {
                tracing::debug!(error = %e, "not a git working tree");
                false
            }
        }
    }

    fn list_tracked_paths(&self, treeish: &str) -> Result<Vec<String>, GitError> {
        let out = self
            .executor
            .exec(&args(&["ls-tree", "-r", "-z", "--name-only", treeish]))?;
        Ok(out
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn write_intermediate_tree(&self) -> Result<String, GitError> {
        self.exec_line(&["write-tree"])
    }

    fn short_revision(&self) -> Result<String, GitError> {
        self.exec_line(&["describe", "--always", "--abbrev=8"])
    }

    fn last_log_subject(&self) -> Result<String, GitError> {
        self.exec_line(&["log", "--oneline", "--no-decorate", "-1"])
    }

    fn export_snapshot(&self, treeish: &str, dest: &Path) -> Result<(), GitError> {
        let output = format!("--output={}", dest.display());
        self.executor
            .exec(&args(&["archive", "--format=zip", &output, treeish]))?;
        Ok(())
    }
}

fn args(a: &[&str]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}
