use crate::git::GitError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Abstraction over git CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
/// Calls block until git exits; there is no timeout.
pub trait GitExecutor {
    /// Execute a git command in the working directory and capture stdout.
    fn exec(&self, args: &[String]) -> Result<String, GitError>;
}

/// Real git CLI executor bound to one working directory.
pub struct RealExecutor {
    work_dir: PathBuf,
}

impl RealExecutor {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
        }
    }
}

impl GitExecutor for RealExecutor {
    fn exec(&self, args: &[String]) -> Result<String, GitError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| GitError::NotFound { source: e })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| GitError::InvalidUtf8 { source: e })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            Err(GitError::CommandFailed {
                args: args.to_vec(),
                stderr,
            })
        }
    }
}
