#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git executable not found; install git or package without version control")]
    NotFound { source: std::io::Error },

    #[error("git command failed: {args:?}\n{stderr}")]
    CommandFailed { args: Vec<String>, stderr: String },

    #[error("git output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("git returned no output for {args:?}")]
    EmptyOutput { args: Vec<String> },
}
