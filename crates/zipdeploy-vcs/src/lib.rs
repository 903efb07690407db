pub mod client;
pub mod executor;
pub mod git;

pub use client::{GitClient, Vcs};
pub use executor::{GitExecutor, RealExecutor};
pub use git::GitError;
