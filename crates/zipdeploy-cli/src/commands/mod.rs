mod envs;
mod ls;
mod pack;

pub use envs::envs;
pub use ls::ls;
pub use pack::pack;

use anyhow::Context;
use std::path::Path;
use zipdeploy_core::{DeployConfig, EnvConfig};

/// Resolves `name` against `zipdeploy.toml` in `project_dir`.
pub(crate) fn load_environment(project_dir: &Path, name: &str) -> anyhow::Result<EnvConfig> {
    let config = DeployConfig::load(project_dir)?;
    config
        .environment(name)
        .with_context(|| format!("cannot package environment '{name}'"))
}
