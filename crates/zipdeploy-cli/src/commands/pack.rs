use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use zipdeploy_build::{PackageRequest, TemplateContext};
use zipdeploy_vcs::GitClient;

/// `--json` envelope.
#[derive(Debug, Serialize)]
struct PackOutput<'a> {
    env: &'a str,
    label: &'a str,
    message: &'a str,
    path: &'a Path,
}

pub fn pack(env_name: &str, staged: bool, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    load_dotenv(&project_dir)?;

    let env = super::load_environment(&project_dir, env_name)?;
    let context = TemplateContext::from_process_env(&env);
    let request = PackageRequest::new(&project_dir, &env, &context).staged(staged);
    let vcs = GitClient::new(&project_dir);

    let result = zipdeploy_build::package(&request, &vcs)
        .with_context(|| format!("failed to package environment '{}'", env.name))?;

    let dest = output.unwrap_or_else(|| std::env::temp_dir().join(format!("{}.zip", result.label)));
    // Destination may be on another filesystem; no rename.
    std::fs::copy(result.file.path(), &dest)
        .with_context(|| format!("failed to write archive to {}", dest.display()))?;

    if json {
        let out = PackOutput {
            env: &env.name,
            label: &result.label,
            message: &result.message,
            path: &dest,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Label:   {}", result.label);
        println!("Message: {}", result.message);
        println!("Archive: {}", dest.display());
    }
    Ok(())
}

/// Loads `.env` from the project dir so templates can read it via `environ`.
fn load_dotenv(project_dir: &Path) -> anyhow::Result<()> {
    let path = project_dir.join(".env");
    if !path.is_file() {
        return Ok(());
    }
    dotenvy::from_path(&path).with_context(|| format!("failed to load {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded .env");
    Ok(())
}
