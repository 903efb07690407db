use std::path::PathBuf;
use zipdeploy_build::{CollectStrategy, PackageRequest, TemplateContext};
use zipdeploy_vcs::{GitClient, Vcs};

pub fn ls(env_name: &str, staged: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let env = super::load_environment(&project_dir, env_name)?;
    let context = TemplateContext::new(&env);
    let request = PackageRequest::new(&project_dir, &env, &context).staged(staged);
    let vcs = GitClient::new(&project_dir);

    let (strategy, tree) = zipdeploy_build::list_sources(&request, &vcs)?;

    let label = match strategy {
        CollectStrategy::Walk if vcs.is_repository() => {
            format!("walk ({} present)", env.ignore_file)
        }
        CollectStrategy::Walk => "walk (not a git repository)".to_owned(),
        CollectStrategy::Snapshot { staged: false } => "git snapshot (HEAD)".to_owned(),
        CollectStrategy::Snapshot { staged: true } => "git snapshot (staged)".to_owned(),
    };
    println!("Strategy: {label}");
    for path in tree.paths() {
        println!("  {path}");
    }
    println!("{} files", tree.len());
    Ok(())
}
