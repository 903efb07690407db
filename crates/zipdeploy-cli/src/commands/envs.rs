use std::path::PathBuf;
use zipdeploy_core::DeployConfig;

pub fn envs() -> anyhow::Result<()> {
    let config = DeployConfig::load(&PathBuf::from("."))?;
    let names = config.environment_names();

    if names.is_empty() {
        println!("No environments configured in zipdeploy.toml; any name uses the defaults.");
        return Ok(());
    }

    for name in names {
        println!("{name}");
    }
    Ok(())
}
