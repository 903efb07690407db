use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(
        "environment '{name}' is not defined in zipdeploy.toml; available: {}",
        format_names(available)
    )]
    UnknownEnvironment {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid environment name {name:?}: {reason}")]
    InvalidEnvironmentName { name: String, reason: &'static str },
}

fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_owned()
    } else {
        names.join(", ")
    }
}
