use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Config file looked up at the project root.
pub const CONFIG_FILE: &str = "zipdeploy.toml";

/// Folder inside the archive that every extension config ends up in.
pub const CANONICAL_EXTENSIONS_DIR: &str = ".ebextensions";

/// Name the deployment descriptor always has at the archive root.
pub const CANONICAL_DESCRIPTOR: &str = "Dockerrun.aws.json";

/// zipdeploy.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub environments: BTreeMap<String, EnvSettings>,
}

/// Per-environment settings as written in zipdeploy.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvSettings {
    /// Source folders whose `*.config*` files are consolidated into `.ebextensions`
    #[serde(default = "default_extension_folders")]
    pub extension_folders: Vec<String>,
    /// Descriptor source file (defaults to Dockerrun.aws.json)
    #[serde(default)]
    pub descriptor: Option<String>,
    /// Ignore file; when present it forces filesystem-walk packaging
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,
    /// Variables exposed to templates as `vars.*`
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

/// Resolved configuration for one named environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub name: String,
    pub extension_folders: Vec<String>,
    pub descriptor: Option<String>,
    pub ignore_file: String,
    pub vars: BTreeMap<String, String>,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            extension_folders: default_extension_folders(),
            descriptor: None,
            ignore_file: default_ignore_file(),
            vars: BTreeMap::new(),
        }
    }
}

impl EnvConfig {
    /// Default settings under the given environment name.
    pub fn named(name: &str) -> crate::Result<Self> {
        Ok(EnvSettings::default().into_env(validate_env_name(name)?))
    }

    /// Source path of the descriptor, falling back to the canonical name.
    pub fn descriptor_source(&self) -> &str {
        self.descriptor.as_deref().unwrap_or(CANONICAL_DESCRIPTOR)
    }
}

impl EnvSettings {
    fn into_env(self, name: &str) -> EnvConfig {
        EnvConfig {
            name: name.to_owned(),
            extension_folders: self.extension_folders,
            descriptor: self.descriptor,
            ignore_file: self.ignore_file,
            vars: self.vars,
        }
    }
}

impl DeployConfig {
    /// Load from zipdeploy.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            let config: Self =
                toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                    path: config_path.clone(),
                    source: e,
                })?;
            tracing::debug!(
                path = %config_path.display(),
                environments = config.environments.len(),
                "loaded config"
            );
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve a named environment.
    ///
    /// When no environments are configured at all, every name resolves to the
    /// defaults. Once any environment is declared, unknown names are rejected.
    pub fn environment(&self, name: &str) -> crate::Result<EnvConfig> {
        let name = validate_env_name(name)?;
        if self.environments.is_empty() {
            return Ok(EnvSettings::default().into_env(name));
        }
        match self.environments.get(name) {
            Some(settings) => Ok(settings.clone().into_env(name)),
            None => Err(crate::Error::UnknownEnvironment {
                name: name.to_owned(),
                available: self.environment_names(),
            }),
        }
    }

    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }
}

/// Environment names end up inside archive labels, so keep them to a
/// filename-safe alphabet.
fn validate_env_name(name: &str) -> crate::Result<&str> {
    if name.is_empty() {
        return Err(crate::Error::InvalidEnvironmentName {
            name: name.to_owned(),
            reason: "must not be empty",
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(crate::Error::InvalidEnvironmentName {
            name: name.to_owned(),
            reason: "only ASCII letters, digits, '-', '_' and '.' are allowed",
        });
    }
    Ok(name)
}

fn default_extension_folders() -> Vec<String> {
    vec![CANONICAL_EXTENSIONS_DIR.to_owned()]
}

fn default_ignore_file() -> String {
    ".ebignore".to_owned()
}
