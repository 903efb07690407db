//! Consolidates extension-folder configs and the deployment descriptor into
//! their canonical archive locations.
//!
//! ```text
//! <folder>/app.config            → .ebextensions/app.config      (as-is)
//! <folder>/db.config.tpl         → .ebextensions/db.config       (rendered, YAML)
//! <descriptor source>            → Dockerrun.aws.json            (rendered, JSON)
//! ```

use crate::archive::{Archive, canonical_path};
use crate::template::{TEMPLATE_SUFFIX, TemplateError, TemplateRenderer};
use std::path::{Path, PathBuf};
use zipdeploy_core::{CANONICAL_DESCRIPTOR, CANONICAL_EXTENSIONS_DIR, EnvConfig};

/// Marker a file name must contain to be treated as extension config.
const CONFIG_MARKER: &str = ".config";

/// What normalization wrote into the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Archive paths written under `.ebextensions`.
    pub configs: Vec<String>,
    /// Templates whose rendered document was empty.
    pub skipped: Vec<String>,
    /// Removed non-canonical extension folders.
    pub removed_folders: Vec<String>,
    /// Whether `Dockerrun.aws.json` was written.
    pub descriptor: bool,
}

pub struct ConfigNormalizer<'a> {
    project_dir: &'a Path,
    env: &'a EnvConfig,
    renderer: &'a TemplateRenderer,
}

impl<'a> ConfigNormalizer<'a> {
    pub fn new(
        project_dir: &'a Path,
        env: &'a EnvConfig,
        renderer: &'a TemplateRenderer,
    ) -> Self {
        Self {
            project_dir,
            env,
            renderer,
        }
    }

    pub fn normalize(&self, archive: &mut Archive) -> Result<NormalizeReport, NormalizeError> {
        let mut report = NormalizeReport::default();

        for folder in &self.env.extension_folders {
            self.consolidate_folder(archive, &canonical_path(folder), &mut report)?;
        }

        for folder in &self.env.extension_folders {
            let folder = canonical_path(folder);
            if folder == CANONICAL_EXTENSIONS_DIR || folder.is_empty() {
                continue;
            }
            let removed = archive.remove_folder(&folder);
            tracing::debug!(%folder, removed, "removed staging extension folder");
            report.removed_folders.push(folder);
        }

        report.descriptor = self.normalize_descriptor(archive)?;
        Ok(report)
    }

    fn consolidate_folder(
        &self,
        archive: &mut Archive,
        folder: &str,
        report: &mut NormalizeReport,
    ) -> Result<(), NormalizeError> {
        let dir = self.project_dir.join(folder);
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "extension folder not found");
            return Ok(());
        }

        for (name, path) in config_files(&dir)? {
            let source_entry = if folder.is_empty() {
                name.clone()
            } else {
                format!("{folder}/{name}")
            };

            let (basename, content) = match name.strip_suffix(TEMPLATE_SUFFIX) {
                Some(basename) => match self.render_yaml(&source_entry, &path)? {
                    Some(content) => (basename.to_owned(), content),
                    None => {
                        tracing::info!(file = %source_entry, "rendered config is empty, skipping");
                        archive.remove(&source_entry);
                        report.skipped.push(source_entry);
                        continue;
                    }
                },
                None => (name.clone(), read(&path)?),
            };

            let target = format!("{CANONICAL_EXTENSIONS_DIR}/{basename}");
            archive.remove(&target);
            archive.remove(&source_entry);
            archive.mkdir(CANONICAL_EXTENSIONS_DIR);
            archive.add(&target, content);
            tracing::debug!(from = %source_entry, to = %target, "normalized config");
            report.configs.push(target);
        }

        Ok(())
    }

    /// Renders a YAML template and re-serializes it. `None` when the
    /// document is empty.
    fn render_yaml(&self, origin: &str, path: &Path) -> Result<Option<Vec<u8>>, NormalizeError> {
        let rendered = self.renderer.render(origin, &read_to_string(path)?)?;
        if rendered.trim().is_empty() {
            return Ok(None);
        }
        let value: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(&rendered).map_err(|e| NormalizeError::ParseYaml {
                path: path.to_path_buf(),
                source: e,
            })?;
        if value.is_null() {
            return Ok(None);
        }
        let yaml = serde_yaml_ng::to_string(&value).map_err(|e| NormalizeError::SerializeYaml {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Some(yaml.into_bytes()))
    }

    /// Writes the rendered descriptor as `Dockerrun.aws.json`, replacing both
    /// the override source entry and any default-named entry.
    fn normalize_descriptor(&self, archive: &mut Archive) -> Result<bool, NormalizeError> {
        let source = canonical_path(self.env.descriptor_source());
        let path = self.project_dir.join(&source);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no deployment descriptor");
            return Ok(false);
        }

        let rendered = self.renderer.render(&source, &read_to_string(&path)?)?;
        let value: serde_json::Value =
            serde_json::from_str(&rendered).map_err(|e| NormalizeError::ParseJson {
                path: path.clone(),
                source: e,
            })?;
        let content = serde_json::to_vec(&value).map_err(|e| NormalizeError::SerializeJson {
            path: path.clone(),
            source: e,
        })?;

        archive.remove(&source);
        archive.remove(CANONICAL_DESCRIPTOR);
        archive.add(CANONICAL_DESCRIPTOR, content);
        tracing::debug!(from = %source, "normalized deployment descriptor");
        Ok(true)
    }
}

/// Regular files directly inside `dir` whose name contains `.config`, sorted by name.
fn config_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, NormalizeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| NormalizeError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| NormalizeError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(CONFIG_MARKER) && path.is_file() {
            files.push((name, path));
        }
    }
    files.sort();
    Ok(files)
}

fn read(path: &Path) -> Result<Vec<u8>, NormalizeError> {
    std::fs::read(path).map_err(|e| NormalizeError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

fn read_to_string(path: &Path) -> Result<String, NormalizeError> {
    std::fs::read_to_string(path).map_err(|e| NormalizeError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("failed to list extension folder {path}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("rendered config {path} is not valid YAML")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
    #[error("failed to serialize config {path}")]
    SerializeYaml {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
    #[error("rendered descriptor {path} is not valid JSON")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize descriptor {path}")]
    SerializeJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}
