//! Template rendering with Tera for deployment config files.

use serde::Serialize;
use std::collections::BTreeMap;
use tera::{Context, Tera};
use zipdeploy_core::EnvConfig;

/// Suffix marking a config file as a template; stripped from the output name.
pub const TEMPLATE_SUFFIX: &str = ".tpl";

/// Values visible to templates.
///
/// ```text
/// {{ name }}            environment name
/// {{ vars.DB_HOST }}    [environments.<name>.vars] from zipdeploy.toml
/// {{ environ.HOME }}    process environment
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateContext {
    pub name: String,
    pub vars: BTreeMap<String, String>,
    pub environ: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new(env: &EnvConfig) -> Self {
        Self {
            name: env.name.clone(),
            vars: env.vars.clone(),
            environ: BTreeMap::new(),
        }
    }

    pub fn with_environ<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.environ.extend(vars);
        self
    }

    /// Context with the current process environment; non-UTF-8 variables are left out.
    pub fn from_process_env(env: &EnvConfig) -> Self {
        let environ = std::env::vars_os().filter_map(|(key, value)| {
            key.to_str()
                .zip(value.to_str())
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
        });
        Self::new(env).with_environ(environ)
    }
}

pub struct TemplateRenderer {
    context: Context,
}

impl TemplateRenderer {
    pub fn new(context: &TemplateContext) -> Result<Self, TemplateError> {
        let context =
            Context::from_serialize(context).map_err(|e| TemplateError::Context { source: e })?;
        Ok(Self { context })
    }

    /// Renders `template` to raw text. `origin` only labels errors.
    pub fn render(&self, origin: &str, template: &str) -> Result<String, TemplateError> {
        tracing::debug!(origin, "rendering template");
        Tera::one_off(template, &self.context, false).map_err(|e| TemplateError::Render {
            origin: origin.to_owned(),
            source: e,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to build template context")]
    Context { source: tera::Error },
    #[error("failed to render template {origin}")]
    Render { origin: String, source: tera::Error },
}
