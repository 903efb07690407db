//! Source collection, config normalization and zip assembly for zipdeploy.
//!
//! # Packaging pipeline
//!
//! ```text
//! zipdeploy pack <env>
//!   1. Scratch     ── tempfile::TempDir, dropped on every exit path
//!   2. Ignore spec ── .ebignore (+ implicit .git) → IgnoreSpec
//!   3. Collect     ── walk + filter, or git archive of HEAD / staged tree
//!   4. Normalize   ── extension folders → .ebextensions/, descriptor → Dockerrun.aws.json
//!   5. Close       ── Archive → zip file
//!   6. Metadata    ── app_<env>_<version>_<YYYYMMDD>_<HHMMSS> + commit message
//! ```
//!
//! # Collection strategy
//!
//! - **Walk**: the project is not a git working tree, or a custom ignore
//!   file exists. Every filesystem entry is matched against the ignore spec.
//! - **Snapshot**: otherwise. The exact tree of `HEAD` (or the staged index
//!   with `--staged`) is exported by git, so `.gitignore` applies implicitly.

pub mod archive;
pub mod collect;
pub mod ignore;
pub mod normalize;
pub mod result;
pub mod template;

pub use archive::{Archive, ArchiveError, Entry};
pub use collect::{CollectError, CollectStrategy, SourceCollector, SourceTree};
pub use ignore::{IgnoreError, IgnoreSpec};
pub use normalize::{ConfigNormalizer, NormalizeError, NormalizeReport};
pub use result::{ArchiveResult, ResultAssembler};
pub use template::{TemplateContext, TemplateError, TemplateRenderer};

use std::path::Path;
use std::time::Instant;
use zipdeploy_core::EnvConfig;
use zipdeploy_vcs::Vcs;

/// Name prefix of the per-build scratch directory.
pub const SCRATCH_PREFIX: &str = "zipdeploy-scratch-";

/// Inputs for one packaging run.
pub struct PackageRequest<'a> {
    pub project_dir: &'a Path,
    pub env: &'a EnvConfig,
    pub context: &'a TemplateContext,
    /// Snapshot the staged index instead of `HEAD`.
    pub staged: bool,
    /// Parent of the scratch directory; the system temp dir when `None`.
    pub scratch_parent: Option<&'a Path>,
}

impl<'a> PackageRequest<'a> {
    pub fn new(project_dir: &'a Path, env: &'a EnvConfig, context: &'a TemplateContext) -> Self {
        Self {
            project_dir,
            env,
            context,
            staged: false,
            scratch_parent: None,
        }
    }

    pub fn staged(mut self, staged: bool) -> Self {
        self.staged = staged;
        self
    }

    pub fn scratch_parent(mut self, dir: &'a Path) -> Self {
        self.scratch_parent = Some(dir);
        self
    }
}

/// Builds the deployable archive for one environment.
///
/// The scratch workspace lives only for the duration of this call; any
/// error aborts the build and no archive is returned.
pub fn package(request: &PackageRequest<'_>, vcs: &dyn Vcs) -> Result<ArchiveResult, PackageError> {
    let env = request.env;
    tracing::info!(env = %env.name, "Creating zip archive");
    let start = Instant::now();

    let scratch = scratch_dir(request.scratch_parent)?;
    tracing::debug!(path = %scratch.path().display(), "created scratch workspace");
    let ignore = IgnoreSpec::load(request.project_dir, &env.ignore_file)?;
    let collector = SourceCollector::new(request.project_dir, vcs, &ignore, request.staged);
    let mut archive = collector.collect(scratch.path())?;

    let renderer = TemplateRenderer::new(request.context)?;
    let report =
        ConfigNormalizer::new(request.project_dir, env, &renderer).normalize(&mut archive)?;
    tracing::debug!(
        configs = report.configs.len(),
        skipped = report.skipped.len(),
        descriptor = report.descriptor,
        "normalized deployment config"
    );

    let entries = archive.len();
    let file = archive.close()?;
    let now = chrono::Local::now().naive_local();
    let result = ResultAssembler::new(vcs).assemble(&env.name, file, now);

    tracing::info!(
        env = %env.name,
        entries,
        elapsed = ?start.elapsed(),
        "Zip was created"
    );
    Ok(result)
}

/// Lists what [`package`] would collect, without reading file contents
/// or rendering anything.
pub fn list_sources(
    request: &PackageRequest<'_>,
    vcs: &dyn Vcs,
) -> Result<(CollectStrategy, SourceTree), PackageError> {
    let ignore = IgnoreSpec::load(request.project_dir, &request.env.ignore_file)?;
    let collector = SourceCollector::new(request.project_dir, vcs, &ignore, request.staged);
    let tree = collector.source_tree()?;
    Ok((collector.strategy(), tree))
}

/// Removed when dropped, on success and on every early return.
fn scratch_dir(parent: Option<&Path>) -> Result<tempfile::TempDir, PackageError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    let dir = match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    };
    dir.map_err(|e| PackageError::Scratch { source: e })
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("failed to create scratch workspace")]
    Scratch { source: std::io::Error },
    #[error(transparent)]
    Ignore(#[from] IgnoreError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
