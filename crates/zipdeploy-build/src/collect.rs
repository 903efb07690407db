use crate::archive::{Archive, ArchiveError, Entry, path_key, zip_time};
use crate::ignore::{IgnoreSpec, VCS_METADATA_DIR};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zipdeploy_vcs::{GitError, Vcs};

/// Tree-ish exported when packaging the last commit.
const HEAD: &str = "HEAD";

/// Scratch file the snapshot export is written to.
const SNAPSHOT_FILE: &str = "snapshot.zip";

/// How the initial archive contents are gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectStrategy {
    /// Walk the filesystem and filter through the ignore spec.
    Walk,
    /// Export the exact git tree of `HEAD`, or of the staged index.
    Snapshot { staged: bool },
}

impl CollectStrategy {
    /// Walk when there is no repository or when a custom ignore file
    /// takes over filtering; otherwise trust git's tree.
    pub fn choose(is_repository: bool, custom_ignore: bool, staged: bool) -> Self {
        if !is_repository || custom_ignore {
            Self::Walk
        } else {
            Self::Snapshot { staged }
        }
    }
}

/// Relative file paths selected for packaging, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    paths: Vec<String>,
}

impl SourceTree {
    fn new(mut paths: Vec<String>) -> Self {
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.binary_search_by(|p| p.as_str().cmp(path)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    File,
    Dir,
    Symlink,
}

/// A non-ignored filesystem entry found by the walk.
struct WalkItem {
    key: String,
    path: PathBuf,
    kind: ItemKind,
}

/// Gathers project files into an [`Archive`].
pub struct SourceCollector<'a> {
    project_dir: &'a Path,
    vcs: &'a dyn Vcs,
    ignore: &'a IgnoreSpec,
    strategy: CollectStrategy,
}

impl<'a> SourceCollector<'a> {
    pub fn new(
        project_dir: &'a Path,
        vcs: &'a dyn Vcs,
        ignore: &'a IgnoreSpec,
        staged: bool,
    ) -> Self {
        let strategy = CollectStrategy::choose(vcs.is_repository(), ignore.is_custom(), staged);
        tracing::debug!(?strategy, "selected collection strategy");
        Self {
            project_dir,
            vcs,
            ignore,
            strategy,
        }
    }

    pub fn strategy(&self) -> CollectStrategy {
        self.strategy
    }

    /// Builds the initial archive. `scratch` receives intermediate files.
    pub fn collect(&self, scratch: &Path) -> Result<Archive, CollectError> {
        match self.strategy {
            CollectStrategy::Walk => self.walk_archive(),
            CollectStrategy::Snapshot { staged } => {
                let treeish = self.treeish(staged)?;
                self.snapshot_archive(&treeish, scratch)
            }
        }
    }

    /// Lists the files that [`SourceCollector::collect`] would package.
    pub fn source_tree(&self) -> Result<SourceTree, CollectError> {
        let paths = match self.strategy {
            CollectStrategy::Walk => self
                .walk()?
                .into_iter()
                .filter(|item| item.kind != ItemKind::Dir)
                .map(|item| item.key)
                .collect(),
            CollectStrategy::Snapshot { staged } => {
                let treeish = self.treeish(staged)?;
                self.vcs
                    .list_tracked_paths(&treeish)
                    .map_err(|e| CollectError::Git {
                        detail: format!("failed to list tracked files of {treeish}"),
                        source: e,
                    })?
            }
        };
        Ok(SourceTree::new(paths))
    }

    fn treeish(&self, staged: bool) -> Result<String, CollectError> {
        if !staged {
            return Ok(HEAD.to_owned());
        }
        let tree = self
            .vcs
            .write_intermediate_tree()
            .map_err(|e| CollectError::Git {
                detail: "failed to write staged tree".to_owned(),
                source: e,
            })?;
        tracing::debug!(%tree, "packaging staged tree");
        Ok(tree)
    }

    fn snapshot_archive(&self, treeish: &str, scratch: &Path) -> Result<Archive, CollectError> {
        let dest = scratch.join(SNAPSHOT_FILE);
        self.vcs
            .export_snapshot(treeish, &dest)
            .map_err(|e| CollectError::Git {
                detail: format!("failed to export {treeish}"),
                source: e,
            })?;
        let archive = Archive::open(&dest)?;
        tracing::info!(%treeish, entries = archive.len(), "collected git snapshot");
        Ok(archive)
    }

    fn walk_archive(&self) -> Result<Archive, CollectError> {
        let mut archive = Archive::new();

        for item in self.walk()? {
            if item.kind == ItemKind::Dir {
                archive.mkdir(&item.key);
                continue;
            }
            // Parents may be ignored while this entry was re-included.
            for (idx, _) in item.key.match_indices('/') {
                archive.mkdir(&item.key[..idx]);
            }
            if item.kind == ItemKind::Symlink {
                let target = std::fs::read_link(&item.path).map_err(|e| CollectError::ReadFile {
                    path: item.path.clone(),
                    source: e,
                })?;
                archive.add_symlink(&item.key, target.to_string_lossy());
                continue;
            }
            let data = std::fs::read(&item.path).map_err(|e| CollectError::ReadFile {
                path: item.path.clone(),
                source: e,
            })?;
            let (mode, modified) = file_meta(&item.path);
            archive.insert(
                &item.key,
                Entry::File {
                    data,
                    mode,
                    modified,
                },
            );
        }

        tracing::info!(entries = archive.len(), "collected project files");
        Ok(archive)
    }

    fn walk(&self) -> Result<Vec<WalkItem>, CollectError> {
        let mut items = Vec::new();

        for entry in WalkDir::new(self.project_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            // Nothing under .git can be re-included, so skip descending into it.
            .filter_entry(|e| e.file_name() != VCS_METADATA_DIR)
        {
            let entry = entry.map_err(|e| CollectError::Walk { source: e })?;
            let relative = entry.path().strip_prefix(self.project_dir).map_err(|e| {
                CollectError::OutsideRoot {
                    path: entry.path().to_path_buf(),
                    detail: e.to_string(),
                }
            })?;
            let key = path_key(relative);
            // Links are kept as links, never followed, like git stores them.
            let file_type = entry.file_type();
            let kind = if file_type.is_symlink() {
                ItemKind::Symlink
            } else if file_type.is_dir() {
                ItemKind::Dir
            } else {
                ItemKind::File
            };
            if self.ignore.matches(&key, kind == ItemKind::Dir) {
                continue;
            }
            items.push(WalkItem {
                key,
                path: entry.path().to_path_buf(),
                kind,
            });
        }

        Ok(items)
    }
}

/// Permission bits and modification time, when the platform provides them.
fn file_meta(path: &Path) -> (Option<u32>, Option<zip::DateTime>) {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "metadata unavailable");
            return (None, None);
        }
    };
    let modified = match meta.modified() {
        Ok(time) => zip_time(chrono::DateTime::<chrono::Local>::from(time).naive_local()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "modification time unavailable");
            None
        }
    };
    (file_mode(&meta), modified)
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> Option<u32> {
    None
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("failed to walk project directory")]
    Walk { source: walkdir::Error },
    #[error("path {path} is outside the project directory: {detail}")]
    OutsideRoot { path: PathBuf, detail: String },
    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("git failed: {detail}")]
    Git { detail: String, source: GitError },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
