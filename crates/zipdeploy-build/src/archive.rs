//! In-memory zip archive with overwrite-safe mutation.
//!
//! Entries are keyed by canonical path (`/`-separated, no leading `./` or
//! `/`, no trailing `/`), so there is never more than one entry per path.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File {
        data: Vec<u8>,
        /// Unix permission bits, when known.
        mode: Option<u32>,
        /// Written as the archive time when `None`.
        modified: Option<DateTime>,
    },
    Dir,
    Symlink {
        target: String,
    },
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Dir)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Entry::Symlink { .. })
    }

    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Entry::File { data, .. } => Some(data),
            Entry::Dir | Entry::Symlink { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: BTreeMap<String, Entry>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every entry of an existing zip.
    pub fn from_zip<R: Read + Seek>(reader: R) -> Result<Self, ArchiveError> {
        let mut zip = ZipArchive::new(reader).map_err(|e| ArchiveError::ReadZip { source: e })?;
        let mut archive = Self::new();

        for index in 0..zip.len() {
            let mut file = zip
                .by_index(index)
                .map_err(|e| ArchiveError::ReadZip { source: e })?;
            let name = file.name().to_owned();
            if file.is_dir() {
                archive.mkdir(&name);
                continue;
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| ArchiveError::ReadEntry {
                    entry: name.clone(),
                    source: e,
                })?;
            if file.is_symlink() {
                let target = String::from_utf8(data).map_err(|e| ArchiveError::SymlinkTarget {
                    entry: name.clone(),
                    source: e,
                })?;
                archive.add_symlink(&name, target);
                continue;
            }
            archive.insert(
                &name,
                Entry::File {
                    data,
                    mode: file.unix_mode(),
                    modified: file.last_modified(),
                },
            );
        }

        Ok(archive)
    }

    /// Loads a zip file from disk.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = std::fs::File::open(path).map_err(|e| ArchiveError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_zip(std::io::BufReader::new(file))
    }

    /// Adds file content at `path`, replacing whatever was there.
    pub fn add(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        self.add_file(path, data, None);
    }

    /// Like [`Archive::add`], keeping Unix permission bits.
    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>, mode: Option<u32>) {
        self.insert(
            path,
            Entry::File {
                data: data.into(),
                mode,
                modified: None,
            },
        );
    }

    /// Adds a symbolic link pointing at `target`, replacing whatever was there.
    pub fn add_symlink(&mut self, path: &str, target: impl Into<String>) {
        self.insert(
            path,
            Entry::Symlink {
                target: target.into(),
            },
        );
    }

    /// Stores `entry` at `path`, replacing whatever was there. File modes
    /// keep only the permission bits.
    pub fn insert(&mut self, path: &str, entry: Entry) {
        let key = canonical_path(path);
        if key.is_empty() {
            return;
        }
        let entry = match entry {
            Entry::File {
                data,
                mode,
                modified,
            } => Entry::File {
                data,
                mode: mode.map(|m| m & 0o777),
                modified,
            },
            other => other,
        };
        if self.entries.remove(&key).is_some() {
            tracing::trace!(path = %key, "replacing existing entry");
        }
        self.entries.insert(key, entry);
    }

    /// Adds a directory marker unless an entry already exists at `path`.
    pub fn mkdir(&mut self, path: &str) {
        let key = canonical_path(path);
        if key.is_empty() {
            return;
        }
        self.entries.entry(key).or_insert(Entry::Dir);
    }

    /// Removes the entry at `path`; missing paths are a no-op.
    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        self.entries.remove(&canonical_path(path))
    }

    /// Removes the directory at `path` and everything under it.
    /// Returns the number of entries removed.
    pub fn remove_folder(&mut self, path: &str) -> usize {
        let key = canonical_path(path);
        if key.is_empty() {
            return 0;
        }
        let before = self.entries.len();
        if self.entries.get(&key).is_some_and(Entry::is_dir) {
            self.entries.remove(&key);
        }
        let prefix = format!("{key}/");
        self.entries.retain(|entry, _| !entry.starts_with(&prefix));
        before - self.entries.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&canonical_path(path))
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(&canonical_path(path))
    }

    /// Entry paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the archive as zip into `writer`.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, ArchiveError> {
        let mut zip = ZipWriter::new(writer);
        let now = zip_time(chrono::Local::now().naive_local()).unwrap_or_default();

        for (path, entry) in &self.entries {
            match entry {
                Entry::Dir => {
                    let options = SimpleFileOptions::default().last_modified_time(now);
                    zip.add_directory(path.as_str(), options)
                        .map_err(|e| ArchiveError::WriteEntry {
                            entry: path.clone(),
                            source: e,
                        })?;
                }
                Entry::Symlink { target } => {
                    let options = SimpleFileOptions::default().last_modified_time(now);
                    zip.add_symlink(path.as_str(), target.as_str(), options)
                        .map_err(|e| ArchiveError::WriteEntry {
                            entry: path.clone(),
                            source: e,
                        })?;
                }
                Entry::File {
                    data,
                    mode,
                    modified,
                } => {
                    let mut options = SimpleFileOptions::default()
                        .compression_method(CompressionMethod::Deflated)
                        .last_modified_time(modified.unwrap_or(now));
                    if let Some(mode) = mode {
                        options = options.unix_permissions(*mode);
                    }
                    zip.start_file(path.as_str(), options)
                        .map_err(|e| ArchiveError::WriteEntry {
                            entry: path.clone(),
                            source: e,
                        })?;
                    zip.write_all(data).map_err(|e| ArchiveError::WriteData {
                        entry: path.clone(),
                        source: e,
                    })?;
                }
            }
        }

        zip.finish().map_err(|e| ArchiveError::Finish { source: e })
    }

    /// Finalizes the archive into a temporary zip file.
    pub fn close(self) -> Result<NamedTempFile, ArchiveError> {
        let mut file = tempfile::Builder::new()
            .prefix("zipdeploy-")
            .suffix(".zip")
            .tempfile()
            .map_err(|e| ArchiveError::Create { source: e })?;
        self.write_to(file.as_file_mut())?;
        file.as_file_mut()
            .flush()
            .map_err(|e| ArchiveError::Create { source: e })?;
        Ok(file)
    }
}

/// Normalizes a path to the form used as archive key.
pub fn canonical_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_matches('/').to_owned()
}

/// Zip timestamp for `time`; `None` outside the representable 1980..=2107 range.
pub fn zip_time(time: NaiveDateTime) -> Option<DateTime> {
    match DateTime::try_from(time) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::debug!(%time, error = %e, "timestamp not representable in zip");
            None
        }
    }
}

/// Canonical `/`-separated form of a relative filesystem path.
pub fn path_key(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    canonical_path(&parts.join("/"))
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open zip archive {path}")]
    Open {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read zip archive")]
    ReadZip { source: ZipError },
    #[error("failed to read archive entry {entry}")]
    ReadEntry {
        entry: String,
        source: std::io::Error,
    },
    #[error("symlink entry {entry} has a non-UTF-8 target")]
    SymlinkTarget {
        entry: String,
        source: std::string::FromUtf8Error,
    },
    #[error("failed to create archive file")]
    Create { source: std::io::Error },
    #[error("failed to add archive entry {entry}")]
    WriteEntry { entry: String, source: ZipError },
    #[error("failed to write archive entry {entry}")]
    WriteData {
        entry: String,
        source: std::io::Error,
    },
    #[error("failed to finalize zip archive")]
    Finish { source: ZipError },
}
