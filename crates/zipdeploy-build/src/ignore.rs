//! Gitignore-style path filtering for walk-mode collection.
//!
//! Patterns are evaluated in file order and the last match decides, so a
//! later `!pattern` re-includes what an earlier pattern excluded. The
//! version-control metadata directory is appended after user patterns and
//! therefore cannot be re-included.

use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};

/// Always excluded, after every user pattern.
pub const VCS_METADATA_DIR: &str = ".git";

/// One compiled line of an ignore file.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    pattern: String,
    negated: bool,
    dir_only: bool,
    matcher: GlobMatcher,
}

impl IgnorePattern {
    /// Parses one ignore-file line. Blank lines, comments and patterns that
    /// do not compile yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (negated, mut body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        if body.starts_with("\\#") || body.starts_with("\\!") {
            body = &body[1..];
        }

        let dir_only = body.ends_with('/');
        let body = body.trim_end_matches('/');
        // A slash anywhere but the end anchors the pattern to the root.
        let anchored = body.contains('/');
        let body = body.trim_start_matches('/');
        if body.is_empty() {
            return None;
        }

        let glob = if anchored {
            body.to_owned()
        } else {
            format!("**/{body}")
        };
        let matcher = match GlobBuilder::new(&glob)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
        {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                tracing::warn!(pattern = line, error = %e, "skipping invalid ignore pattern");
                return None;
            }
        };

        Some(Self {
            pattern: line.to_owned(),
            negated,
            dir_only,
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether this pattern applies to `path` itself or to any directory
    /// containing it.
    fn applies_to(&self, path: &str, is_dir: bool) -> bool {
        if (is_dir || !self.dir_only) && self.matcher.is_match(path) {
            return true;
        }
        path.match_indices('/')
            .map(|(idx, _)| &path[..idx])
            .any(|dir| self.matcher.is_match(dir))
    }
}

/// Ordered ignore patterns for one build.
#[derive(Debug, Clone)]
pub struct IgnoreSpec {
    patterns: Vec<IgnorePattern>,
    source: Option<PathBuf>,
}

impl IgnoreSpec {
    /// Loads `ignore_file` (relative to `project_dir`) if it exists,
    /// otherwise starts from an empty pattern list.
    pub fn load(project_dir: &Path, ignore_file: &str) -> Result<Self, IgnoreError> {
        let path = project_dir.join(ignore_file);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no ignore file");
            return Ok(Self::from_lines(std::iter::empty::<&str>()));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| IgnoreError::Read {
            path: path.clone(),
            source: e,
        })?;
        let mut spec = Self::from_lines(content.lines());
        tracing::debug!(
            path = %path.display(),
            patterns = spec.patterns.len() - 1,
            "loaded ignore file"
        );
        spec.source = Some(path);
        Ok(spec)
    }

    /// Builds a spec from ignore-file lines, appending the `.git` exclusion.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<IgnorePattern> = lines
            .into_iter()
            .filter_map(|line| IgnorePattern::parse(line.as_ref()))
            .collect();
        patterns.extend(IgnorePattern::parse(VCS_METADATA_DIR));
        Self {
            patterns,
            source: None,
        }
    }

    /// Whether the patterns came from an ignore file on disk.
    pub fn is_custom(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    /// Whether `path` (relative, `/`-separated) is excluded.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        self.patterns
            .iter()
            .rev()
            .find(|pattern| pattern.applies_to(path, is_dir))
            .is_some_and(|pattern| !pattern.negated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    #[error("failed to read ignore file {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
