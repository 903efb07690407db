use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use zipdeploy_vcs::Vcs;

/// Leading component of every archive label.
pub const LABEL_PREFIX: &str = "app";

/// Upper bound on the deploy message, in characters.
pub const MESSAGE_MAX_CHARS: usize = 191;

/// Finished archive plus the metadata the deploy step needs.
#[derive(Debug)]
pub struct ArchiveResult {
    /// `app_<env>_<version>_<YYYYMMDD>_<HHMMSS>`
    pub label: String,
    pub file: NamedTempFile,
    pub message: String,
}

/// Derives version label and deploy message, from git when available.
pub struct ResultAssembler<'a> {
    vcs: &'a dyn Vcs,
    is_repository: bool,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        Self {
            vcs,
            is_repository: vcs.is_repository(),
        }
    }

    /// Short revision, or 8 random hex characters outside a repository.
    pub fn version_label(&self) -> String {
        if self.is_repository {
            match self.vcs.short_revision() {
                Ok(rev) => return rev,
                Err(e) => tracing::debug!(error = %e, "no revision, generating version label"),
            }
        }
        random_version()
    }

    /// Latest commit subject, or a dated placeholder.
    pub fn message(&self, now: NaiveDateTime) -> String {
        if self.is_repository {
            match self.vcs.last_log_subject() {
                Ok(line) => {
                    let subject = strip_revision(&line);
                    if !subject.is_empty() {
                        return subject;
                    }
                }
                Err(e) => tracing::debug!(error = %e, "no commit log, generating message"),
            }
        }
        format!("Deploy {}", now.format("%Y/%m/%d %H:%M"))
    }

    pub fn assemble(
        &self,
        env_name: &str,
        file: NamedTempFile,
        now: NaiveDateTime,
    ) -> ArchiveResult {
        let version = self.version_label();
        ArchiveResult {
            label: archive_label(env_name, &version, now),
            file,
            message: self.message(now),
        }
    }
}

pub fn archive_label(env_name: &str, version: &str, now: NaiveDateTime) -> String {
    format!(
        "{LABEL_PREFIX}_{env_name}_{version}_{}",
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Drops the leading revision token of a `git log --oneline` line and caps
/// the length.
fn strip_revision(line: &str) -> String {
    let subject = line.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
    subject.chars().take(MESSAGE_MAX_CHARS).collect()
}

fn random_version() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
