use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::{CaseId, LocalPath};
use crate::error::MirrorError;

pub const MANIFEST_FILE: &str = "bestanden.txt";
pub const REPORT_FILE: &str = "inhoud.html";

/// Layout of the mirror on disk: `<root>/<case id>/...`.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn case_dir(&self, case: &CaseId) -> Utf8PathBuf {
        self.root.join(case.as_str())
    }

    pub fn resolve(&self, path: &LocalPath) -> Utf8PathBuf {
        self.root.join(path.to_relative())
    }

    pub fn manifest_path(&self, case: &CaseId) -> Utf8PathBuf {
        self.case_dir(case).join(MANIFEST_FILE)
    }

    pub fn report_path(&self, case: &CaseId) -> Utf8PathBuf {
        self.case_dir(case).join(REPORT_FILE)
    }

    /// Replaces `path` in one step so readers never see a half-written file.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), MirrorError> {
        let parent = path
            .parent()
            .ok_or_else(|| MirrorError::Filesystem(format!("invalid destination path {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MirrorError::Filesystem(err.to_string()))?;
        let mut builder = Builder::new();
        builder.prefix(".omv-mirror");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Masked by the process umask on creation, like `File::create`.
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut temp = builder
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MirrorError::Filesystem(err.to_string()))?;
        std::io::Write::write_all(&mut temp, content)
            .map_err(|err| MirrorError::Filesystem(format!("write {path}: {err}")))?;
        temp.persist(path.as_std_path())
            .map_err(|err| MirrorError::Filesystem(format!("persist {path}: {}", err.error)))?;
        Ok(())
    }
}
