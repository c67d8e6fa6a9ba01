//! Collection and rendering of `bestanden.txt`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::domain::{CaseId, LocalPath};
use crate::error::MirrorError;
use crate::model::{DatePart, join_dates};

/// One mirrored file that is present and verified on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: LocalPath,
    pub upload_dates: Vec<DatePart>,
    pub description: Option<String>,
}

impl ManifestEntry {
    pub fn line(&self) -> String {
        format!(
            "{} ({}): {}",
            self.path,
            join_dates(&self.upload_dates, "/"),
            self.description.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Default)]
struct Collected {
    claimed: HashSet<LocalPath>,
    entries: Vec<ManifestEntry>,
}

/// Shared sink for manifest entries, handed to every download task.
#[derive(Debug, Clone, Default)]
pub struct ManifestCollector {
    inner: Arc<Mutex<Collected>>,
}

impl ManifestCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `path` for one remote file of this run.
    pub fn claim(&self, path: &LocalPath) -> Result<(), MirrorError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.claimed.insert(path.clone()) {
            return Err(MirrorError::PathCollision(path.to_string()));
        }
        Ok(())
    }

    pub fn append(&self, entry: ManifestEntry) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .push(entry);
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries ordered by their rendered path.
    pub fn sorted_entries(&self) -> Vec<ManifestEntry> {
        let mut entries = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone();
        entries.sort_by_cached_key(|entry| entry.path.to_string());
        entries
    }
}

pub fn attribution(case: &CaseId, generated_at: DateTime<Utc>) -> String {
    format!(
        "automatisch gegenereerd met {} {} voor {} op {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        case,
        generated_at.to_rfc3339()
    )
}

pub fn render(
    case: &CaseId,
    project_name: &str,
    generated_at: DateTime<Utc>,
    entries: &[ManifestEntry],
) -> String {
    let mut out = format!("# {case}: {project_name}\n");
    out.push_str(&format!("## {}\n\n## Bestanden:\n", attribution(case, generated_at)));
    let lines = entries.iter().map(ManifestEntry::line).collect::<Vec<_>>();
    out.push_str(&lines.join("\n"));
    out
}
