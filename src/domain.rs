use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

const CASE_PREFIX: &str = "OMV_";

/// Normalized case number, always `OMV_` followed by ten digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(String);

impl CaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CaseId {
    type Err = MirrorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^(OMV_)?([0-9]{10})$")
            .map_err(|err| MirrorError::InvalidCaseId(err.to_string()))?;
        let digits = re
            .captures(value)
            .and_then(|caps| caps.get(2))
            .ok_or_else(|| MirrorError::InvalidCaseId(value.to_string()))?;
        Ok(Self(format!("{CASE_PREFIX}{}", digits.as_str())))
    }
}

/// Location of a mirrored file relative to the output directory.
///
/// The first segment is always the case id; the rest is derived from the
/// ancestor chain of the record that lists the file, so two visits of the
/// same chain always produce the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalPath(Vec<String>);

impl LocalPath {
    pub fn root(case: &CaseId) -> Self {
        Self(vec![case.as_str().to_string()])
    }

    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(sanitize_segment(segment));
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn file_name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn to_relative(&self) -> Utf8PathBuf {
        self.0.iter().collect()
    }

    /// Path relative to the case directory, as linked from the report.
    pub fn within_case(&self) -> String {
        self.0.iter().skip(1).cloned().collect::<Vec<_>>().join("/")
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Remote codes and names may contain separators; they must never escape
/// their parent directory.
pub fn sanitize_segment(raw: &str) -> String {
    match raw {
        "" | "." | ".." => "_".to_string(),
        other => other.replace(['/', '\\'], "_"),
    }
}
