use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MirrorError {
    #[error("invalid OMV case number: {0}")]
    #[diagnostic(help("expected 10 digits, optionally prefixed with OMV_"))]
    InvalidCaseId(String),

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("unimplemented node: {0}")]
    UnimplementedNode(String),

    #[error("two remote files resolve to the same local path: {0}")]
    PathCollision(String),

    #[error("invalid content hash for {path}: {message}")]
    InvalidHash { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
