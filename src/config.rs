use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::app::SyncOptions;
use crate::client::DEFAULT_API_ROOT;
use crate::error::MirrorError;

pub const DEFAULT_CONFIG_FILE: &str = "omv-mirror.json";
pub const API_ROOT_ENV: &str = "OMV_API_ROOT";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub api_root: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub report: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api_root: String,
    pub output_dir: Utf8PathBuf,
    pub request_timeout: Option<Duration>,
    pub sync: SyncOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `omv-mirror.json` in the working directory when it
    /// exists. Without either, defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MirrorError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| MirrorError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| MirrorError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(api_root) = std::env::var(API_ROOT_ENV) {
            if !api_root.trim().is_empty() {
                resolved.api_root = api_root.trim().to_string();
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MirrorError> {
        let defaults = SyncOptions::default();
        let concurrency = config.concurrency.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(MirrorError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        let page_size = config.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(MirrorError::InvalidConfig(
                "page_size must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            api_root: config
                .api_root
                .unwrap_or_else(|| DEFAULT_API_ROOT.to_string()),
            output_dir: Utf8PathBuf::from(config.output_dir.unwrap_or_else(|| ".".to_string())),
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
            sync: SyncOptions {
                concurrency,
                page_size,
                report: config.report.unwrap_or(defaults.report),
            },
        })
    }
}
