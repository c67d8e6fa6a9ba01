//! Local mirror of a public Omgevingsloket permit case.
//!
//! [`walker::Walker`] walks the remote record tree of a case, syncing every
//! attachment through [`downloader::Downloader`] (skipped when the local MD5
//! already matches) and collecting [`manifest::ManifestEntry`] values. Once
//! the walk has fully succeeded, [`app::App`] writes `inhoud.html` and
//! `bestanden.txt` into the case directory.

pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod downloader;
pub mod error;
pub mod fs_util;
pub mod manifest;
pub mod model;
pub mod orchestrator;
pub mod report;
pub mod store;
pub mod walker;
