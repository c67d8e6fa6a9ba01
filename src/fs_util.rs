use std::io::ErrorKind;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8Path;
use md5::{Digest, Md5};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::MirrorError;

const READ_CHUNK: usize = 64 * 1024;

pub type Md5Digest = [u8; 16];

/// MD5 of the file at `path`, or `None` when there is no such file.
pub async fn file_md5(path: &Utf8Path) -> Result<Option<Md5Digest>, MirrorError> {
    let mut file = match File::open(path.as_std_path()).await {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(MirrorError::Filesystem(format!("open {path}: {err}"))),
    };
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|err| MirrorError::Filesystem(format!("read {path}: {err}")))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.finalize());
    Ok(Some(digest))
}

/// Decodes the base64 digest carried by a file descriptor.
pub fn decode_md5(encoded: &str, path: &str) -> Result<Md5Digest, MirrorError> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|err| MirrorError::InvalidHash {
            path: path.to_string(),
            message: err.to_string(),
        })?;
    raw.as_slice()
        .try_into()
        .map_err(|_| MirrorError::InvalidHash {
            path: path.to_string(),
            message: format!("expected 16 bytes, got {}", raw.len()),
        })
}

pub fn encode_md5(content: &[u8]) -> String {
    STANDARD.encode(Md5::digest(content))
}
