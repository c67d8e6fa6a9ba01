use futures::StreamExt;
use md5::{Digest, Md5};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::client::ResourceClient;
use crate::domain::LocalPath;
use crate::error::MirrorError;
use crate::fs_util::{decode_md5, file_md5};
use crate::manifest::ManifestEntry;
use crate::model::Bestand;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// The local copy already matched the recorded hash.
    Skipped,
    Downloaded,
    /// Transferred, but the received bytes do not hash to the recorded value.
    Mismatched,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub entry: ManifestEntry,
    pub action: SyncAction,
}

/// Makes one local file equal to its remote descriptor, transferring only
/// when the on-disk digest differs.
pub struct Downloader<'a, C: ?Sized> {
    client: &'a C,
    store: &'a Store,
}

impl<'a, C: ResourceClient + ?Sized> Downloader<'a, C> {
    pub fn new(client: &'a C, store: &'a Store) -> Self {
        Self { client, store }
    }

    pub async fn sync(&self, path: &LocalPath, file: &Bestand) -> Result<SyncOutcome, MirrorError> {
        let target = self.store.resolve(path);
        let expected = decode_md5(&file.hash, target.as_str())?;
        let entry = ManifestEntry {
            path: path.clone(),
            upload_dates: file.datum_opladen.clone(),
            description: file.omschrijving.clone(),
        };

        if file_md5(&target).await? == Some(expected) {
            debug!("up to date {path}");
            return Ok(SyncOutcome {
                entry,
                action: SyncAction::Skipped,
            });
        }

        debug!("download {path}");
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent.as_std_path())
                .await
                .map_err(|err| MirrorError::Filesystem(format!("create {parent}: {err}")))?;
        }
        let mut body = self.client.get_binary(&file.uuid).await?;
        let mut out = File::create(target.as_std_path())
            .await
            .map_err(|err| MirrorError::Filesystem(format!("create {target}: {err}")))?;
        let mut hasher = Md5::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            out.write_all(&chunk)
                .await
                .map_err(|err| MirrorError::Filesystem(format!("write {target}: {err}")))?;
        }
        out.flush()
            .await
            .map_err(|err| MirrorError::Filesystem(format!("write {target}: {err}")))?;

        let action = if hasher.finalize().as_slice() == expected.as_slice() {
            SyncAction::Downloaded
        } else {
            warn!("{path}: downloaded content does not match the recorded hash");
            SyncAction::Mismatched
        };

        Ok(SyncOutcome { entry, action })
    }
}
