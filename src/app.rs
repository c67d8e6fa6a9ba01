use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::client::ResourceClient;
use crate::domain::CaseId;
use crate::error::MirrorError;
use crate::manifest::{self, ManifestCollector};
use crate::orchestrator::Gate;
use crate::report::{self, CaseReport};
use crate::store::Store;
use crate::walker::Walker;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub concurrency: usize,
    pub page_size: u32,
    pub report: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            page_size: 1000,
            report: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub case_id: String,
    pub project_name: String,
    pub files: usize,
    pub downloaded: usize,
    pub up_to_date: usize,
    /// Downloaded files whose content did not match the recorded hash.
    pub mismatched: usize,
    pub manifest_path: String,
    pub report_path: Option<String>,
}

pub struct App<C: ResourceClient> {
    store: Store,
    client: C,
}

impl<C: ResourceClient> App<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mirrors one case. Report and manifest are only written once the whole
    /// tree has been walked without error.
    pub async fn sync(
        &self,
        case: &CaseId,
        options: &SyncOptions,
        generated_at: DateTime<Utc>,
    ) -> Result<SyncResult, MirrorError> {
        let gate = Gate::new(options.concurrency)?;
        let collector = ManifestCollector::new();
        let walker = Walker::new(
            &self.client,
            &self.store,
            gate,
            collector.clone(),
            options.page_size,
        );

        let header = walker.header(case).await?;
        info!(case = %case, name = %header.projectnaam, "resolved project");
        walker.check_project_information(&header).await?;

        let sections = walker.walk_case(case, &header).await?;
        let stats = walker.stats();
        info!(
            downloaded = stats.downloaded(),
            up_to_date = stats.skipped(),
            mismatched = stats.mismatched(),
            "traversal complete"
        );

        let report_path = if options.report {
            let path = self.store.report_path(case);
            let html = report::render(&CaseReport {
                case: case.clone(),
                header: header.clone(),
                generated_at,
                sections,
            });
            Store::write_bytes_atomic(&path, html.as_bytes())?;
            Some(path)
        } else {
            None
        };

        let entries = collector.sorted_entries();
        let manifest_path = self.store.manifest_path(case);
        let content = manifest::render(case, &header.projectnaam, generated_at, &entries);
        Store::write_bytes_atomic(&manifest_path, content.as_bytes())?;
        info!(path = %manifest_path, files = entries.len(), "wrote manifest");

        Ok(SyncResult {
            case_id: case.to_string(),
            project_name: header.projectnaam,
            files: entries.len(),
            downloaded: stats.downloaded(),
            up_to_date: stats.skipped(),
            mismatched: stats.mismatched(),
            manifest_path: manifest_path.to_string(),
            report_path: report_path.map(Utf8PathBuf::into_string),
        })
    }
}
