//! Recursive traversal of a case: record tree in, mirrored files and report
//! sections out.
//!
//! Path segments per node kind:
//! - subject: `betreft`
//! - component: `inhoud.aard.code`
//! - stuk: `codelijstMetCategorie.code` for nested stukken,
//!   `dossierstuk.code` for its file listing
//! - case document: `dossierstukType.code`
//! - procedure step: `inhoud.aard.code`, then the occurrence group name
//! - occurrence: `gevraagdAan`, falling back to `verantwoordelijke`, then the
//!   title of each content section

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::ResourceClient;
use crate::domain::{CaseId, LocalPath};
use crate::downloader::{Downloader, SyncAction};
use crate::error::MirrorError;
use crate::manifest::ManifestCollector;
use crate::model::{
    Bestand, Datablok, DossierStuk, Gebeurtenis, GebeurtenisSectie, GraphNode, OccurrenceGroup, Onderdeel,
    OnderdeelDetails, Page, PlanFoto, ProcedureStap, ProjectHeader, ProjectInformation, Stuk,
    Tabel, Voorwerp, value_text,
};
use crate::orchestrator::{Gate, fan_out};
use crate::report::{DataTable, FileRow, FormBlock, ReportSection};
use crate::store::Store;

type FileColumns = Vec<(&'static str, String)>;

#[derive(Debug, Default)]
pub struct SyncStats {
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    mismatched: AtomicUsize,
}

impl SyncStats {
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Included in [`SyncStats::downloaded`] as well.
    pub fn mismatched(&self) -> usize {
        self.mismatched.load(Ordering::Relaxed)
    }

    fn record(&self, action: SyncAction) {
        match action {
            SyncAction::Downloaded => self.downloaded.fetch_add(1, Ordering::Relaxed),
            SyncAction::Skipped => self.skipped.fetch_add(1, Ordering::Relaxed),
            SyncAction::Mismatched => {
                self.mismatched.fetch_add(1, Ordering::Relaxed);
                self.downloaded.fetch_add(1, Ordering::Relaxed)
            }
        };
    }
}

pub struct Walker<'a, C: ?Sized> {
    client: &'a C,
    store: &'a Store,
    gate: Gate,
    collector: ManifestCollector,
    page_size: u32,
    stats: SyncStats,
}

impl<'a, C: ResourceClient + ?Sized> Walker<'a, C> {
    pub fn new(
        client: &'a C,
        store: &'a Store,
        gate: Gate,
        collector: ManifestCollector,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            store,
            gate,
            collector,
            page_size,
            stats: SyncStats::default(),
        }
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub async fn header(&self, case: &CaseId) -> Result<ProjectHeader, MirrorError> {
        self.fetch("inzage/projecten/header", &[("projectnummer", case.to_string())])
            .await
    }

    /// Project information is not mirrored; its presence is only reported.
    pub async fn check_project_information(
        &self,
        header: &ProjectHeader,
    ) -> Result<(), MirrorError> {
        let info: ProjectInformation = self
            .fetch(&format!("inzage/projecten/{}/projectinformatie", header.uuid), &[])
            .await?;
        if !info.sub_onderdelen.is_empty() {
            warn!(
                count = info.sub_onderdelen.len(),
                "project information has content that is not mirrored"
            );
        }
        Ok(())
    }

    /// Walks the subject tree and the procedure tree of a case concurrently.
    pub async fn walk_case(
        &self,
        case: &CaseId,
        header: &ProjectHeader,
    ) -> Result<Vec<ReportSection>, MirrorError> {
        let root = LocalPath::root(case);
        let (subjects, procedure) = futures::try_join!(
            self.walk_subjects(&header.uuid, &root),
            self.walk_procedure(&header.uuid, &root),
        )?;
        Ok(vec![subjects, procedure])
    }

    async fn walk_subjects(
        &self,
        project: &str,
        root: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let subjects: Vec<Voorwerp> = self
            .fetch_page(&format!("inzage/projecten/{project}/top-voorwerpen"))
            .await?;
        info!(count = subjects.len(), "walking subjects");
        let mut section = ReportSection::new("inhoud", "Inhoud Aanvraag");
        section.children = fan_out(
            subjects
                .into_iter()
                .map(|subject| self.visit(GraphNode::Subject(subject), root.clone())),
        )
        .await?;
        Ok(section)
    }

    async fn walk_procedure(
        &self,
        project: &str,
        root: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let steps: Vec<ProcedureStap> = self
            .fetch(&format!("inzage/projecten/{project}/procedure"), &[])
            .await?;
        info!(count = steps.len(), "walking procedure steps");
        let mut section = ReportSection::new("procedure", "Procedure");
        section.children = fan_out(
            steps
                .into_iter()
                .map(|step| self.visit(GraphNode::ProcedureStep(step), root.clone())),
        )
        .await?;
        Ok(section)
    }

    pub fn visit<'b>(
        &'b self,
        node: GraphNode,
        parent: LocalPath,
    ) -> BoxFuture<'b, Result<ReportSection, MirrorError>> {
        async move {
            match node {
                GraphNode::Subject(voorwerp) => self.visit_subject(voorwerp, &parent).await,
                GraphNode::Component(onderdeel) => self.visit_component(onderdeel, &parent).await,
                GraphNode::Stuk(stuk) => self.visit_stuk(stuk, &parent).await,
                GraphNode::CaseDocument(stuk) => self.visit_case_document(stuk, &parent).await,
                GraphNode::Occurrence(gebeurtenis) => {
                    self.visit_occurrence(gebeurtenis, &parent).await
                }
                GraphNode::ProcedureStep(stap) => self.visit_procedure_step(stap, &parent).await,
            }
        }
        .boxed()
    }

    async fn visit_subject(
        &self,
        voorwerp: Voorwerp,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let betreft = voorwerp.betreft.as_deref().ok_or_else(|| {
            MirrorError::UnimplementedNode(format!("voorwerp {} without betreft", voorwerp.uuid))
        })?;
        let path = parent.child(betreft);
        let uuid = voorwerp.uuid.as_str();

        let (plans, components, documents) = futures::try_join!(
            self.subject_plans(uuid, &path),
            self.subject_components(uuid, &path),
            self.subject_documents(uuid, &path),
        )?;

        let heading = voorwerp.adres.clone().unwrap_or_else(|| betreft.to_string());
        let mut section = ReportSection::new("voorwerp", heading).with_anchor(uuid);
        section.fields = vec![
            ("betreft".to_string(), betreft.to_string()),
            (
                "effecten".to_string(),
                voorwerp.effecten.clone().unwrap_or_default(),
            ),
        ];
        section.children.push(plans);
        section.children.extend(components);
        let mut docs = ReportSection::new("dossierstukken", "DossierStukken");
        docs.children = documents;
        section.children.push(docs);
        Ok(section)
    }

    async fn subject_plans(
        &self,
        uuid: &str,
        path: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let listing = format!("inzage/voorwerpen/{uuid}/plannen-en-fotos");
        let query = self.page_query();
        let body = json!({ "filters": [] });
        let value = self
            .gate
            .run(self.client.post(&listing, &query, &body))
            .await?;
        let page: Page<PlanFoto> = decode(&listing, value)?;

        let files = page
            .content
            .into_iter()
            .map(|plan| {
                let columns = vec![
                    (
                        "TekeningSoort",
                        plan.tekeningsoort.map(|code| code.code).unwrap_or_default(),
                    ),
                    ("PlanAanduiding", plan.plan_aanduiding.unwrap_or_default()),
                    (
                        "Toestand",
                        plan.toestand.map(|code| code.code).unwrap_or_default(),
                    ),
                ];
                (plan.bestand, columns)
            })
            .collect();

        let mut section = ReportSection::new("plannenenfotos", "Plannen en Foto's");
        section.files = self.sync_files(path, files).await?;
        Ok(section)
    }

    async fn subject_components(
        &self,
        uuid: &str,
        path: &LocalPath,
    ) -> Result<Vec<ReportSection>, MirrorError> {
        let components: Vec<Onderdeel> = self
            .fetch(&format!("inzage/voorwerpen/{uuid}/onderdelen"), &[])
            .await?;
        fan_out(
            components
                .into_iter()
                .map(|component| self.visit(GraphNode::Component(component), path.clone())),
        )
        .await
    }

    async fn subject_documents(
        &self,
        uuid: &str,
        path: &LocalPath,
    ) -> Result<Vec<ReportSection>, MirrorError> {
        let documents: Vec<DossierStuk> = self
            .fetch(&format!("inzage/voorwerpen/{uuid}/dossierstukken"), &[])
            .await?;
        fan_out(
            documents
                .into_iter()
                .map(|document| self.visit(GraphNode::CaseDocument(document), path.clone())),
        )
        .await
    }

    async fn visit_component(
        &self,
        onderdeel: Onderdeel,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let path = parent.child(&onderdeel.inhoud.aard.code);
        let details: OnderdeelDetails = self
            .fetch(
                &format!("inzage/dossier-onderdelen/{}/details", onderdeel.uuid),
                &[],
            )
            .await?;

        let mut section = ReportSection::new("onderdeel", onderdeel.inhoud.aard.code.clone())
            .with_anchor(onderdeel.uuid.clone());
        section.text = onderdeel.inhoud.inhoud.clone();
        section.children = fan_out(
            details
                .details
                .into_iter()
                .map(|stuk| self.visit(GraphNode::Stuk(stuk), path.clone())),
        )
        .await?;
        Ok(section)
    }

    async fn visit_stuk(
        &self,
        mut stuk: Stuk,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        if stuk.details.is_some() {
            return Err(MirrorError::UnimplementedNode(format!(
                "{} carries details",
                stuk.describe()
            )));
        }
        let nested = stuk.sub_onderdelen.take();
        let blocks = std::mem::take(&mut stuk.inzage_datablok_resources);

        let (files, children, forms) = futures::try_join!(
            self.stuk_files(&stuk, parent),
            self.stuk_children(&stuk, nested, parent),
            self.form_blocks(blocks),
        )?;

        let heading = stuk
            .heading()
            .or(stuk.uuid.as_deref())
            .unwrap_or("stuk")
            .to_string();
        let mut section = ReportSection::new("onderdeel", heading);
        section.anchor = stuk.uuid.clone();
        section.text = stuk.inhoud.clone();
        section.forms = forms;
        section.files = files;
        section.children = children;
        Ok(section)
    }

    async fn stuk_files(&self, stuk: &Stuk, parent: &LocalPath) -> Result<Vec<FileRow>, MirrorError> {
        let Some(document) = stuk.dossierstuk_uuid.as_deref() else {
            return Ok(Vec::new());
        };
        let code = stuk.dossierstuk.as_ref().ok_or_else(|| {
            MirrorError::UnimplementedNode(format!(
                "{} references dossierstuk {document} without a type code",
                stuk.describe()
            ))
        })?;
        self.listed_files(document, &parent.child(&code.code)).await
    }

    async fn stuk_children(
        &self,
        stuk: &Stuk,
        nested: Option<Vec<Stuk>>,
        parent: &LocalPath,
    ) -> Result<Vec<ReportSection>, MirrorError> {
        let Some(nested) = nested.filter(|nested| !nested.is_empty()) else {
            return Ok(Vec::new());
        };
        let category = stuk.codelijst_met_categorie.as_ref().ok_or_else(|| {
            MirrorError::UnimplementedNode(format!(
                "{} has nested stukken without a category code",
                stuk.describe()
            ))
        })?;
        let path = parent.child(&category.code);
        fan_out(
            nested
                .into_iter()
                .map(|child| self.visit(GraphNode::Stuk(child), path.clone())),
        )
        .await
    }

    async fn visit_case_document(
        &self,
        document: DossierStuk,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let DossierStuk {
            uuid,
            dossierstuk_type,
            inzage_datablok_resources,
        } = document;
        let path = parent.child(&dossierstuk_type.code);
        let (forms, files) = futures::try_join!(
            self.form_blocks(inzage_datablok_resources),
            self.listed_files(&uuid, &path),
        )?;

        let mut section = ReportSection::new("dossierstuk", dossierstuk_type.code).with_anchor(uuid);
        section.forms = forms;
        section.files = files;
        Ok(section)
    }

    async fn visit_procedure_step(
        &self,
        stap: ProcedureStap,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let ProcedureStap {
            uuid,
            inhoud,
            sub_onderdelen,
        } = stap;
        let path = parent.child(&inhoud.aard.code);

        let stukken = fan_out(
            sub_onderdelen
                .into_iter()
                .map(|stuk| self.visit(GraphNode::Stuk(stuk), path.clone())),
        );
        let groups = fan_out(
            OccurrenceGroup::ALL
                .into_iter()
                .map(|group| self.occurrence_group(&uuid, group, &path)),
        );
        let (stukken, groups) = futures::try_join!(stukken, groups)?;

        let mut section = ReportSection::new("procedureStap", inhoud.aard.code).with_anchor(uuid);
        section.children = stukken;
        section.children.extend(groups);
        Ok(section)
    }

    async fn occurrence_group(
        &self,
        step: &str,
        group: OccurrenceGroup,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let occurrences: Vec<Gebeurtenis> = self
            .fetch_page(&format!(
                "inzage/projectfasen/{step}/{}-gebeurtenissen",
                group.as_str()
            ))
            .await?;
        let path = parent.child(group.as_str());

        let mut section = ReportSection::new("gebeurtenissen", group.as_str());
        section.children = fan_out(
            occurrences
                .into_iter()
                .map(|occurrence| self.visit(GraphNode::Occurrence(occurrence), path.clone())),
        )
        .await?;
        Ok(section)
    }

    async fn visit_occurrence(
        &self,
        gebeurtenis: Gebeurtenis,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let segment = gebeurtenis.segment().ok_or_else(|| {
            MirrorError::UnimplementedNode(
                "gebeurtenis without gevraagdAan or verantwoordelijke".to_string(),
            )
        })?;
        let content_id = gebeurtenis.content_id().ok_or_else(|| {
            MirrorError::UnimplementedNode(format!("gebeurtenis {segment} without uuid"))
        })?;
        let path = parent.child(segment);

        let sections: Vec<GebeurtenisSectie> = self
            .fetch(&format!("inzage/gebeurtenissen/{content_id}"), &[])
            .await?;

        let mut section = ReportSection::new("gebeurtenis", segment);
        section.anchor = gebeurtenis.uuid.clone();
        if gebeurtenis.is_advice_request() {
            section.fields = advice_fields(&gebeurtenis);
        }
        section.children = fan_out(
            sections
                .into_iter()
                .map(|content| self.occurrence_section(content, &path)),
        )
        .await?;
        Ok(section)
    }

    async fn occurrence_section(
        &self,
        content: GebeurtenisSectie,
        parent: &LocalPath,
    ) -> Result<ReportSection, MirrorError> {
        let path = parent.child(&content.titel);
        let files = content
            .bestanden
            .into_iter()
            .map(|file| {
                let columns = description_column(&file);
                (file, columns)
            })
            .collect();

        let (forms, files) = futures::try_join!(
            self.form_blocks(content.datablokken),
            self.sync_files(&path, files),
        )?;

        let mut section = ReportSection::new("inhoud", content.titel);
        section.table = content.tabel.map(data_table);
        section.forms = forms;
        section.files = files;
        Ok(section)
    }

    /// Looks up the form definition of each block for its title.
    async fn form_blocks(&self, blocks: Vec<Datablok>) -> Result<Vec<FormBlock>, MirrorError> {
        fan_out(blocks.into_iter().map(|block| async move {
            let block_id = block.block_id();
            let definition: Value = self
                .fetch(
                    &format!("parameters/datablokDefinitie-form-io-formulier/{block_id}"),
                    &[],
                )
                .await?;
            let title = ["title", "name"]
                .into_iter()
                .find_map(|key| definition.get(key))
                .map(value_text)
                .filter(|title| !title.is_empty());
            Ok::<_, MirrorError>(FormBlock {
                anchor: block.uuid.clone(),
                block_id,
                title,
                content: block.content_text(),
            })
        }))
        .await
    }

    /// Files listed under a dossierstuk id.
    async fn listed_files(
        &self,
        document: &str,
        path: &LocalPath,
    ) -> Result<Vec<FileRow>, MirrorError> {
        let files: Vec<Bestand> = self
            .fetch_page(&format!("inzage/dossierstukken/{document}/bestanden"))
            .await?;
        let files = files
            .into_iter()
            .map(|file| {
                let columns = description_column(&file);
                (file, columns)
            })
            .collect();
        self.sync_files(path, files).await
    }

    async fn sync_files(
        &self,
        path: &LocalPath,
        files: Vec<(Bestand, FileColumns)>,
    ) -> Result<Vec<FileRow>, MirrorError> {
        fan_out(
            files
                .into_iter()
                .map(|(file, columns)| self.sync_file(path, file, columns)),
        )
        .await
    }

    async fn sync_file(
        &self,
        parent: &LocalPath,
        file: Bestand,
        columns: FileColumns,
    ) -> Result<FileRow, MirrorError> {
        let path = parent.child(&file.bestandsnaam);
        self.collector.claim(&path)?;
        let downloader = Downloader::new(self.client, self.store);
        let outcome = self.gate.run(downloader.sync(&path, &file)).await?;
        self.stats.record(outcome.action);
        self.collector.append(outcome.entry);
        Ok(FileRow {
            path,
            file,
            columns,
        })
    }

    fn page_query(&self) -> [(&'static str, String); 1] {
        [("size", self.page_size.to_string())]
    }

    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MirrorError> {
        let value = self.gate.run(self.client.get(path, query)).await?;
        decode(path, value)
    }

    async fn fetch_page<T: DeserializeOwned + Send>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, MirrorError> {
        let query = self.page_query();
        let content = self.gate.run(self.client.get_paged(path, &query)).await?;
        content.into_iter().map(|value| decode(path, value)).collect()
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, MirrorError> {
    serde_json::from_value(value).map_err(|err| MirrorError::Decode {
        url: path.to_string(),
        message: err.to_string(),
    })
}

fn description_column(file: &Bestand) -> FileColumns {
    vec![("Omschrijving", file.omschrijving.clone().unwrap_or_default())]
}

fn advice_fields(gebeurtenis: &Gebeurtenis) -> Vec<(String, String)> {
    let text = |value: &Option<Value>| value.as_ref().map(value_text).unwrap_or_default();
    let voorwaarden = match &gebeurtenis.voorwaarden {
        Some(Value::Null) | Some(Value::Bool(false)) | None => "nee",
        Some(_) => "ja",
    };
    vec![
        ("aantalAdviezen".to_string(), text(&gebeurtenis.aantal_adviezen)),
        (
            "aardLaatsteAdvies".to_string(),
            text(&gebeurtenis.aard_laatste_advies),
        ),
        (
            "adviesVraagDatum".to_string(),
            text(&gebeurtenis.advies_vraag_datum),
        ),
        (
            "datumLaatsteAdviesVerlening".to_string(),
            text(&gebeurtenis.datum_laatste_advies_verlening),
        ),
        (
            "gevraagdAan".to_string(),
            gebeurtenis.gevraagd_aan.clone().unwrap_or_default(),
        ),
        ("voorwaarden".to_string(), voorwaarden.to_string()),
        (
            "gevraagdDoor".to_string(),
            gebeurtenis.gevraagd_door.clone().unwrap_or_default(),
        ),
    ]
}

fn data_table(tabel: Tabel) -> DataTable {
    DataTable {
        anchor: tabel.uuid,
        caption: tabel.titel,
        headers: tabel
            .kolom_namen
            .iter()
            .map(|cel| value_text(&cel.value))
            .collect(),
        rows: tabel
            .rijen
            .iter()
            .map(|rij| rij.data.iter().map(|cel| value_text(&cel.value)).collect())
            .collect(),
    }
}
