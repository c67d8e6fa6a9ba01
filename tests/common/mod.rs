#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use camino::Utf8PathBuf;
use futures::StreamExt;
use serde_json::{Value, json};

use omv_mirror::client::{ByteStream, ResourceClient};
use omv_mirror::error::MirrorError;
use omv_mirror::fs_util::encode_md5;
use omv_mirror::store::Store;

pub const CASE: &str = "OMV_2023000001";
pub const PROJECT: &str = "p-1";

/// Serves canned JSON by request path and file bodies by file id.
#[derive(Default)]
pub struct MockOmv {
    pub json: HashMap<String, Value>,
    pub files: HashMap<String, Vec<u8>>,
    pub failing: HashSet<String>,
    pub downloads: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<String>>,
}

impl MockOmv {
    pub fn with(mut self, path: &str, value: Value) -> Self {
        self.json.insert(path.to_string(), value);
        self
    }

    pub fn file(mut self, id: &str, content: &[u8]) -> Self {
        self.files.insert(id.to_string(), content.to_vec());
        self
    }

    pub fn fail_download(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        let mut downloads = self.downloads.lock().unwrap().clone();
        downloads.sort();
        downloads
    }

    pub fn reset_counters(&self) {
        self.downloads.lock().unwrap().clear();
        self.requests.lock().unwrap().clear();
    }

    fn lookup(&self, path: &str) -> Result<Value, MirrorError> {
        self.requests.lock().unwrap().push(path.to_string());
        self.json.get(path).cloned().ok_or_else(|| MirrorError::Status {
            url: path.to_string(),
            status: 404,
            body: "not found".to_string(),
        })
    }
}

#[async_trait]
impl ResourceClient for MockOmv {
    async fn get(&self, path: &str, _query: &[(&str, String)]) -> Result<Value, MirrorError> {
        self.lookup(path)
    }

    async fn post(
        &self,
        path: &str,
        _query: &[(&str, String)],
        _body: &Value,
    ) -> Result<Value, MirrorError> {
        self.lookup(path)
    }

    async fn get_binary(&self, file_id: &str) -> Result<ByteStream, MirrorError> {
        self.downloads.lock().unwrap().push(file_id.to_string());
        if self.failing.contains(file_id) {
            return Err(MirrorError::Status {
                url: format!("inzage/bestanden/{file_id}/download"),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let content = self.files.get(file_id).cloned().ok_or_else(|| MirrorError::Status {
            url: file_id.to_string(),
            status: 404,
            body: "no such file".to_string(),
        })?;
        Ok(futures::stream::iter(vec![Ok(Bytes::from(content))]).boxed())
    }
}

pub fn bestand(id: &str, name: &str, content: &[u8]) -> Value {
    json!({
        "uuid": id,
        "bestandsnaam": name,
        "hash": encode_md5(content),
        "grootte": content.len(),
        "datumOpladen": ["2023-05-12"],
        "omschrijving": format!("beschrijving {name}")
    })
}

pub fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, Store::new(root))
}

/// A case with one subject (plans, a component with nested stukken, a case
/// document) and one procedure step with an advice occurrence.
pub fn sample_case() -> MockOmv {
    let plan = b"plan".as_slice();
    let foto = b"foto".as_slice();
    let nota = b"nota".as_slice();
    let bijlage = b"bijlage".as_slice();
    let attest = b"attest".as_slice();
    let advies = b"advies".as_slice();

    MockOmv::default()
        .with(
            "inzage/projecten/header",
            json!({
                "uuid": PROJECT,
                "projectnummer": CASE,
                "projectnaam": "Verbouwing woning",
                "beroepOfBezwaar": "geen",
                "toestand": {"code": "LOPEND"}
            }),
        )
        .with(
            "inzage/projecten/p-1/projectinformatie",
            json!({"subOnderdelen": []}),
        )
        .with(
            "inzage/projecten/p-1/top-voorwerpen",
            json!({"content": [{
                "uuid": "v-1",
                "betreft": "Kerkstraat 1",
                "adres": "Kerkstraat 1, 9000 Gent",
                "effecten": "geen"
            }]}),
        )
        .with(
            "inzage/voorwerpen/v-1/plannen-en-fotos",
            json!({"content": [
                {
                    "uuid": "f-plan",
                    "bestandsnaam": "grondplan.pdf",
                    "hash": encode_md5(plan),
                    "grootte": 4,
                    "datumOpladen": [2023, 5, 12],
                    "tekeningsoort": {"code": "GRONDPLAN"},
                    "planAanduiding": "1/2",
                    "toestand": {"code": "NIEUW"}
                },
                {
                    "uuid": "f-foto",
                    "bestandsnaam": "gevel.jpg",
                    "hash": encode_md5(foto),
                    "grootte": 4,
                    "datumOpladen": [2023, 5, 13]
                }
            ]}),
        )
        .with(
            "inzage/voorwerpen/v-1/onderdelen",
            json!([{
                "uuid": "o-1",
                "inhoud": {"aard": {"code": "BOUWEN"}, "inhoud": "verbouwen"}
            }]),
        )
        .with(
            "inzage/dossier-onderdelen/o-1/details",
            json!({"details": [{
                "uuid": "s-1",
                "titel": {"code": "NOTA"},
                "codelijstMetCategorie": {"code": "BIJLAGEN"},
                "subOnderdelen": [{
                    "uuid": "s-2",
                    "titel": "Bijlage",
                    "dossierstukUuid": "d-2",
                    "dossierstuk": {"code": "BIJLAGE_A"}
                }],
                "dossierstukUuid": "d-1",
                "dossierstuk": {"code": "NOTA"}
            }]}),
        )
        .with(
            "inzage/dossierstukken/d-1/bestanden",
            json!({"content": [bestand("f-nota", "nota.pdf", nota)]}),
        )
        .with(
            "inzage/dossierstukken/d-2/bestanden",
            json!({"content": [bestand("f-bijlage", "bijlage.pdf", bijlage)]}),
        )
        .with(
            "inzage/voorwerpen/v-1/dossierstukken",
            json!([{"uuid": "d-3", "dossierstukType": {"code": "ATTEST"}}]),
        )
        .with(
            "inzage/dossierstukken/d-3/bestanden",
            json!({"content": [bestand("f-attest", "attest.pdf", attest)]}),
        )
        .with(
            "inzage/projecten/p-1/procedure",
            json!([{
                "uuid": "st-1",
                "inhoud": {"aard": {"code": "ADVIESFASE"}},
                "subOnderdelen": []
            }]),
        )
        .with(
            "inzage/projectfasen/st-1/advies-gebeurtenissen",
            json!({"content": [{
                "adviesVraagGebeurtenisUuid": "g-1",
                "verantwoordelijke": "Brandweer",
                "aantalAdviezen": 1,
                "voorwaarden": true
            }]}),
        )
        .with(
            "inzage/projectfasen/st-1/beslissing-gebeurtenissen",
            json!({"content": []}),
        )
        .with(
            "inzage/projectfasen/st-1/andere-gebeurtenissen",
            json!({"content": []}),
        )
        .with(
            "inzage/gebeurtenissen/g-1",
            json!([{
                "titel": "Advies",
                "bestanden": [bestand("f-advies", "advies.pdf", advies)],
                "tabel": {
                    "titel": "Voorwaarden",
                    "kolomNamen": [{"value": "nr"}, {"value": "tekst"}],
                    "rijen": [{"data": [{"value": 1}, {"value": "geen hout"}]}]
                }
            }]),
        )
        .file("f-plan", plan)
        .file("f-foto", foto)
        .file("f-nota", nota)
        .file("f-bijlage", bijlage)
        .file("f-attest", attest)
        .file("f-advies", advies)
}

pub const SAMPLE_FILES: [&str; 6] = [
    "OMV_2023000001/ADVIESFASE/advies/Brandweer/Advies/advies.pdf",
    "OMV_2023000001/Kerkstraat 1/ATTEST/attest.pdf",
    "OMV_2023000001/Kerkstraat 1/BOUWEN/BIJLAGEN/BIJLAGE_A/bijlage.pdf",
    "OMV_2023000001/Kerkstraat 1/BOUWEN/NOTA/nota.pdf",
    "OMV_2023000001/Kerkstraat 1/gevel.jpg",
    "OMV_2023000001/Kerkstraat 1/grondplan.pdf",
];
