//! Records returned by the Omgevingsloket inzage API.
//!
//! Only the fields the mirror needs are modelled; everything else in the
//! responses is ignored by serde.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHeader {
    pub uuid: String,
    pub projectnummer: String,
    pub projectnaam: String,
    #[serde(default)]
    pub beroep_of_bezwaar: Option<Value>,
    #[serde(default)]
    pub toestand: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInformation {
    #[serde(default)]
    pub sub_onderdelen: Vec<Value>,
}

/// One upload date, transmitted either as a date string or as numeric
/// year/month/day parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatePart {
    Number(i64),
    Text(String),
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePart::Number(value) => write!(f, "{value}"),
            DatePart::Text(value) => write!(f, "{value}"),
        }
    }
}

pub fn join_dates(dates: &[DatePart], separator: &str) -> String {
    dates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// File descriptor ("bestand").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bestand {
    pub uuid: String,
    pub bestandsnaam: String,
    /// Base64 encoded MD5 digest of the file contents.
    pub hash: String,
    #[serde(default)]
    pub grootte: Option<u64>,
    #[serde(default)]
    pub datum_opladen: Vec<DatePart>,
    #[serde(default)]
    pub omschrijving: Option<String>,
}

/// Entry of the plans and photos listing of a subject.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFoto {
    #[serde(flatten)]
    pub bestand: Bestand,
    #[serde(default)]
    pub tekeningsoort: Option<Code>,
    #[serde(default)]
    pub plan_aanduiding: Option<String>,
    #[serde(default)]
    pub toestand: Option<Code>,
}

/// Subject under review ("voorwerp").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voorwerp {
    pub uuid: String,
    #[serde(default)]
    pub betreft: Option<String>,
    #[serde(default)]
    pub adres: Option<String>,
    #[serde(default)]
    pub effecten: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnderdeelInhoud {
    pub aard: Code,
    #[serde(default)]
    pub inhoud: Option<String>,
}

/// Component of a subject ("onderdeel").
#[derive(Debug, Clone, Deserialize)]
pub struct Onderdeel {
    pub uuid: String,
    pub inhoud: OnderdeelInhoud,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnderdeelDetails {
    #[serde(default)]
    pub details: Vec<Stuk>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Titel {
    Coded(Code),
    Text(String),
}

/// Nested part of a component or procedure step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stuk {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub titel: Option<Titel>,
    #[serde(default)]
    pub aard: Option<Code>,
    #[serde(default)]
    pub inhoud: Option<String>,
    #[serde(default)]
    pub dossierstuk_uuid: Option<String>,
    #[serde(default)]
    pub dossierstuk: Option<Code>,
    #[serde(default)]
    pub sub_onderdelen: Option<Vec<Stuk>>,
    #[serde(default)]
    pub codelijst_met_categorie: Option<Code>,
    #[serde(default)]
    pub inzage_datablok_resources: Vec<Datablok>,
    #[serde(default)]
    pub details: Option<Value>,
}

impl Stuk {
    /// Heading for the report: `titel.code`, then `titel` as text, then
    /// `aard.code`, in that order.
    pub fn heading(&self) -> Option<&str> {
        match &self.titel {
            Some(Titel::Coded(code)) => Some(code.code.as_str()),
            Some(Titel::Text(text)) => Some(text.as_str()),
            None => self.aard.as_ref().map(|aard| aard.code.as_str()),
        }
    }

    pub fn describe(&self) -> String {
        format!("stuk {}", self.uuid.as_deref().unwrap_or("<zonder uuid>"))
    }
}

/// Formal case document ("dossierstuk").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DossierStuk {
    pub uuid: String,
    pub dossierstuk_type: Code,
    #[serde(default)]
    pub inzage_datablok_resources: Vec<Datablok>,
}

/// Filled-in form attached to a record. `blokId` names the form definition,
/// `datablokinhoud` holds the submitted values, usually as a JSON string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datablok {
    pub uuid: String,
    pub blok_id: Value,
    #[serde(default)]
    pub datablokinhoud: Option<Value>,
}

impl Datablok {
    pub fn block_id(&self) -> String {
        value_text(&self.blok_id)
    }

    /// Submitted values, pretty printed when they parse as JSON.
    pub fn content_text(&self) -> String {
        let parsed = match &self.datablokinhoud {
            None | Some(Value::Null) => return String::new(),
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(value) => value,
                Err(_) => return raw.clone(),
            },
            Some(other) => other.clone(),
        };
        serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| parsed.to_string())
    }
}

/// Phase of the formal procedure ("procedurestap").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureStap {
    pub uuid: String,
    pub inhoud: OnderdeelInhoud,
    #[serde(default)]
    pub sub_onderdelen: Vec<Stuk>,
}

/// The three occurrence listings of a procedure step, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceGroup {
    Advies,
    Beslissing,
    Andere,
}

impl OccurrenceGroup {
    pub const ALL: [OccurrenceGroup; 3] = [
        OccurrenceGroup::Advies,
        OccurrenceGroup::Beslissing,
        OccurrenceGroup::Andere,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OccurrenceGroup::Advies => "advies",
            OccurrenceGroup::Beslissing => "beslissing",
            OccurrenceGroup::Andere => "andere",
        }
    }
}

/// Dated event in the case timeline ("gebeurtenis").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gebeurtenis {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub advies_vraag_gebeurtenis_uuid: Option<String>,
    #[serde(default)]
    pub gevraagd_aan: Option<String>,
    #[serde(default)]
    pub verantwoordelijke: Option<String>,
    #[serde(default)]
    pub gevraagd_door: Option<String>,
    #[serde(default)]
    pub aantal_adviezen: Option<Value>,
    #[serde(default)]
    pub aard_laatste_advies: Option<Value>,
    #[serde(default)]
    pub advies_vraag_datum: Option<Value>,
    #[serde(default)]
    pub datum_laatste_advies_verlening: Option<Value>,
    #[serde(default)]
    pub voorwaarden: Option<Value>,
}

impl Gebeurtenis {
    /// Path segment: `gevraagdAan`, falling back to `verantwoordelijke`.
    pub fn segment(&self) -> Option<&str> {
        self.gevraagd_aan
            .as_deref()
            .or(self.verantwoordelijke.as_deref())
    }

    /// Id of the content listing: `uuid`, falling back to
    /// `adviesVraagGebeurtenisUuid`.
    pub fn content_id(&self) -> Option<&str> {
        self.uuid
            .as_deref()
            .or(self.advies_vraag_gebeurtenis_uuid.as_deref())
    }

    pub fn is_advice_request(&self) -> bool {
        self.advies_vraag_gebeurtenis_uuid.is_some()
    }
}

/// Content section of an occurrence.
#[derive(Debug, Clone, Deserialize)]
pub struct GebeurtenisSectie {
    pub titel: String,
    #[serde(default)]
    pub bestanden: Vec<Bestand>,
    #[serde(default)]
    pub tabel: Option<Tabel>,
    #[serde(default)]
    pub datablokken: Vec<Datablok>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tabel {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub titel: Option<String>,
    #[serde(default)]
    pub kolom_namen: Vec<Cel>,
    #[serde(default)]
    pub rijen: Vec<Rij>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cel {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rij {
    #[serde(default)]
    pub data: Vec<Cel>,
}

/// Node of the case tree, dispatched exhaustively by the walker.
#[derive(Debug, Clone)]
pub enum GraphNode {
    Subject(Voorwerp),
    Component(Onderdeel),
    Stuk(Stuk),
    CaseDocument(DossierStuk),
    Occurrence(Gebeurtenis),
    ProcedureStep(ProcedureStap),
}

/// Renders loosely typed status fields the way they appear in the API.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("code") {
            Some(Value::String(code)) => code.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}
