//! `inhoud.html`: a readable overview of the mirrored case.
//!
//! The walker returns a tree of [`ReportSection`]s in remote listing order;
//! rendering happens after traversal, so concurrent completion order never
//! shows up in the document.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::domain::{CaseId, LocalPath};
use crate::manifest::attribution;
use crate::model::{Bestand, ProjectHeader, join_dates, value_text};

#[derive(Debug, Clone, Default)]
pub struct ReportSection {
    pub class: &'static str,
    pub anchor: Option<String>,
    pub heading: String,
    pub fields: Vec<(String, String)>,
    pub text: Option<String>,
    pub table: Option<DataTable>,
    pub forms: Vec<FormBlock>,
    pub files: Vec<FileRow>,
    pub children: Vec<ReportSection>,
}

impl ReportSection {
    pub fn new(class: &'static str, heading: impl Into<String>) -> Self {
        Self {
            class,
            heading: heading.into(),
            ..Self::default()
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }
}

/// A mirrored file as shown in a section's file table.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub path: LocalPath,
    pub file: Bestand,
    /// Listing specific columns, shown between the name and the date.
    pub columns: Vec<(&'static str, String)>,
}

/// Submitted form data of a record, with the title of its form definition.
#[derive(Debug, Clone)]
pub struct FormBlock {
    pub anchor: String,
    pub block_id: String,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct DataTable {
    pub anchor: Option<String>,
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub case: CaseId,
    pub header: ProjectHeader,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

struct Html {
    out: String,
    depth: usize,
}

impl Html {
    fn new() -> Self {
        Self {
            out: String::from("<!doctype html>\n"),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
    }

    fn attrs(attrs: &[(&str, &str)]) -> String {
        attrs
            .iter()
            .map(|(key, value)| format!(" {key}=\"{}\"", escape(value)))
            .collect()
    }

    fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.indent();
        let _ = writeln!(
            self.out,
            "<{name}{}>{}</{name}>",
            Self::attrs(attrs),
            escape(text)
        );
    }

    fn raw_leaf(&mut self, name: &str, attrs: &[(&str, &str)], html: &str) {
        self.indent();
        let _ = writeln!(self.out, "<{name}{}>{html}</{name}>", Self::attrs(attrs));
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.indent();
        let _ = writeln!(self.out, "<{name}{}>", Self::attrs(attrs));
        self.depth += 1;
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.out, "</{name}>");
    }

    fn definitions(&mut self, fields: &[(String, String)]) {
        if fields.is_empty() {
            return;
        }
        self.open("dl", &[]);
        for (key, value) in fields {
            self.leaf("dt", &[], key);
            self.leaf("dd", &[], value);
        }
        self.close("dl");
    }

    fn table(&mut self, table: &DataTable) {
        match table.anchor.as_deref() {
            Some(anchor) => self.open("table", &[("id", anchor)]),
            None => self.open("table", &[]),
        }
        if let Some(caption) = &table.caption {
            self.leaf("caption", &[], caption);
        }
        self.open("thead", &[]);
        self.open("tr", &[]);
        for header in &table.headers {
            self.leaf("th", &[], header);
        }
        self.close("tr");
        self.close("thead");
        self.open("tbody", &[]);
        for row in &table.rows {
            self.open("tr", &[]);
            for cell in row {
                self.leaf("td", &[], cell);
            }
            self.close("tr");
        }
        self.close("tbody");
        self.close("table");
    }

    fn form(&mut self, form: &FormBlock) {
        self.open("div", &[("id", form.anchor.as_str()), ("class", "formio")]);
        let mut fields = vec![("blok".to_string(), form.block_id.clone())];
        if let Some(title) = &form.title {
            fields.push(("formulier".to_string(), title.clone()));
        }
        self.definitions(&fields);
        if !form.content.is_empty() {
            self.leaf("pre", &[], &form.content);
        }
        self.close("div");
    }

    fn files(&mut self, files: &[FileRow]) {
        let Some(first) = files.first() else {
            return;
        };
        self.open("table", &[]);
        self.open("thead", &[]);
        self.open("tr", &[]);
        self.leaf("th", &[], "BestandsNaam");
        for (name, _) in &first.columns {
            self.leaf("th", &[], name);
        }
        self.leaf("th", &[], "Datum");
        self.leaf("th", &[], "Grootte");
        self.close("tr");
        self.close("thead");
        self.open("tbody", &[]);
        for row in files {
            self.open("tr", &[]);
            let href = row.path.within_case();
            let link = format!(
                "<a href=\"{}\" id=\"{}\">{}</a>",
                escape(&href),
                escape(&row.file.uuid),
                escape(&row.file.bestandsnaam)
            );
            self.raw_leaf("td", &[], &link);
            for (_, value) in &row.columns {
                self.leaf("td", &[], value);
            }
            self.leaf("td", &[], &join_dates(&row.file.datum_opladen, "-"));
            let size = row.file.grootte.map(|size| size.to_string()).unwrap_or_default();
            self.leaf("td", &[], &size);
            self.close("tr");
        }
        self.close("tbody");
        self.close("table");
    }

    fn section(&mut self, section: &ReportSection, level: usize) {
        self.open("section", &[("class", section.class)]);
        let heading = format!("h{}", level.clamp(1, 6));
        match &section.anchor {
            Some(anchor) => self.leaf(&heading, &[("id", anchor.as_str())], &section.heading),
            None => self.leaf(&heading, &[], &section.heading),
        }
        if let Some(text) = &section.text {
            self.leaf("pre", &[], text);
        }
        self.definitions(&section.fields);
        if let Some(table) = &section.table {
            self.table(table);
        }
        for form in &section.forms {
            self.form(form);
        }
        self.files(&section.files);
        for child in &section.children {
            self.section(child, level + 1);
        }
        self.close("section");
    }
}

pub fn render(report: &CaseReport) -> String {
    let title = format!("{}: {}", report.header.projectnummer, report.header.projectnaam);
    let mut html = Html::new();
    html.open("html", &[]);
    html.open("head", &[]);
    html.raw_leaf("meta", &[("charset", "utf-8")], "");
    html.leaf("title", &[], &title);
    html.close("head");

    html.open("body", &[]);
    html.open("section", &[("class", "project")]);
    html.leaf("h1", &[("id", report.header.uuid.as_str())], &title);
    let status = |value: &Option<serde_json::Value>| {
        value.as_ref().map(value_text).unwrap_or_default()
    };
    html.definitions(&[
        ("status".to_string(), status(&report.header.beroep_of_bezwaar)),
        ("toestand".to_string(), status(&report.header.toestand)),
        ("gegenereerd".to_string(), report.generated_at.to_rfc3339()),
    ]);
    html.close("section");

    for section in &report.sections {
        html.section(section, 1);
    }

    html.open("footer", &[]);
    html.leaf("p", &[], &attribution(&report.case, report.generated_at));
    html.close("footer");
    html.close("body");
    html.close("html");
    html.out
}
