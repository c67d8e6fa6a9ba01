mod common;

use std::fs;

use assert_matches::assert_matches;
use chrono::DateTime;
use serde_json::json;

use common::{CASE, SAMPLE_FILES, bestand, sample_case, temp_store};
use omv_mirror::app::{App, SyncOptions};
use omv_mirror::domain::CaseId;
use omv_mirror::error::MirrorError;

fn case() -> CaseId {
    CASE.parse().unwrap()
}

fn generated_at() -> chrono::DateTime<chrono::Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

#[tokio::test]
async fn mirrors_every_file_at_its_derived_path() {
    let (_temp, store) = temp_store();
    let app = App::new(store.clone(), sample_case());

    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    assert_eq!(result.files, SAMPLE_FILES.len());
    assert_eq!(result.downloaded, SAMPLE_FILES.len());
    assert_eq!(result.up_to_date, 0);
    for path in SAMPLE_FILES {
        assert!(store.root().join(path).is_file(), "missing {path}");
    }
    assert_eq!(
        fs::read(store.root().join("OMV_2023000001/Kerkstraat 1/grondplan.pdf")).unwrap(),
        b"plan"
    );
}

#[tokio::test]
async fn manifest_is_sorted_with_header_and_footer() {
    let (_temp, store) = temp_store();
    let app = App::new(store.clone(), sample_case());
    app.sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    let manifest = fs::read_to_string(store.manifest_path(&case())).unwrap();
    let mut lines = manifest.lines();
    assert_eq!(lines.next(), Some("# OMV_2023000001: Verbouwing woning"));
    let footer = lines.next().unwrap();
    assert!(footer.starts_with("## automatisch gegenereerd met omv-mirror"));
    assert!(footer.contains("2023-11-14T22:13:20+00:00"));
    assert_eq!(lines.next(), Some(""));
    assert_eq!(lines.next(), Some("## Bestanden:"));

    let entries = lines.collect::<Vec<_>>();
    let paths = entries
        .iter()
        .map(|line| line.split(" (").next().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(paths, SAMPLE_FILES.to_vec());
    assert!(entries.contains(
        &"OMV_2023000001/Kerkstraat 1/grondplan.pdf (2023/5/12): "
    ));
    assert!(entries.contains(
        &"OMV_2023000001/Kerkstraat 1/ATTEST/attest.pdf (2023-05-12): beschrijving attest.pdf"
    ));
}

#[tokio::test]
async fn second_run_transfers_nothing() {
    let (_temp, store) = temp_store();
    let app = App::new(store, sample_case());
    app.sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();
    app.client().reset_counters();

    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    assert!(app.client().downloads().is_empty());
    assert_eq!(result.downloaded, 0);
    assert_eq!(result.up_to_date, SAMPLE_FILES.len());
    assert!(!app.client().requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn corrupted_file_is_fetched_again() {
    let (_temp, store) = temp_store();
    let app = App::new(store.clone(), sample_case());
    app.sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();
    app.client().reset_counters();

    let corrupted = store
        .root()
        .join("OMV_2023000001/Kerkstraat 1/BOUWEN/NOTA/nota.pdf");
    let mut bytes = fs::read(&corrupted).unwrap();
    bytes[0] ^= 0xff;
    fs::write(&corrupted, bytes).unwrap();

    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    assert_eq!(app.client().downloads(), vec!["f-nota".to_string()]);
    assert_eq!(result.downloaded, 1);
    assert_eq!(fs::read(&corrupted).unwrap(), b"nota");
}

#[tokio::test]
async fn failed_download_aborts_without_manifest() {
    let (_temp, store) = temp_store();
    let failing = App::new(store.clone(), sample_case().fail_download("f-attest"));

    let err = failing
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap_err();

    assert_matches!(err, MirrorError::Status { status: 503, .. });
    assert!(!store.manifest_path(&case()).as_std_path().exists());
    assert!(!store.report_path(&case()).as_std_path().exists());

    let expected: [(&str, &str, &[u8]); 5] = [
        ("f-plan", "OMV_2023000001/Kerkstraat 1/grondplan.pdf", b"plan"),
        ("f-foto", "OMV_2023000001/Kerkstraat 1/gevel.jpg", b"foto"),
        ("f-nota", "OMV_2023000001/Kerkstraat 1/BOUWEN/NOTA/nota.pdf", b"nota"),
        (
            "f-bijlage",
            "OMV_2023000001/Kerkstraat 1/BOUWEN/BIJLAGEN/BIJLAGE_A/bijlage.pdf",
            b"bijlage",
        ),
        (
            "f-advies",
            "OMV_2023000001/ADVIESFASE/advies/Brandweer/Advies/advies.pdf",
            b"advies",
        ),
    ];
    let completed = expected
        .iter()
        .filter(|(_, path, content)| {
            fs::read(store.root().join(path)).is_ok_and(|bytes| bytes == *content)
        })
        .map(|(id, _, _)| id.to_string())
        .collect::<Vec<_>>();
    assert!(!completed.is_empty(), "no sibling finished before the failure");

    let retry = App::new(store.clone(), sample_case());
    retry
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    let downloaded = retry.client().downloads();
    assert!(downloaded.contains(&"f-attest".to_string()));
    for id in &completed {
        assert!(!downloaded.contains(id), "{id} was fetched twice");
    }
    assert!(store.manifest_path(&case()).as_std_path().exists());
}

#[tokio::test]
async fn single_permit_gate_still_completes() {
    let (_temp, store) = temp_store();
    let app = App::new(store, sample_case());
    let options = SyncOptions {
        concurrency: 1,
        ..SyncOptions::default()
    };

    let result = app.sync(&case(), &options, generated_at()).await.unwrap();
    assert_eq!(result.files, SAMPLE_FILES.len());
}

#[tokio::test]
async fn report_links_mirrored_files() {
    let (_temp, store) = temp_store();
    let app = App::new(store.clone(), sample_case());
    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    assert!(result.report_path.is_some());
    let html = fs::read_to_string(store.report_path(&case())).unwrap();
    assert!(html.contains("<title>OMV_2023000001: Verbouwing woning</title>"));
    assert!(html.contains("href=\"Kerkstraat 1/grondplan.pdf\""));
    assert!(html.contains("<td>GRONDPLAN</td>"));
    assert!(html.contains("<caption>Voorwaarden</caption>"));
    assert!(html.contains("<dd>ja</dd>"));
    assert!(html.contains("Brandweer"));
}

#[tokio::test]
async fn report_can_be_disabled() {
    let (_temp, store) = temp_store();
    let app = App::new(store.clone(), sample_case());
    let options = SyncOptions {
        report: false,
        ..SyncOptions::default()
    };

    let result = app.sync(&case(), &options, generated_at()).await.unwrap();
    assert_eq!(result.report_path, None);
    assert!(!store.report_path(&case()).as_std_path().exists());
    assert!(store.manifest_path(&case()).as_std_path().exists());
}

#[tokio::test]
async fn stuk_with_details_is_unimplemented() {
    let (_temp, store) = temp_store();
    let client = sample_case().with(
        "inzage/dossier-onderdelen/o-1/details",
        json!({"details": [{"uuid": "s-9", "details": [{"x": 1}]}]}),
    );
    let app = App::new(store.clone(), client);

    let err = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap_err();

    assert_matches!(err, MirrorError::UnimplementedNode(message) if message.contains("s-9"));
    assert!(!store.manifest_path(&case()).as_std_path().exists());
}

#[tokio::test]
async fn occurrence_without_segment_is_unimplemented() {
    let (_temp, store) = temp_store();
    let client = sample_case().with(
        "inzage/projectfasen/st-1/andere-gebeurtenissen",
        json!({"content": [{"uuid": "g-2"}]}),
    );
    let app = App::new(store, client);

    let err = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap_err();
    assert_matches!(err, MirrorError::UnimplementedNode(_));
}

#[tokio::test]
async fn colliding_paths_are_rejected() {
    let (_temp, store) = temp_store();
    let client = sample_case()
        .with(
            "inzage/dossierstukken/d-3/bestanden",
            json!({"content": [
                bestand("f-attest", "attest.pdf", b"attest"),
                bestand("f-attest-2", "attest.pdf", b"ander attest")
            ]}),
        )
        .file("f-attest-2", b"ander attest");
    let app = App::new(store, client);

    let err = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap_err();
    assert_matches!(err, MirrorError::PathCollision(path) if path.ends_with("ATTEST/attest.pdf"));
}

#[tokio::test]
async fn missing_remote_record_propagates_fetch_error() {
    let (_temp, store) = temp_store();
    let mut client = sample_case();
    client.json.remove("inzage/voorwerpen/v-1/dossierstukken");
    let app = App::new(store, client);

    let err = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap_err();
    assert_matches!(err, MirrorError::Status { status: 404, .. });
}

#[tokio::test]
async fn empty_nested_stukken_are_leaves() {
    let (_temp, store) = temp_store();
    let client = sample_case().with(
        "inzage/projecten/p-1/procedure",
        json!([{
            "uuid": "st-1",
            "inhoud": {"aard": {"code": "ADVIESFASE"}},
            "subOnderdelen": [{"uuid": "s-7", "titel": "Leeg", "subOnderdelen": []}]
        }]),
    );
    let app = App::new(store.clone(), client);

    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();

    assert_eq!(result.files, SAMPLE_FILES.len());
    let html = fs::read_to_string(store.report_path(&case())).unwrap();
    assert!(html.contains("id=\"s-7\">Leeg<"));
}

#[tokio::test]
async fn form_blocks_appear_in_report() {
    let (_temp, store) = temp_store();
    let client = sample_case()
        .with(
            "inzage/voorwerpen/v-1/dossierstukken",
            json!([{
                "uuid": "d-3",
                "dossierstukType": {"code": "ATTEST"},
                "inzageDatablokResources": [{
                    "uuid": "db-1",
                    "blokId": "HOOFDGEBOUW",
                    "datablokinhoud": "{\"bouwlagen\":2}"
                }]
            }]),
        )
        .with(
            "inzage/gebeurtenissen/g-1",
            json!([{
                "titel": "Advies",
                "bestanden": [bestand("f-advies", "advies.pdf", b"advies")],
                "datablokken": [{"uuid": "db-2", "blokId": 7, "datablokinhoud": null}]
            }]),
        )
        .with(
            "parameters/datablokDefinitie-form-io-formulier/HOOFDGEBOUW",
            json!({"title": "Hoofdgebouw", "components": []}),
        )
        .with(
            "parameters/datablokDefinitie-form-io-formulier/7",
            json!({"components": []}),
        );
    let app = App::new(store.clone(), client);

    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();
    assert_eq!(result.files, SAMPLE_FILES.len());

    let html = fs::read_to_string(store.report_path(&case())).unwrap();
    assert!(html.contains("<div id=\"db-1\" class=\"formio\">"));
    assert!(html.contains("<dd>HOOFDGEBOUW</dd>"));
    assert!(html.contains("<dd>Hoofdgebouw</dd>"));
    assert!(html.contains("&quot;bouwlagen&quot;: 2"));
    assert!(html.contains("<div id=\"db-2\" class=\"formio\">"));
    assert!(html.contains("<dd>7</dd>"));
}

#[tokio::test]
async fn missing_form_definition_fails_the_run() {
    let (_temp, store) = temp_store();
    let client = sample_case().with(
        "inzage/voorwerpen/v-1/dossierstukken",
        json!([{
            "uuid": "d-3",
            "dossierstukType": {"code": "ATTEST"},
            "inzageDatablokResources": [{"uuid": "db-1", "blokId": "ONBEKEND"}]
        }]),
    );
    let app = App::new(store.clone(), client);

    let err = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap_err();
    assert_matches!(
        err,
        MirrorError::Status { url, status: 404, .. } if url.ends_with("/ONBEKEND")
    );
    assert!(!store.report_path(&case()).as_std_path().exists());
}

#[tokio::test]
async fn mismatched_download_is_counted_and_retried() {
    let (_temp, store) = temp_store();
    let app = App::new(store.clone(), sample_case().file("f-attest", b"vervalst"));

    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();
    assert_eq!(result.mismatched, 1);
    assert_eq!(result.downloaded, SAMPLE_FILES.len());
    assert_eq!(result.files, SAMPLE_FILES.len());

    app.client().reset_counters();
    let result = app
        .sync(&case(), &SyncOptions::default(), generated_at())
        .await
        .unwrap();
    assert_eq!(app.client().downloads(), vec!["f-attest".to_string()]);
    assert_eq!(result.mismatched, 1);
    assert_eq!(result.up_to_date, SAMPLE_FILES.len() - 1);
}
