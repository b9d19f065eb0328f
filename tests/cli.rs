mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::{MISSING_DISTRIBUTOR_CSV, TestWorkspace};

fn sales_report() -> Command {
    Command::cargo_bin("sales-report").expect("binary exists")
}

#[test]
fn preview_prints_raw_headers_and_rows() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    sales_report()
        .args(["preview", "-i", input.to_str().unwrap(), "--rows", "1"])
        .assert()
        .success()
        .stdout(contains("Produit"))
        .stdout(contains("05/01/2024"))
        .stdout(contains("06/01/2024").not());
}

#[test]
fn detect_reports_and_saves_mapping() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("partial.csv", MISSING_DISTRIBUTOR_CSV);
    let mapping = workspace.path().join("mapping.yml");
    sales_report()
        .args([
            "detect",
            "-i",
            input.to_str().unwrap(),
            "-o",
            mapping.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("detected"))
        .stdout(contains("unresolved"));

    let saved = fs::read_to_string(&mapping).expect("mapping written");
    assert!(saved.contains("revenue: CA"), "{saved}");
    assert!(!saved.contains("distributor"), "{saved}");
}

#[test]
fn summary_prints_scenario_kpis() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    sales_report()
        .args(["summary", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Period : 2024-01-05 to 2024-01-06"))
        .stdout(contains("Total revenue : 300.00 TND"))
        .stdout(contains("Total margin : 30.00 TND"))
        .stdout(contains("Contract count : 2"))
        .stdout(contains("Top product : Y"));
}

#[test]
fn summary_restricted_to_one_day() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    sales_report()
        .args([
            "summary",
            "-i",
            input.to_str().unwrap(),
            "--start",
            "2024-01-05",
            "--end",
            "2024-01-05",
            "--currency",
            "EUR",
        ])
        .assert()
        .success()
        .stdout(contains("Total revenue : 100.00 EUR"))
        .stdout(contains("Contract count : 1"))
        .stdout(contains("Top product : X"));
}

#[test]
fn summary_json_is_machine_readable() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    let output = sales_report()
        .args(["summary", "-i", input.to_str().unwrap(), "--json"])
        .output()
        .expect("run summary");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["kpis"]["total_revenue"], 300.0);
    assert_eq!(json["kpis"]["top_product"], "Y");
    assert_eq!(json["top_distributors"][0]["label"], "D2");
}

#[test]
fn unresolved_field_fails_without_confirmation() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("partial.csv", MISSING_DISTRIBUTOR_CSV);
    sales_report()
        .args(["summary", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("error:"))
        .stderr(contains("--map distributor=<column>"));
}

#[test]
fn placeholders_can_be_accepted_or_overridden() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("partial.csv", MISSING_DISTRIBUTOR_CSV);
    sales_report()
        .args(["summary", "-i", input.to_str().unwrap(), "--accept-placeholders"])
        .assert()
        .success()
        .stdout(contains("Contract count : 1"));
    sales_report()
        .args([
            "summary",
            "-i",
            input.to_str().unwrap(),
            "--map",
            "distributor=Produit",
        ])
        .assert()
        .success()
        .stdout(contains("Top product : X"));
}

#[test]
fn override_to_missing_column_is_a_mapping_error() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    sales_report()
        .args(["summary", "-i", input.to_str().unwrap(), "--map", "margin=Gain"])
        .assert()
        .failure()
        .stderr(contains("Column 'Gain'"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.json", "{}");
    sales_report()
        .args(["preview", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("unsupported file extension 'json'"));
}

#[test]
fn xlsx_export_can_be_read_back() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    let workbook = workspace.path().join("out.xlsx");
    sales_report()
        .args([
            "export",
            "-i",
            input.to_str().unwrap(),
            "--format",
            "xlsx",
            "-o",
            workbook.to_str().unwrap(),
        ])
        .assert()
        .success();

    sales_report()
        .args([
            "summary",
            "-i",
            workbook.to_str().unwrap(),
            "--map",
            "revenue=Revenue",
            "--map",
            "margin=Margin",
            "--map",
            "product=Product",
            "--map",
            "insurer_share=InsurerShare",
            "--map",
            "distributor=Distributor",
        ])
        .assert()
        .success()
        .stdout(contains("Total revenue : 300.00 TND"))
        .stdout(contains("Period : 2024-01-05 to 2024-01-06"));
}

#[test]
fn empty_selection_exports_pdf_and_deck() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    for (format, name, magic) in [
        ("pdf", "report.pdf", b"%PDF".as_slice()),
        ("pptx", "report.pptx", b"PK".as_slice()),
    ] {
        let target = workspace.path().join(name);
        sales_report()
            .args([
                "export",
                "-i",
                input.to_str().unwrap(),
                "--product",
                "missing",
                "--format",
                format,
                "-o",
                target.to_str().unwrap(),
            ])
            .assert()
            .success();
        let bytes = fs::read(&target).expect("artifact written");
        assert!(bytes.starts_with(magic), "{format} artifact");
    }
}

#[test]
fn export_defaults_to_fixed_file_name() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    sales_report()
        .current_dir(workspace.path())
        .args(["export", "-i", input.to_str().unwrap(), "--format", "xlsx"])
        .assert()
        .success();
    assert!(workspace.path().join("sales_analysis.xlsx").exists());
}

#[test]
fn charts_for_empty_selection_are_placeholders() {
    let workspace = TestWorkspace::new();
    let input = workspace.scenario();
    let out_dir = workspace.path().join("charts");
    sales_report()
        .args([
            "charts",
            "-i",
            input.to_str().unwrap(),
            "--search",
            "zzz",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
        .assert()
        .success();
    let mut names = fs::read_dir(&out_dir)
        .expect("chart dir")
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names.len(), 7);
    assert!(names.contains(&"daily_revenue.png".to_string()));
    assert!(names.contains(&"margin_distribution.png".to_string()));
}
