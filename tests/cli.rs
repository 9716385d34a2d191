mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::{TestWorkspace, sample_csv};

#[test]
fn profile_command_writes_report_and_prints_path() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("orders.csv", &sample_csv(20));
    let output_dir = workspace.path().join("reports");

    Command::cargo_bin("csv-profiler")
        .expect("binary")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .assert()
        .success()
        .stdout(contains("orders_profile_report_").and(contains(".pdf")));

    let project_dir = output_dir.join("orders");
    let entries: Vec<_> = std::fs::read_dir(&project_dir)
        .expect("project dir")
        .map(|e| e.expect("entry").file_name().into_string().expect("name"))
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ends_with(".pdf"));
}

#[test]
fn unparseable_input_fails_with_a_parse_message() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("single.csv", "lonely\n1\n2\n");
    let output_dir = workspace.path().join("reports");

    Command::cargo_bin("csv-profiler")
        .expect("binary")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .assert()
        .failure()
        .stderr(contains("unable to parse CSV input"));
}

#[test]
fn custom_thresholds_are_accepted() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("tuned.csv", &sample_csv(15));
    let output_dir = workspace.path().join("reports");

    Command::cargo_bin("csv-profiler")
        .expect("binary")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output_dir)
        .arg("--correlation-threshold")
        .arg("0.9")
        .arg("--histogram-bins")
        .arg("10")
        .assert()
        .success();
}
