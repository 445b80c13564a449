use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const BRANCH: &str = r#"{
    "DisplayName": "Branch goods",
    "List": [
        { "Wagon": "GWR 57xx/pannier.eng", "UiD": 10 },
        { "Wagon": "GWR Vans/van.wag", "Count": 2 }
    ]
}"#;

const RATINGS: &str = r#"
- vehicle: pannier.eng
  system: automatic_vacuum
  max_application_rate_psi_s: 2.0
  max_release_rate_psi_s: 2.0
  cylinder_volume_ft3: 2.0
  pipe_volume_ft3: 1.8
  max_cylinder_pressure: 21.0
  pressure_band: 21.0
  max_brake_force_n: 40000
- vehicle: van.wag
  system: automatic_vacuum
  max_application_rate_psi_s: 2.0
  max_release_rate_psi_s: 2.0
  cylinder_volume_ft3: 1.8
  pipe_volume_ft3: 1.5
  max_cylinder_pressure: 21.0
  pressure_band: 21.0
  max_brake_force_n: 20000
  max_handbrake_force_n: 10000
"#;

const LOCOMOTIVES: &str = r#"
- vehicle: pannier.eng
  charging_rate_psi_s: 1.0
  service_time_factor_s: 10.0
  full_service_reduction: 10.0
"#;

const SCENARIO: &str = r#"
content = "content"
consist = "branch"
ratings = "ratings.yaml"
locomotives = "locomotives.yaml"
tick_s = 0.5
duration_s = 10.0

[[schedule]]
at_s = 1.0
controller = "apply"
"#;

fn write_fixture(root: &Path) {
    let consists = root.join("content").join("trains").join("consists");
    fs::create_dir_all(&consists).expect("consists dir");
    fs::write(consists.join("branch.consist-or"), BRANCH).expect("consist");
    fs::write(root.join("ratings.yaml"), RATINGS).expect("ratings");
    fs::write(root.join("locomotives.yaml"), LOCOMOTIVES).expect("locomotives");
    fs::write(root.join("scenario.toml"), SCENARIO).expect("scenario");
}

#[test]
fn consists_lists_and_resolves() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_fixture(tmp.path());
    let content = tmp.path().join("content");

    Command::cargo_bin("consists")
        .expect("binary exists")
        .arg("--content")
        .arg(&content)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("branch.consist-or"));

    let output = Command::cargo_bin("consists")
        .expect("binary exists")
        .arg("--content")
        .arg(&content)
        .args(["resolve", "branch", "--reverse"])
        .output()
        .expect("run consists");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("1\tflipped\t"));
    assert!(lines[2].starts_with("10\tflipped\t"));
    assert!(lines[2].ends_with("pannier.eng"));
}

#[test]
fn consists_reports_lead_choices_and_rejects_unknown_leads() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_fixture(tmp.path());
    let content = tmp.path().join("content");

    Command::cargo_bin("consists")
        .expect("binary exists")
        .arg("--content")
        .arg(&content)
        .args(["choices", "branch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pannier.eng"));

    Command::cargo_bin("consists")
        .expect("binary exists")
        .arg("--content")
        .arg(&content)
        .args(["resolve", "branch", "--prefer", "bogus/path.eng"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be led by bogus/path.eng"));
}

#[test]
fn brake_sim_writes_trace_and_summary() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_fixture(tmp.path());
    let trace = tmp.path().join("out").join("trace.csv");
    let summary_base = tmp.path().join("out").join("run.csv");

    Command::cargo_bin("brake_sim")
        .expect("binary exists")
        .arg(tmp.path().join("scenario.toml"))
        .arg("--csv")
        .arg(&trace)
        .arg("--summary")
        .arg(&summary_base)
        .assert()
        .success()
        .stdout(predicate::str::contains("VacRes"))
        .stdout(predicate::str::contains("Train Pipe"));

    let mut reader = csv::Reader::from_path(&trace).expect("trace csv");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(headers.len(), 11);
    assert_eq!(&headers[0], "time_s");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    // 20 ticks of three cars
    assert_eq!(rows.len(), 60);
    let last = &rows[rows.len() - 1];
    assert_eq!(&last[1], "van#1");
    assert_eq!(&last[3], "apply");
    let retard: f64 = last[8].parse().expect("retard force");
    assert!(retard > 0.0);

    let summary: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(tmp.path().join("out").join("run_summary.json")).expect("summary"),
    )
    .expect("summary json");
    assert_eq!(summary["consist"], "Branch goods");
    assert_eq!(summary["lead"], "pannier#10");
    assert_eq!(summary["cars"].as_array().map(Vec::len), Some(3));
}

#[test]
fn brake_sim_rejects_missing_scenarios() {
    let tmp = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("brake_sim")
        .expect("binary exists")
        .arg(tmp.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading scenario"));
}
