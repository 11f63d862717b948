mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("tilewatch 0.1.0\n");
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("watch").and(predicate::str::contains("detect")));
}

#[test]
fn detect_without_backend_fails() {
    let temp = tempfile::tempdir().unwrap();
    let image = temp.path().join("a.png");
    common::write_png(&image, 10, 10);

    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.env_remove("TILEWATCH_BACKEND_CMD")
        .env_remove("TILEWATCH_CONFIG")
        .arg("detect")
        .arg(&image)
        .arg("--output")
        .arg(temp.path().join("out"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No inference backend configured"));
}

#[test]
fn detect_rejects_non_image() {
    let temp = tempfile::tempdir().unwrap();
    let report = temp.path().join("report.pdf");
    std::fs::write(&report, b"%PDF").unwrap();

    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.args(["detect", "--backend-cmd", "true"]).arg(&report);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn detect_rejects_bad_overlap() {
    let temp = tempfile::tempdir().unwrap();
    let image = temp.path().join("a.png");
    common::write_png(&image, 10, 10);

    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.args(["detect", "--backend-cmd", "true", "--overlap-portion", "1.0"])
        .arg(&image);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("overlap_portion"));
}

#[cfg(unix)]
#[test]
fn detect_runs_command_backend_per_tile() {
    let temp = tempfile::tempdir().unwrap();
    let image = temp.path().join("scan.png");
    let output = temp.path().join("out");
    common::write_png(&image, 1000, 700);

    let script = r#"cat > /dev/null; echo '[{"bbox": [1, 2, 3, 4], "score": 0.9, "pred_class": 2}, {"bbox": [0, 0, 1, 1], "score": 0.1, "pred_class": 5}]'"#;

    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.arg("detect")
        .arg(&image)
        .arg("--output")
        .arg(&output)
        .args(["--backend-cmd", "sh", "--backend-arg", "-c", "--backend-arg", script]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 completed, 0 failed"));

    let written: Vec<tilewatch::detection::Detection<tilewatch::detection::Global>> =
        tilewatch::detection::io_json::read_detections_json(&output.join("scan.json")).unwrap();
    assert_eq!(written.len(), 6, "low-score detections are filtered per tile");
    assert_eq!(written[2].bbox.to_array(), [361.0, 2.0, 363.0, 4.0]);
}

#[cfg(unix)]
#[test]
fn detect_directory_reports_failures() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("in");
    common::write_png(&input.join("good.png"), 20, 20);
    std::fs::write(input.join("bad.png"), b"garbage").unwrap();

    let mut cmd = Command::cargo_bin("tilewatch").unwrap();
    cmd.arg("detect")
        .arg(&input)
        .arg("--output")
        .arg(temp.path().join("out"))
        .args(["--backend-cmd", "sh", "--backend-arg", "-c", "--backend-arg", "cat > /dev/null; echo '[]'"]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("1 completed, 1 failed"))
        .stderr(predicate::str::contains("1 of 2 image(s) failed"));

    assert!(temp.path().join("out").join("good.json").exists());
}
