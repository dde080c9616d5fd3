use assert_cmd::Command;
use predicates::prelude::*;

const VALID: &str = "tests/fixtures/sample_valid.records.json";
const INVALID: &str = "tests/fixtures/sample_invalid.records.json";
const WARNING: &str = "tests/fixtures/sample_warning.records.json";

fn cmd() -> Command {
    Command::cargo_bin("coco-records").unwrap()
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should be JSON")
}

#[test]
fn runs() {
    cmd().assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = cmd();
    cmd.arg("-V");
    cmd.assert().success().stdout("coco-records 0.1.0\n");
}

// Convert subcommand tests

#[test]
fn convert_emits_all_sections() {
    let json = stdout_json(cmd().args(["convert", VALID]));

    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    assert_eq!(images[0]["file_name"], "a.jpg");
    assert_eq!(images[0]["width"], 10);
    assert_eq!(images[0]["height"], 20);

    let anns = json["annotations"].as_array().unwrap();
    assert_eq!(anns.len(), 3);
    assert_eq!(anns[0]["bbox"], serde_json::json!([1.0, 1.0, 2.0, 2.0]));
    assert_eq!(anns[0]["area"], 4.0);
    let ids: Vec<_> = anns.iter().map(|a| a["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(anns[1]["segmentation"].is_array());
    assert_eq!(anns[2]["segmentation"]["size"], serde_json::json!([8, 8]));

    assert_eq!(json["categories"], serde_json::json!([{"id": 1}, {"id": 3}]));
}

#[test]
fn convert_respects_section_flags() {
    let json = stdout_json(cmd().args(["convert", VALID, "--no-images", "--no-annotations"]));
    assert!(json.get("images").is_none());
    assert!(json.get("annotations").is_none());
    assert_eq!(json["categories"], serde_json::json!([]));

    let json = stdout_json(cmd().args(["convert", VALID, "--no-images"]));
    assert_eq!(json["categories"].as_array().unwrap().len(), 2);
}

#[test]
fn convert_preds_emits_annotations_only() {
    let json = stdout_json(cmd().args(["convert", VALID, "--preds"]));
    assert!(json.get("images").is_none());
    assert!(json.get("categories").is_none());
    assert_eq!(json["annotations"].as_array().unwrap().len(), 3);
}

#[test]
fn convert_inconsistent_records_fails() {
    cmd()
        .args(["convert", INVALID])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mismatched length"))
        .stderr(predicate::str::contains("bboxes: 1, labels: 2"));
}

#[test]
fn convert_nonexistent_file_fails() {
    cmd()
        .args(["convert", "nonexistent_file.json"])
        .assert()
        .failure();
}

#[test]
fn convert_malformed_json_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "[{\"imageid\": }]").unwrap();

    cmd()
        .arg("convert")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse records JSON"));
}

// Validate subcommand tests

#[test]
fn validate_valid_records_succeeds() {
    cmd()
        .args(["validate", VALID])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn validate_invalid_records_fails() {
    cmd()
        .args(["validate", INVALID])
        .assert()
        .failure()
        .stdout(predicate::str::contains("error(s)"))
        .stdout(predicate::str::contains("DuplicateImageId"))
        .stdout(predicate::str::contains("AnnotationLengthMismatch"))
        .stdout(predicate::str::contains("InvalidBBoxOrdering"))
        .stdout(predicate::str::contains("InvalidImageDimensions"));
}

#[test]
fn validate_warnings_pass_unless_strict() {
    cmd()
        .args(["validate", WARNING])
        .assert()
        .success()
        .stdout(predicate::str::contains("BBoxOutOfBounds"));

    cmd()
        .args(["validate", WARNING, "--strict"])
        .assert()
        .failure();
}

#[test]
fn validate_json_output_format() {
    cmd()
        .args(["validate", VALID, "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"error_count\": 0"))
        .stdout(predicate::str::contains("\"warning_count\": 0"));
}

#[test]
fn validate_unknown_output_format_fails() {
    cmd()
        .args(["validate", VALID, "--output", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported format"));
}

// Split subcommand tests

#[test]
fn split_is_reproducible_with_seed() {
    let first = stdout_json(cmd().args(["split", VALID, "--ratios", "0.7,0.3", "--seed", "7"]));
    let second = stdout_json(cmd().args(["split", VALID, "--ratios", "0.7,0.3", "--seed", "7"]));
    assert_eq!(first, second);

    let groups = first.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    let mut all: Vec<u64> = groups
        .iter()
        .flat_map(|g| g.as_array().unwrap().iter().map(|id| id.as_u64().unwrap()))
        .collect();
    all.sort();
    assert_eq!(all, vec![1, 2, 3]);
}

#[test]
fn split_rejects_bad_ratios() {
    cmd()
        .args(["split", VALID, "--ratios", "0.5,0.2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sum to 1"));
}
