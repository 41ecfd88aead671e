//! CLI integration tests

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../classifier-lib/tests/fixtures")
        .join(name)
}

fn penguin(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_penguin"))
        .args(args)
        .env_remove("PENGUIN_MODEL_PATH")
        .env_remove("PENGUIN_API_URL")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

const ADELIE: [&str; 14] = [
    "--bill-length-mm",
    "39.1",
    "--bill-depth-mm",
    "18.7",
    "--flipper-length-mm",
    "181",
    "--body-mass-g",
    "3750",
    "--year",
    "2007",
    "--sex",
    "male",
    "--island",
    "Biscoe",
];

#[test]
fn test_cli_help() {
    let output = penguin(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    for command in ["train", "classify", "predict", "schema"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

#[test]
fn test_cli_version() {
    let output = penguin(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("penguin"));
}

#[test]
fn test_predict_help_shows_api_url() {
    let output = penguin(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--api-url"));
    assert!(stdout.contains("--island"));
}

#[test]
fn test_schema_json() {
    let output = penguin(&["schema", "--format", "json"]);
    assert!(output.status.success());

    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["version"], 1);
    assert_eq!(schema["columns"].as_array().unwrap().len(), 10);
    assert_eq!(schema["columns"][5], "sex_female");
}

#[test]
fn test_classify_with_fixture_model() {
    let model = fixture("penguin_model.json");
    let model_arg = model.to_string_lossy().to_string();
    let mut args = vec!["classify", "--format", "json", "--show-features", "--model"];
    args.push(model_arg.as_str());
    args.extend_from_slice(&ADELIE);

    let output = penguin(&args);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["prediction"], 0);
    assert_eq!(result["species"], "Adelie");
    assert_eq!(
        result["features"],
        serde_json::json!([39.1, 18.7, 181.0, 3750.0, 2007.0, 0.0, 1.0, 1.0, 0.0, 0.0])
    );
}

#[test]
fn test_classify_unknown_island_fails() {
    let model = fixture("penguin_model.json");
    let model_arg = model.to_string_lossy().to_string();
    let mut args = vec!["classify", "--model", model_arg.as_str()];
    let mut measurements = ADELIE;
    measurements[13] = "Atlantis";
    args.extend_from_slice(&measurements);

    let output = penguin(&args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Atlantis"));
}

#[test]
fn test_train_writes_model() {
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("model.json");
    let output_arg = output_path.to_string_lossy().into_owned();
    let dataset = fixture("penguins_sample.csv").to_string_lossy().into_owned();

    let output = penguin(&[
        "train",
        "--format",
        "json",
        "--rounds",
        "20",
        "--dataset",
        dataset.as_str(),
        "--output",
        output_arg.as_str(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output_path.exists());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["num_trees"], 60);
    assert_eq!(report["dropped_rows"], 2);
}

#[test]
fn test_classify_missing_model_fails() {
    let mut args = vec!["classify", "--model", "/nonexistent/model.json"];
    args.extend_from_slice(&ADELIE);
    let output = penguin(&args);
    assert!(!output.status.success());
}
