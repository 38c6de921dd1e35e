//! CLI tests for cp-core resolution commands.
//!
//! These tests verify payloads on stdout, structured errors on stderr, and
//! exit codes for each failure category.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Get a Command for cp-core binary.
fn cp_core() -> Command {
    let mut cmd = Command::cargo_bin("cp-core").expect("cp-core binary should exist");
    cmd.env_remove("CP_LOG")
        .env_remove("CP_LOG_FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_options(dir: &Path, options: &Value) -> String {
    let path = dir.join("options.json");
    fs::write(&path, serde_json::to_string(options).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

fn regression_options(dir: &Path) -> Value {
    json!({
        "data_path": dir.join("data.csv"),
        "dataset_type": "regression",
        "save_dir": dir.join("out"),
        "no_cuda": true,
    })
}

// ============================================================================
// Successful Resolution
// ============================================================================

mod resolve_ok {
    use super::*;

    #[test]
    fn train_prints_resolved_json() {
        let dir = TempDir::new().unwrap();
        let options = write_options(dir.path(), &regression_options(dir.path()));

        let output = cp_core()
            .args(["train", "--options", &options])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let config: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(config["metric"], "rmse");
        assert_eq!(config["minimize_score"], true);
        assert_eq!(config["cuda_enabled"], false);
        assert_eq!(config["num_lr_groups"], 1);
        assert!(config.get("no_cuda").is_none());
        assert!(config.get("lr_scaler").is_none());
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn train_reads_options_from_stdin() {
        let dir = TempDir::new().unwrap();
        let options = regression_options(dir.path());

        cp_core()
            .args(["-f", "compact", "train", "--options", "-"])
            .write_stdin(serde_json::to_string(&options).unwrap())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"dataset_type\":\"regression\""));
    }

    #[test]
    fn summary_format_is_one_line() {
        let dir = TempDir::new().unwrap();
        let mut options = regression_options(dir.path());
        options["dataset_type"] = json!("classification");
        let options = write_options(dir.path(), &options);

        cp_core()
            .args(["--format", "summary", "train", "--options", &options])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("classification | metric=auc (maximize)"));
    }

    #[test]
    fn exitcode_format_prints_nothing() {
        let dir = TempDir::new().unwrap();
        let options = write_options(dir.path(), &regression_options(dir.path()));

        cp_core()
            .args(["-f", "exitcode", "train", "--options", &options])
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn hyperopt_includes_search_options() {
        let dir = TempDir::new().unwrap();
        let mut options = regression_options(dir.path());
        options["results_dir"] = json!(dir.path().join("search"));
        options["max_budget"] = json!(27);
        let options = write_options(dir.path(), &options);

        let output = cp_core()
            .args(["hyperopt", "--options", &options])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let config: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(config["max_budget"], 27);
        assert_eq!(config["eta"], 2);
        assert_eq!(config["port"], 9090);
        assert!(dir.path().join("search").is_dir());
    }

    #[test]
    fn predict_prints_paths() {
        let dir = TempDir::new().unwrap();
        let options = write_options(
            dir.path(),
            &json!({"test_path": "test.csv", "preds_path": "preds.csv"}),
        );

        cp_core()
            .args(["-f", "summary", "predict", "--options", &options])
            .assert()
            .success()
            .stdout(predicate::str::contains("predict test.csv -> preds.csv"));
    }
}

// ============================================================================
// Registry Listing
// ============================================================================

mod list_options {
    use super::*;

    #[test]
    fn lists_predict_registry() {
        let output = cp_core()
            .args(["options", "predict"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let listing: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(listing["mode"], "predict");
        let names: Vec<&str> = listing["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|spec| spec["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            ["test_path", "compound_names", "write_smiles", "preds_path"]
        );
    }

    #[test]
    fn summary_table_marks_required_options() {
        cp_core()
            .args(["-f", "summary", "options", "train"])
            .assert()
            .success()
            .stdout(predicate::str::contains("train options"))
            .stdout(predicate::str::is_match(r"data_path\s+string\s+required").unwrap());
    }

    #[test]
    fn unknown_mode_fails() {
        cp_core()
            .args(["options", "serve"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}

// ============================================================================
// Failures
// ============================================================================

mod resolve_errors {
    use super::*;

    #[test]
    fn unknown_option_is_args_error() {
        let dir = TempDir::new().unwrap();
        let mut options = regression_options(dir.path());
        options["num_epochs"] = json!(10);
        let options = write_options(dir.path(), &options);

        let output = cp_core()
            .args(["-f", "compact", "train", "--options", &options])
            .assert()
            .code(10)
            .stdout(predicate::str::is_empty())
            .get_output()
            .stderr
            .clone();

        let stderr = String::from_utf8(output).unwrap();
        let line = stderr
            .lines()
            .find(|line| line.starts_with("{\"exit_code\""))
            .expect("structured error line");
        let error: Value = serde_json::from_str(line).unwrap();
        assert_eq!(error["exit_code_name"], "ERR_ARGS");
        assert_eq!(error["error"]["code"], 21);
        assert_eq!(error["error"]["category"], "ingestion");
    }

    #[test]
    fn incompatible_metric_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let mut options = regression_options(dir.path());
        options["metric"] = json!("auc");
        let options = write_options(dir.path(), &options);

        cp_core()
            .args(["train", "--options", &options])
            .assert()
            .code(12)
            .stderr(predicate::str::contains("ERR_VALIDATION"));
    }

    #[test]
    fn missing_checkpoints_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("ckpts")).unwrap();
        let mut options = regression_options(dir.path());
        options["checkpoint_dir"] = json!(dir.path().join("ckpts"));
        let options = write_options(dir.path(), &options);

        cp_core()
            .args(["-f", "summary", "train", "--options", &options])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("No Checkpoints Found"));
    }

    #[test]
    fn missing_options_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");

        cp_core()
            .args(["train", "--options", missing.to_str().unwrap()])
            .assert()
            .code(21)
            .stderr(predicate::str::contains("ERR_IO"));
    }

    #[test]
    fn malformed_json_is_io_error() {
        cp_core()
            .args(["-f", "exitcode", "train", "--options", "-"])
            .write_stdin("{\"data_path\": ")
            .assert()
            .code(21)
            .stderr(predicate::str::is_empty());
    }

    #[test]
    fn options_flag_is_required() {
        cp_core()
            .arg("train")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--options"));
    }
}
