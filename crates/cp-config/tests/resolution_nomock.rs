//! No-mock resolution tests against a real filesystem.
//!
//! Covers:
//! - Checkpoint discovery at arbitrary depth
//! - Chunked data directories
//! - Save directory creation and temporary directory lifetime
//! - Output naming (every registered option survives unless removed)
//! - End-to-end scenarios for train, hyperopt and predict

use std::fs;
use std::path::{Path, PathBuf};

use cp_common::{Error, Metric};
use cp_config::{
    resolve_hyperopt, resolve_predict, resolve_train, train_registry, FixedGpuProbe,
    RawOptionBag,
};
use tempfile::TempDir;

const NO_GPU: FixedGpuProbe = FixedGpuProbe(false);

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, b"smiles,target\n").expect("write file");
}

/// A bag that resolves cleanly, saving into `save_dir`.
fn bag(save_dir: &Path, dataset_type: &str) -> RawOptionBag {
    RawOptionBag::new()
        .with("data_path", "data.csv")
        .with("dataset_type", dataset_type)
        .with("save_dir", save_dir)
}

fn json_keys(value: &serde_json::Value) -> Vec<String> {
    value
        .as_object()
        .expect("resolved config serializes to an object")
        .keys()
        .cloned()
        .collect()
}

#[test]
fn test_checkpoints_found_at_any_depth() {
    for k in 1..=4usize {
        let tmp = TempDir::new().expect("tempdir");
        let ckpt = tmp.path().join("ckpt");
        let mut expected = Vec::new();
        for i in 0..k {
            // model i lives i directories deep
            let mut dir = ckpt.join(format!("fold_{i}"));
            for depth in 0..i {
                dir = dir.join(format!("level_{depth}"));
            }
            let path = dir.join("model.pt");
            touch(&path);
            touch(&dir.join("args.json"));
            expected.push(path);
        }
        expected.sort();

        let config = resolve_train(
            bag(&tmp.path().join("save"), "regression")
                .with("checkpoint_dir", ckpt.as_path())
                .with("ensemble_size", 7i64),
            &NO_GPU,
        )
        .expect("resolve");

        let set = config
            .checkpoints
            .checkpoint_paths
            .as_ref()
            .expect("checkpoint set");
        assert_eq!(set.len(), k);
        assert_eq!(set.paths(), expected.as_slice());
        assert_eq!(config.checkpoints.ensemble_size, k as i64);
    }
}

#[test]
fn test_checkpoint_dir_without_models_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let ckpt = tmp.path().join("ckpt");
    touch(&ckpt.join("fold_0/model.ckpt"));

    let err = resolve_train(
        bag(&tmp.path().join("save"), "regression").with("checkpoint_dir", ckpt.as_path()),
        &NO_GPU,
    )
    .unwrap_err();
    assert!(matches!(err, Error::NoCheckpointsFound { ref dir } if dir == &ckpt));
}

#[test]
fn test_without_checkpoint_dir_ensemble_size_is_kept() {
    let tmp = TempDir::new().expect("tempdir");
    let config = resolve_train(
        bag(tmp.path(), "regression").with("ensemble_size", 5i64),
        &NO_GPU,
    )
    .expect("resolve");
    assert_eq!(config.checkpoints.ensemble_size, 5);
    assert!(config.checkpoints.checkpoint_paths.is_none());
}

#[test]
fn test_chunk_directory_detection() {
    let tmp = TempDir::new().expect("tempdir");
    let chunks = tmp.path().join("chunks");
    touch(&chunks.join("a.csv"));
    touch(&chunks.join("b.csv"));

    let config = resolve_train(
        bag(&tmp.path().join("save"), "regression").with("data_path", chunks.as_path()),
        &NO_GPU,
    )
    .expect("resolve");

    assert_eq!(config.data.prespecified_chunk_dir.as_deref(), Some(chunks.as_path()));
    assert!(config.data.data_path.starts_with(&chunks));
    assert!(config.data.data_path.is_file());
}

#[test]
fn test_empty_chunk_directory_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let chunks = tmp.path().join("chunks");
    fs::create_dir_all(&chunks).expect("mkdir");

    let err = resolve_train(
        bag(&tmp.path().join("save"), "regression").with("data_path", chunks.as_path()),
        &NO_GPU,
    )
    .unwrap_err();
    assert!(matches!(err, Error::EmptyDataDirectory { .. }));
}

#[test]
fn test_explicit_save_dir_is_created() {
    let tmp = TempDir::new().expect("tempdir");
    let save = tmp.path().join("runs/a/b");
    let config = resolve_train(bag(&save, "regression"), &NO_GPU).expect("resolve");
    assert!(save.is_dir());
    assert_eq!(config.save_dir.path(), save.as_path());
    assert!(!config.save_dir.is_temporary());
}

#[test]
fn test_temporary_save_dir_lives_with_config() {
    let bag = RawOptionBag::new()
        .with("data_path", "data.csv")
        .with("dataset_type", "classification");
    let config = resolve_train(bag, &NO_GPU).expect("resolve");
    let path: PathBuf = config.save_dir.path().to_path_buf();
    assert!(config.save_dir.is_temporary());
    assert!(path.is_dir());

    let handed_off = config.clone();
    drop(config);
    assert!(path.is_dir(), "temporary save_dir removed while still referenced");

    drop(handed_off);
    assert!(!path.exists());
}

#[test]
fn test_output_keeps_registered_names() {
    let tmp = TempDir::new().expect("tempdir");
    let config = resolve_train(bag(tmp.path(), "regression"), &NO_GPU).expect("resolve");
    let json = serde_json::to_value(&config).expect("serialize");
    let keys = json_keys(&json);

    let removed = ["no_cuda", "no_target_scaling", "no_features_scaling", "lr_scaler"];
    for spec in train_registry().iter() {
        if removed.contains(&spec.name) {
            assert!(!keys.iter().any(|k| k == spec.name), "{} must be removed", spec.name);
        } else {
            assert!(keys.iter().any(|k| k == spec.name), "{} missing from output", spec.name);
        }
    }

    for derived in [
        "cuda_enabled",
        "target_scaling",
        "features_scaling",
        "minimize_score",
        "checkpoint_paths",
        "use_input_features",
        "num_lr_groups",
        "prespecified_chunk_dir",
    ] {
        assert!(keys.iter().any(|k| k == derived), "{derived} missing from output");
    }
}

#[test]
fn test_resolution_is_repeatable() {
    let tmp = TempDir::new().expect("tempdir");
    let input = bag(tmp.path(), "regression")
        .with("separate_ffn_lr", true)
        .with("lr_scaler", vec![1.0, 0.5])
        .with("features_generator", vec!["morgan"]);

    let first = resolve_train(input.clone(), &NO_GPU).expect("first");
    let second = resolve_train(input, &NO_GPU).expect("second");
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );
}

#[test]
fn test_scenario_classification_defaults_to_auc() {
    let tmp = TempDir::new().expect("tempdir");
    let config = resolve_train(bag(tmp.path(), "classification"), &NO_GPU).expect("resolve");
    assert_eq!(config.evaluation.metric, Metric::Auc);
    assert!(!config.evaluation.minimize_score);
}

#[test]
fn test_scenario_predetermined_without_fold_index() {
    let tmp = TempDir::new().expect("tempdir");
    let err = resolve_train(
        bag(tmp.path(), "regression")
            .with("split_type", "predetermined")
            .with("folds_file", "folds.pkl"),
        &NO_GPU,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidSplitConfiguration { .. }));
}

#[test]
fn test_scenario_predict_features_and_task_needs_regression() {
    let tmp = TempDir::new().expect("tempdir");
    let err = resolve_train(
        bag(tmp.path(), "classification").with("predict_features_and_task", true),
        &NO_GPU,
    )
    .unwrap_err();
    assert!(matches!(err, Error::IncompatibleMode { .. }));
}

#[test]
fn test_unsupervised_gets_two_learning_rate_groups() {
    let tmp = TempDir::new().expect("tempdir");
    let config = resolve_train(bag(tmp.path(), "unsupervised"), &NO_GPU).expect("resolve");
    assert_eq!(config.evaluation.metric, Metric::LogLoss);
    assert!(config.training.separate_ffn_lr);
    assert_eq!(config.learning_rates.num_lr_groups, 2);
    assert_eq!(config.learning_rates.max_lr, vec![1e-3, 1e-3]);
}

#[test]
fn test_test_run_forces_zero_epochs() {
    let tmp = TempDir::new().expect("tempdir");
    let config = resolve_train(
        bag(tmp.path(), "regression").with("test", true).with("epochs", 100i64),
        &NO_GPU,
    )
    .expect("resolve");
    assert_eq!(config.training.epochs, 0);
}

#[test]
fn test_cuda_follows_probe_and_flag() {
    let tmp = TempDir::new().expect("tempdir");
    let gpu = FixedGpuProbe(true);
    let on = resolve_train(bag(tmp.path(), "regression"), &gpu).expect("resolve");
    assert!(on.runtime.cuda_enabled);
    let off = resolve_train(bag(tmp.path(), "regression").with("no_cuda", true), &gpu)
        .expect("resolve");
    assert!(!off.runtime.cuda_enabled);
}

#[test]
fn test_hyperopt_creates_results_dir() {
    let tmp = TempDir::new().expect("tempdir");
    let results = tmp.path().join("results/search_1");
    let config = resolve_hyperopt(
        bag(&tmp.path().join("save"), "regression").with("results_dir", results.as_path()),
        &NO_GPU,
    )
    .expect("resolve");
    assert!(results.is_dir());

    let search = config.search.as_ref().expect("search settings");
    assert_eq!(search.n_iterations, 16);
    let json = serde_json::to_value(&config).expect("serialize");
    assert_eq!(json["port"], 9090);
    assert_eq!(json["results_dir"], results.display().to_string());
}

#[test]
fn test_hyperopt_rejects_bad_bounds() {
    let tmp = TempDir::new().expect("tempdir");
    let results = tmp.path().join("results");
    let err = resolve_hyperopt(
        bag(&tmp.path().join("save"), "regression")
            .with("results_dir", results.as_path())
            .with("min_budget", 50i64),
        &NO_GPU,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidSearchConfiguration { .. }));
    assert!(!results.exists());
}

#[test]
fn test_hyperopt_requires_results_dir() {
    let tmp = TempDir::new().expect("tempdir");
    let err = resolve_hyperopt(bag(tmp.path(), "regression"), &NO_GPU).unwrap_err();
    assert!(matches!(err, Error::MissingRequiredOption { ref name } if name == "results_dir"));
}

#[test]
fn test_train_rejects_search_options() {
    let tmp = TempDir::new().expect("tempdir");
    let err = resolve_train(bag(tmp.path(), "regression").with("eta", 3i64), &NO_GPU)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownOption { ref name } if name == "eta"));
}

#[test]
fn test_predict_options() {
    let config = resolve_predict(
        RawOptionBag::new()
            .with("test_path", "test.csv")
            .with("preds_path", "preds.csv")
            .with("write_smiles", true),
    )
    .expect("resolve");
    assert_eq!(config.test_path, Path::new("test.csv"));
    assert!(config.write_smiles);
    assert!(!config.compound_names);

    let err = resolve_predict(RawOptionBag::new().with("test_path", "test.csv")).unwrap_err();
    assert!(matches!(err, Error::MissingRequiredOption { ref name } if name == "preds_path"));
}

#[test]
fn test_options_from_json_file() {
    let tmp = TempDir::new().expect("tempdir");
    let file = tmp.path().join("options.json");
    let save = tmp.path().join("save");
    fs::write(
        &file,
        serde_json::json!({
            "data_path": "data.csv",
            "dataset_type": "regression",
            "save_dir": save,
            "dropout": 0,
            "init_lr": [1],
            "metric": null,
        })
        .to_string(),
    )
    .expect("write options");

    let bag = RawOptionBag::from_file(&file).expect("read options");
    let config = resolve_train(bag, &NO_GPU).expect("resolve");
    assert_eq!(config.model.dropout, 0.0);
    assert_eq!(config.ffn.ffn_dropout, 0.0);
    assert_eq!(config.learning_rates.init_lr, vec![1.0]);
    assert_eq!(config.evaluation.metric, Metric::Rmse);
}
