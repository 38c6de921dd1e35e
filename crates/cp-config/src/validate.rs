//! Cross-field validation of a resolved configuration.
//!
//! Checks run in a fixed order and the first violation is returned; no
//! attempt is made to collect several errors in one pass.

use cp_common::{DatasetType, Error, Metric, Result, SplitType};
use tracing::{debug, warn};

use crate::resolved::{ResolvedConfig, SearchSettings};

/// Tolerance for `split_sizes` summing to one.
const SPLIT_SUM_TOLERANCE: f64 = 1e-6;

type Check = fn(&ResolvedConfig) -> Result<()>;

const CHECKS: &[(&str, Check)] = &[
    ("metric", check_metric),
    ("vocabulary", check_vocabulary),
    ("predict_features_and_task", check_predict_features_and_task),
    ("feature_source", check_feature_source),
    ("bert_features_only", check_bert_features_only),
    ("ffn_num_layers", check_ffn_layers),
    ("scaffold_overlap", check_scaffold_overlap),
    ("predetermined", check_predetermined),
    ("split_sizes", check_split_sizes),
    ("search", check_search),
];

/// Validate a resolved configuration, including its search settings if any.
pub fn validate(config: &ResolvedConfig) -> Result<()> {
    for (name, check) in CHECKS {
        if let Err(err) = check(config) {
            warn!(check = *name, code = err.code(), error = %err, "validation failed");
            return Err(err);
        }
    }
    debug!(checks = CHECKS.len(), "configuration valid");
    Ok(())
}

/// Metrics accepted for `dataset_type`, or `None` when any metric is allowed.
pub fn allowed_metrics(dataset_type: DatasetType) -> Option<&'static [Metric]> {
    match dataset_type {
        DatasetType::Classification => Some(&[Metric::Auc, Metric::PrcAuc, Metric::Accuracy]),
        DatasetType::Regression | DatasetType::RegressionWithBinning => {
            Some(&[Metric::Rmse, Metric::Mae, Metric::R2])
        }
        DatasetType::Kernel => Some(&[Metric::Rmse]),
        DatasetType::Unsupervised | DatasetType::BertPretraining => None,
    }
}

fn check_metric(config: &ResolvedConfig) -> Result<()> {
    let dataset_type = config.task.dataset_type;
    let metric = config.evaluation.metric;
    match allowed_metrics(dataset_type) {
        Some(allowed) if !allowed.contains(&metric) => Err(Error::IncompatibleMetric {
            metric: metric.to_string(),
            dataset_type: dataset_type.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_vocabulary(config: &ResolvedConfig) -> Result<()> {
    if !config.model.jtnn {
        return Ok(());
    }
    match &config.model.vocab_path {
        None => Err(Error::MissingVocabulary {
            message: "vocab_path is not set".to_string(),
        }),
        Some(path) if !path.exists() => Err(Error::MissingVocabulary {
            message: format!("vocab_path \"{}\" does not exist", path.display()),
        }),
        Some(_) => Ok(()),
    }
}

fn check_predict_features_and_task(config: &ResolvedConfig) -> Result<()> {
    let dataset_type = config.task.dataset_type;
    if config.task.predict_features_and_task && dataset_type != DatasetType::Regression {
        return Err(Error::IncompatibleMode {
            message: format!(
                "predict_features_and_task requires dataset_type regression, got {dataset_type}"
            ),
        });
    }
    Ok(())
}

fn check_feature_source(config: &ResolvedConfig) -> Result<()> {
    if config.features.has_source() {
        return Ok(());
    }
    if config.task.predict_features {
        return Err(Error::MissingFeatureSource {
            mode: "predict_features".to_string(),
        });
    }
    match config.pretraining.kernel_func {
        Some(kernel) if kernel.requires_features() => Err(Error::MissingFeatureSource {
            mode: format!("kernel_func {kernel}"),
        }),
        _ => Ok(()),
    }
}

fn check_bert_features_only(config: &ResolvedConfig) -> Result<()> {
    if config.task.dataset_type == DatasetType::BertPretraining && config.features.features_only {
        return Err(Error::IncompatibleMode {
            message: "bert_pretraining cannot be combined with features_only".to_string(),
        });
    }
    Ok(())
}

fn check_ffn_layers(config: &ResolvedConfig) -> Result<()> {
    let value = config.ffn.ffn_num_layers;
    if value < 1 {
        return Err(Error::InvalidLayerCount { value });
    }
    Ok(())
}

fn check_scaffold_overlap(config: &ResolvedConfig) -> Result<()> {
    let is_overlap_split = config.split.split_type == SplitType::ScaffoldOverlap;
    match (is_overlap_split, config.split.scaffold_overlap) {
        (true, None) => Err(Error::InvalidSplitConfiguration {
            message: "split_type scaffold_overlap requires scaffold_overlap".to_string(),
        }),
        (false, Some(_)) => Err(Error::InvalidSplitConfiguration {
            message: format!(
                "scaffold_overlap is only used with split_type scaffold_overlap, got {}",
                config.split.split_type
            ),
        }),
        _ => Ok(()),
    }
}

fn check_predetermined(config: &ResolvedConfig) -> Result<()> {
    let split = &config.split;
    let predetermined = split.split_type == SplitType::Predetermined;
    let has_folds_file = split.folds_file.is_some();
    let has_test_fold = split.test_fold_index.is_some();

    if predetermined == has_folds_file && has_folds_file == has_test_fold {
        return Ok(());
    }

    let message = if predetermined {
        let missing: Vec<&str> = [
            (!has_folds_file).then_some("folds_file"),
            (!has_test_fold).then_some("test_fold_index"),
        ]
        .into_iter()
        .flatten()
        .collect();
        format!("split_type predetermined requires {}", missing.join(" and "))
    } else {
        let given: Vec<&str> = [
            has_folds_file.then_some("folds_file"),
            has_test_fold.then_some("test_fold_index"),
        ]
        .into_iter()
        .flatten()
        .collect();
        format!(
            "{} may only be set with split_type predetermined, got {}",
            given.join(" and "),
            split.split_type
        )
    };
    Err(Error::InvalidSplitConfiguration { message })
}

fn check_split_sizes(config: &ResolvedConfig) -> Result<()> {
    let sizes = &config.split.split_sizes;
    if sizes.len() != 3 {
        return Err(Error::InvalidSplitConfiguration {
            message: format!(
                "split_sizes must have 3 entries (train, validation, test), got {}",
                sizes.len()
            ),
        });
    }
    if let Some(bad) = sizes.iter().find(|size| !(0.0..=1.0).contains(*size)) {
        return Err(Error::InvalidSplitConfiguration {
            message: format!("split_sizes entries must be in [0, 1], got {bad}"),
        });
    }
    let sum: f64 = sizes.iter().sum();
    if (sum - 1.0).abs() > SPLIT_SUM_TOLERANCE {
        return Err(Error::InvalidSplitConfiguration {
            message: format!("split_sizes must sum to 1, got {sum}"),
        });
    }
    Ok(())
}

/// Check hyperparameter search bounds.
pub fn validate_search(search: &SearchSettings) -> Result<()> {
    let message = if search.min_budget < 1 {
        format!("min_budget must be >= 1, got {}", search.min_budget)
    } else if search.min_budget > search.max_budget {
        format!(
            "min_budget ({}) must not exceed max_budget ({})",
            search.min_budget, search.max_budget
        )
    } else if search.eta < 2 {
        format!("eta must be >= 2, got {}", search.eta)
    } else if search.n_iterations < 1 {
        format!("n_iterations must be >= 1, got {}", search.n_iterations)
    } else {
        return Ok(());
    };
    Err(Error::InvalidSearchConfiguration { message })
}

fn check_search(config: &ResolvedConfig) -> Result<()> {
    match &config.search {
        Some(search) => validate_search(search),
        None => Ok(()),
    }
}
