//! Configuration resolution.
//!
//! Resolution is a fixed sequence of stages. Each stage is a function of the
//! typed options plus the outputs of earlier stages, and returns a new value;
//! nothing is mutated in place. Stage order:
//!
//! 1. Boolean inversions (`no_cuda`, `no_target_scaling`, `no_features_scaling`)
//! 2. Metric defaulting and `minimize_score`
//! 3. Checkpoint discovery
//! 4. Run-mode overrides (`test`, `predict_features_and_task`, unsupervised)
//! 5. Feature usage
//! 6. Learning rate group broadcasting and scaling
//! 7. FFN defaults
//! 8. Chunked data detection
//! 9. Save directory allocation
//!
//! The validator runs after the last stage. The `resolve_*` entry points
//! return a [`ResolvedConfig`] only once it has passed validation, with any
//! search settings already attached. Its fields stay public for the
//! collaborators that read them; a config built or edited by hand is not
//! validated until it is passed to [`validate`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use cp_common::{BertVocabFunc, DatasetType, Error, KernelFunc, Metric, Result};
use tracing::{debug, info, info_span};

use crate::bag::RawOptionBag;
use crate::catalog::{hyperopt_registry, predict_registry, train_registry};
use crate::discover::{find_checkpoints, first_data_file};
use crate::options::{DataOptions, FfnOptions, LearningRateOptions, TrainOptions};
use crate::platform::GpuProbe;
use crate::reader::OptionReader;
use crate::resolved::{
    CheckpointSettings, DataSettings, EvaluationSettings, FeatureSettings, FfnSettings,
    LearningRateGroups, ModelSettings, PredictConfig, ResolvedConfig, RuntimeSettings, SaveDir,
    SearchSettings, TaskSettings, TrainingSettings,
};
use crate::validate::validate;

/// Resolve and validate a training option bag.
pub fn resolve_train(bag: RawOptionBag, probe: &dyn GpuProbe) -> Result<ResolvedConfig> {
    let _span = info_span!("resolve", mode = "train").entered();
    let prepared = train_registry().prepare(bag)?;
    let mut reader = OptionReader::new(prepared);
    let options = TrainOptions::read(&mut reader)?;

    let config = resolve_options(options, probe)?;
    validate(&config)?;
    info!(summary = %config.summary(), "configuration resolved");
    Ok(config)
}

/// Resolve and validate a hyperparameter search option bag.
///
/// The training options go through the full training pipeline. The search
/// settings are attached before validation, so their bounds are checked
/// last, and `results_dir` is created only for a valid configuration.
pub fn resolve_hyperopt(bag: RawOptionBag, probe: &dyn GpuProbe) -> Result<ResolvedConfig> {
    let _span = info_span!("resolve", mode = "hyperopt").entered();
    let prepared = hyperopt_registry().prepare(bag)?;
    let mut reader = OptionReader::new(prepared);
    let options = TrainOptions::read(&mut reader)?;
    let search = SearchSettings::read(&mut reader)?;

    let results_dir = search.results_dir.clone();
    let mut config = resolve_options(options, probe)?;
    config.search = Some(search);
    validate(&config)?;

    fs::create_dir_all(&results_dir).map_err(|e| Error::io(&results_dir, e))?;
    debug!(results_dir = %results_dir.display(), "results directory ready");
    info!(summary = %config.summary(), "configuration resolved");
    Ok(config)
}

/// Check a prediction option bag.
pub fn resolve_predict(bag: RawOptionBag) -> Result<PredictConfig> {
    let _span = info_span!("resolve", mode = "predict").entered();
    let prepared = predict_registry().prepare(bag)?;
    let mut r = OptionReader::new(prepared);
    let config = PredictConfig {
        test_path: r.path("test_path")?,
        preds_path: r.path("preds_path")?,
        compound_names: r.flag("compound_names")?,
        write_smiles: r.flag("write_smiles")?,
    };
    info!(
        test_path = %config.test_path.display(),
        preds_path = %config.preds_path.display(),
        "prediction configuration resolved"
    );
    Ok(config)
}

/// Run every resolver stage. The result has not been validated.
pub(crate) fn resolve_options(options: TrainOptions, probe: &dyn GpuProbe) -> Result<ResolvedConfig> {
    let inversions = resolve_inversions(&options, probe);
    let evaluation = resolve_evaluation(&options)?;
    let checkpoints = resolve_checkpoints(&options)?;
    let run_mode = apply_run_mode(&options);
    let features = resolve_feature_usage(&options, &inversions, &run_mode);
    let learning_rates =
        broadcast_learning_rates(&options.learning_rates, run_mode.separate_ffn_lr)?;
    let ffn = resolve_ffn(&options.ffn, &options.model);
    let data = detect_chunks(&options.data)?;
    let save_dir = allocate_save_dir(options.save_dir.as_deref())?;

    let TrainOptions {
        task,
        split,
        runtime,
        training,
        pretraining,
        model,
        adversarial,
        ..
    } = options;

    Ok(ResolvedConfig {
        data,
        features,
        task: TaskSettings {
            dataset_type: task.dataset_type,
            test: task.test,
            predict_features: run_mode.predict_features,
            predict_features_and_task: task.predict_features_and_task,
            task_weight: task.task_weight,
            num_bins: task.num_bins,
            unsupervised_n_clusters: task.unsupervised_n_clusters,
        },
        evaluation,
        split,
        runtime: RuntimeSettings {
            cuda_enabled: inversions.cuda_enabled,
            quiet: runtime.quiet,
            log_frequency: runtime.log_frequency,
            sequential: runtime.sequential,
        },
        training: TrainingSettings {
            epochs: run_mode.epochs,
            batch_size: training.batch_size,
            truncate_outliers: training.truncate_outliers,
            optimizer: training.optimizer,
            scheduler: training.scheduler,
            separate_ffn_lr: run_mode.separate_ffn_lr,
            lr_decay_rate: training.lr_decay_rate,
            max_grad_norm: training.max_grad_norm,
            target_scaling: inversions.target_scaling,
            last_batch: training.last_batch,
        },
        learning_rates,
        pretraining,
        model,
        ffn,
        adversarial,
        checkpoints,
        save_dir,
        search: None,
    })
}

/// Positive-sense counterparts of the `no_*` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inversions {
    pub cuda_enabled: bool,
    pub target_scaling: bool,
    pub features_scaling: bool,
}

pub fn resolve_inversions(options: &TrainOptions, probe: &dyn GpuProbe) -> Inversions {
    let inversions = Inversions {
        cuda_enabled: !options.runtime.no_cuda && probe.cuda_available(),
        target_scaling: !options.training.no_target_scaling,
        features_scaling: !options.features.no_features_scaling,
    };
    debug!(?inversions, "inverted negative flags");
    inversions
}

/// Metric used when none was supplied.
pub fn default_metric(
    dataset_type: DatasetType,
    bert_vocab_func: BertVocabFunc,
    kernel_func: Option<KernelFunc>,
) -> Result<Metric> {
    let metric = match dataset_type {
        DatasetType::Classification => Metric::Auc,
        DatasetType::Unsupervised => Metric::LogLoss,
        DatasetType::BertPretraining => match bert_vocab_func {
            BertVocabFunc::FeatureVector => Metric::Rmse,
            _ => Metric::LogLoss,
        },
        DatasetType::Kernel => match kernel_func {
            Some(KernelFunc::Features | KernelFunc::FeaturesDot | KernelFunc::Wl) => Metric::Rmse,
            None => {
                return Err(Error::UnsupportedKernelFunction {
                    kernel_func: "none".to_string(),
                })
            }
        },
        DatasetType::Regression | DatasetType::RegressionWithBinning => Metric::Rmse,
    };
    Ok(metric)
}

pub fn resolve_evaluation(options: &TrainOptions) -> Result<EvaluationSettings> {
    let metric = match options.task.metric {
        Some(metric) => metric,
        None => {
            let metric = default_metric(
                options.task.dataset_type,
                options.pretraining.bert_vocab_func,
                options.pretraining.kernel_func,
            )?;
            debug!(%metric, dataset_type = %options.task.dataset_type, "defaulted metric");
            metric
        }
    };

    Ok(EvaluationSettings {
        metric,
        minimize_score: metric.minimizes(),
        show_individual_scores: options.task.show_individual_scores,
        labels_to_show: options.task.labels_to_show.clone(),
    })
}

/// Discover checkpoints. A discovered set overrides `ensemble_size`.
pub fn resolve_checkpoints(options: &TrainOptions) -> Result<CheckpointSettings> {
    let supplied = &options.checkpoints;
    let Some(dir) = &supplied.checkpoint_dir else {
        return Ok(CheckpointSettings {
            checkpoint_dir: None,
            checkpoint_paths: None,
            ensemble_size: supplied.ensemble_size,
            load_encoder_only: supplied.load_encoder_only,
        });
    };

    let set = find_checkpoints(dir)?;
    let ensemble_size = set.len() as i64;
    if ensemble_size != supplied.ensemble_size {
        debug!(
            supplied = supplied.ensemble_size,
            discovered = ensemble_size,
            "ensemble_size replaced by checkpoint count"
        );
    }

    Ok(CheckpointSettings {
        checkpoint_dir: Some(dir.clone()),
        checkpoint_paths: Some(set),
        ensemble_size,
        load_encoder_only: supplied.load_encoder_only,
    })
}

/// Values forced by the requested run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    pub epochs: i64,
    pub predict_features: bool,
    pub separate_ffn_lr: bool,
}

pub fn apply_run_mode(options: &TrainOptions) -> RunMode {
    let run_mode = RunMode {
        epochs: if options.task.test {
            0
        } else {
            options.training.epochs
        },
        predict_features: options.task.predict_features || options.task.predict_features_and_task,
        separate_ffn_lr: options.training.separate_ffn_lr
            || options.task.dataset_type == DatasetType::Unsupervised,
    };
    debug!(?run_mode, "applied run mode overrides");
    run_mode
}

pub fn resolve_feature_usage(
    options: &TrainOptions,
    inversions: &Inversions,
    run_mode: &RunMode,
) -> FeatureSettings {
    let supplied = &options.features;
    let features_generator =
        (!supplied.features_generator.is_empty()).then(|| supplied.features_generator.clone());
    let has_source = features_generator.is_some() || supplied.features_path.is_some();

    let feature_kernel = options
        .pretraining
        .kernel_func
        .is_some_and(KernelFunc::requires_features);
    let use_input_features = has_source
        && !run_mode.predict_features
        && !feature_kernel
        && options.task.dataset_type != DatasetType::BertPretraining;
    debug!(has_source, use_input_features, "derived feature usage");

    FeatureSettings {
        features_generator,
        features_path: supplied.features_path.clone(),
        features_only: supplied.features_only,
        use_input_features,
        features_scaling: inversions.features_scaling,
        additional_atom_features: supplied.additional_atom_features.clone(),
        functional_group_smarts: supplied.functional_group_smarts.clone(),
    }
}

/// Broadcast every rate sequence to `num_lr_groups` entries and apply `lr_scaler`.
pub fn broadcast_learning_rates(
    supplied: &LearningRateOptions,
    separate_ffn_lr: bool,
) -> Result<LearningRateGroups> {
    let groups = if separate_ffn_lr { 2 } else { 1 };

    let init_lr = broadcast("init_lr", &supplied.init_lr, groups)?;
    let max_lr = broadcast("max_lr", &supplied.max_lr, groups)?;
    let final_lr = broadcast("final_lr", &supplied.final_lr, groups)?;
    let lr_scaler = broadcast("lr_scaler", &supplied.lr_scaler, groups)?;
    let warmup_epochs = broadcast("warmup_epochs", &supplied.warmup_epochs, groups)?;
    let weight_decay = broadcast("weight_decay", &supplied.weight_decay, groups)?;

    let scale = |rates: Vec<f64>| -> Vec<f64> {
        rates
            .iter()
            .zip(&lr_scaler)
            .map(|(rate, factor)| rate * factor)
            .collect()
    };

    let resolved = LearningRateGroups {
        num_lr_groups: groups,
        init_lr: scale(init_lr),
        max_lr: scale(max_lr),
        final_lr: scale(final_lr),
        warmup_epochs,
        weight_decay,
    };
    debug!(groups, max_lr = ?resolved.max_lr, "broadcast learning rates");
    Ok(resolved)
}

fn broadcast(name: &str, values: &[f64], groups: usize) -> Result<Vec<f64>> {
    match values {
        [] => Err(Error::InvalidGroupCount {
            name: name.to_string(),
            len: 0,
            groups,
        }),
        [single] => Ok(vec![*single; groups]),
        _ if values.len() <= groups => Ok(values.to_vec()),
        _ => Err(Error::InvalidGroupCount {
            name: name.to_string(),
            len: values.len(),
            groups,
        }),
    }
}

/// Unset FFN sizes inherit from the message passing encoder.
pub fn resolve_ffn(supplied: &FfnOptions, model: &ModelSettings) -> FfnSettings {
    FfnSettings {
        ffn_hidden_size: supplied.ffn_hidden_size.unwrap_or(model.hidden_size),
        ffn_input_dropout: supplied.ffn_input_dropout.unwrap_or(model.dropout),
        ffn_dropout: supplied.ffn_dropout.unwrap_or(model.dropout),
        ffn_num_layers: supplied.ffn_num_layers,
        mayr_layers: supplied.mayr_layers,
        freeze_encoder: supplied.freeze_encoder,
    }
}

/// A directory `data_path` becomes the chunk directory; `data_path` then
/// points at one file inside it for schema probing.
pub fn detect_chunks(supplied: &DataOptions) -> Result<DataSettings> {
    let (data_path, prespecified_chunk_dir) = if supplied.data_path.is_dir() {
        let probe = first_data_file(&supplied.data_path)?;
        debug!(
            chunk_dir = %supplied.data_path.display(),
            probe = %probe.display(),
            "data_path is a chunk directory"
        );
        (probe, Some(supplied.data_path.clone()))
    } else {
        (supplied.data_path.clone(), None)
    };

    Ok(DataSettings {
        data_path,
        prespecified_chunk_dir,
        prespecified_chunks_max_examples_per_epoch: supplied
            .prespecified_chunks_max_examples_per_epoch,
        separate_test_set: supplied.separate_test_set.clone(),
        max_data_size: supplied.max_data_size,
        num_chunks: supplied.num_chunks,
        chunk_temp_dir: supplied.chunk_temp_dir.clone(),
        memoize_chunks: supplied.memoize_chunks,
        sparse: supplied.sparse,
    })
}

/// Create the requested save directory, or allocate a temporary one.
pub fn allocate_save_dir(supplied: Option<&Path>) -> Result<SaveDir> {
    match supplied {
        Some(path) => {
            fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
            debug!(save_dir = %path.display(), "save directory ready");
            Ok(SaveDir::Explicit(path.to_path_buf()))
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix("chemprop-")
                .tempdir()
                .map_err(|e| Error::io(std::env::temp_dir(), e))?;
            debug!(save_dir = %dir.path().display(), "allocated temporary save directory");
            Ok(SaveDir::Temporary(Arc::new(dir)))
        }
    }
}
