//! Built-in option catalog for training, hyperparameter search and prediction.
//!
//! The three registries are built lazily, once per process, and never change
//! afterwards.

use std::sync::OnceLock;

use cp_common::{
    Activation, AdditionalFeature, BertMaskType, BertVocabFunc, DatasetType, FeaturesGenerator,
    KernelFunc, Metric, Optimizer, Result, Scheduler, SplitType,
};
use serde::{Deserialize, Serialize};

use crate::registry::{OptionRegistry, OptionSpec};
use crate::value::OptionKind;

/// Which entry point an option bag is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Train (or test) a model.
    Train,
    /// Training options plus hyperparameter search options.
    Hyperopt,
    /// Make predictions with trained checkpoints.
    Predict,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Hyperopt => "hyperopt",
            Mode::Predict => "predict",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed filename of a persisted model checkpoint.
pub const CHECKPOINT_FILENAME: &str = "model.pt";

static TRAIN: OnceLock<OptionRegistry> = OnceLock::new();
static HYPEROPT: OnceLock<OptionRegistry> = OnceLock::new();
static PREDICT: OnceLock<OptionRegistry> = OnceLock::new();

/// Registry for `mode`, built on first use.
pub fn registry(mode: Mode) -> &'static OptionRegistry {
    let cell = match mode {
        Mode::Train => &TRAIN,
        Mode::Hyperopt => &HYPEROPT,
        Mode::Predict => &PREDICT,
    };
    // The catalog is static; a duplicate here is caught by the unit tests below.
    cell.get_or_init(|| build_registry(mode).expect("built-in option catalog has duplicate names"))
}

pub fn train_registry() -> &'static OptionRegistry {
    registry(Mode::Train)
}

pub fn hyperopt_registry() -> &'static OptionRegistry {
    registry(Mode::Hyperopt)
}

pub fn predict_registry() -> &'static OptionRegistry {
    registry(Mode::Predict)
}

/// Build a fresh registry for `mode`.
pub fn build_registry(mode: Mode) -> Result<OptionRegistry> {
    let mut registry = OptionRegistry::new();
    match mode {
        Mode::Train => registry.extend(train_options())?,
        Mode::Hyperopt => {
            registry.extend(train_options())?;
            registry.extend(search_options())?;
        }
        Mode::Predict => registry.extend(predict_options())?,
    }
    Ok(registry)
}

/// Options read by the prediction collaborator.
pub fn predict_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::string(
            "test_path",
            "Path to CSV file containing testing data for which predictions will be made",
        )
        .required(),
        OptionSpec::flag(
            "compound_names",
            "Use when test data file contains compound names in addition to SMILES strings",
        ),
        OptionSpec::flag(
            "write_smiles",
            "Whether to write smiles in addition to writing predicted values",
        ),
        OptionSpec::string("preds_path", "Path to CSV file where predictions will be saved")
            .required(),
    ]
}

/// Options read by the hyperparameter-search collaborator.
pub fn search_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::string("results_dir", "Path to directory where results will be saved")
            .required(),
        OptionSpec::int("port", 9090, "Port for the search workers to use"),
        OptionSpec::int(
            "min_budget",
            5,
            "Minimum budget (number of iterations during training) to use",
        ),
        OptionSpec::int(
            "max_budget",
            45,
            "Maximum budget (number of iterations during training) to use",
        ),
        OptionSpec::int(
            "eta",
            2,
            "Factor by which to cut number of trials (1/eta trials remain)",
        ),
        OptionSpec::int("n_iterations", 16, "Number of iterations of the search algorithm"),
    ]
}

/// Every training option.
pub fn train_options() -> Vec<OptionSpec> {
    let mut specs = general_options();
    specs.extend(training_options());
    specs.extend(model_options());
    specs.extend(adversarial_options());
    specs
}

fn general_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::string(
            "data_path",
            "Path to data CSV file, or to directory of files if pre-chunked",
        )
        .required(),
        OptionSpec::flag("test", "Whether to skip training and only test the model"),
        OptionSpec::string("vocab_path", "Path to .vocab file if using jtnn"),
        OptionSpec::flag(
            "features_only",
            "Use only the additional features in an FFN, no graph network",
        ),
        OptionSpec::choice_list::<FeaturesGenerator>(
            "features_generator",
            "Method of generating additional features",
        ),
        OptionSpec::string(
            "features_path",
            "Path to features to use in FNN (instead of features_generator)",
        ),
        OptionSpec::flag(
            "predict_features",
            "Pre-train by predicting the additional features rather than the task values",
        ),
        OptionSpec::flag(
            "predict_features_and_task",
            "Pre-train by predicting the additional features in addition to the task values",
        ),
        OptionSpec::float(
            "task_weight",
            1.0,
            "Weighting for the real tasks when also predicting features in multitask setting",
        ),
        OptionSpec::choice_list::<AdditionalFeature>(
            "additional_atom_features",
            "Use additional features in atom featurization",
        )
        .with_default(Vec::<&str>::new()),
        OptionSpec::string(
            "functional_group_smarts",
            "Path to txt file of smarts for functional groups, if functional_group features are on",
        )
        .with_default("chemprop/features/smarts.txt"),
        OptionSpec::flag(
            "sparse",
            "Store features as sparse (can save memory for sparse features)",
        ),
        OptionSpec::string("save_dir", "Directory where model checkpoints will be saved"),
        OptionSpec::string(
            "checkpoint_dir",
            "Directory from which to load model checkpoints (walks directory and ensembles all models that are found)",
        ),
        OptionSpec::flag(
            "load_encoder_only",
            "If a checkpoint_dir is specified for training, only loads weights from encoder and not from the final feed-forward network",
        ),
        OptionSpec::choice::<DatasetType>(
            "dataset_type",
            "Type of dataset; determines the loss function used during training",
        )
        .required(),
        OptionSpec::int(
            "unsupervised_n_clusters",
            10000,
            "Number of clusters to use for unsupervised learning labels",
        ),
        OptionSpec::int(
            "prespecified_chunks_max_examples_per_epoch",
            1_000_000,
            "When using prespecified chunks, load up to this many examples per epoch",
        ),
        OptionSpec::int("num_bins", 20, "Number of bins for regression with binning"),
        OptionSpec::int("num_chunks", 1, "Specify > 1 if your dataset is really big"),
        OptionSpec::string("chunk_temp_dir", "Temp dir to store chunks in")
            .with_default("temp_chunks"),
        OptionSpec::flag(
            "memoize_chunks",
            "Store memo dicts for mol2graph in chunk_temp_dir when chunking, at large disk space cost",
        ),
        OptionSpec::string("separate_test_set", "Path to separate test set, optional"),
        OptionSpec::choice::<SplitType>(
            "split_type",
            "Method of splitting the data into train/val/test",
        )
        .with_default(SplitType::Random.to_string()),
        OptionSpec::string(
            "split_test_by_overlap_dataset",
            "Dataset to use to split test set by overlap",
        ),
        OptionSpec::new(
            "scaffold_overlap",
            OptionKind::Float,
            "Proportion of molecules in val/test sets which should contain scaffolds in the train set (split_type scaffold_overlap only)",
        ),
        OptionSpec::float_list(
            "split_sizes",
            &[0.8, 0.1, 0.1],
            "Split proportions for train/validation/test sets",
        ),
        OptionSpec::int(
            "num_folds",
            1,
            "Number of folds when performing cross validation",
        ),
        OptionSpec::string("folds_file", "Optional file of fold labels"),
        OptionSpec::new(
            "test_fold_index",
            OptionKind::Int,
            "Which fold to use as test for leave-one-out cross val",
        ),
        OptionSpec::int(
            "seed",
            0,
            "Random seed to use when splitting data into train/val/test sets",
        ),
        OptionSpec::choice::<Metric>(
            "metric",
            "Metric to use during evaluation (defaults depend on dataset_type)",
        ),
        OptionSpec::flag("quiet", "Skip non-essential print statements"),
        OptionSpec::int(
            "log_frequency",
            10,
            "The number of batches between each logging of the training loss",
        ),
        OptionSpec::flag("no_cuda", "Turn off cuda"),
        OptionSpec::flag(
            "show_individual_scores",
            "Show all scores for individual targets, not just average, at the end",
        ),
        OptionSpec::new(
            "labels_to_show",
            OptionKind::StringList,
            "List of targets to show individual scores for, if specified",
        ),
        OptionSpec::new(
            "max_data_size",
            OptionKind::Int,
            "Maximum number of data points to load",
        ),
        OptionSpec::flag(
            "sequential",
            "Whether to run processes sequentially instead of in parallel",
        ),
    ]
}

fn training_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::int("epochs", 30, "Number of epochs to run"),
        OptionSpec::int("batch_size", 50, "Batch size"),
        OptionSpec::flag(
            "truncate_outliers",
            "Truncates outliers in the training set to mean ± 3 * std",
        ),
        OptionSpec::float_list(
            "warmup_epochs",
            &[2.0],
            "Number of epochs during which learning rate increases linearly from init_lr to max_lr",
        ),
        OptionSpec::choice::<Optimizer>("optimizer", "Learning rate optimizer")
            .with_default(Optimizer::Adam.to_string()),
        OptionSpec::choice::<Scheduler>("scheduler", "Learning rate scheduler")
            .with_default(Scheduler::Noam.to_string()),
        OptionSpec::flag(
            "separate_ffn_lr",
            "Whether to use a separate optimizer/lr scheduler for the ffn rather than sharing with the message passing encoder",
        ),
        OptionSpec::float_list("init_lr", &[1e-4], "Initial learning rate"),
        OptionSpec::float_list("max_lr", &[1e-3], "Maximum learning rate"),
        OptionSpec::float_list("final_lr", &[1e-4], "Final learning rate"),
        OptionSpec::float_list(
            "lr_scaler",
            &[1.0],
            "Amount by which to scale init_lr, max_lr, and final_lr",
        ),
        OptionSpec::float("lr_decay_rate", 0.9, "lr decay per epoch, for decay scheduler"),
        OptionSpec::new(
            "max_grad_norm",
            OptionKind::Float,
            "Maximum gradient norm when performing gradient clipping",
        ),
        OptionSpec::float_list(
            "weight_decay",
            &[0.0],
            "L2 penalty on optimizer to keep parameter norms small",
        ),
        OptionSpec::flag("no_target_scaling", "Turn off scaling of regression targets"),
        OptionSpec::flag("no_features_scaling", "Turn off scaling of features"),
        OptionSpec::float(
            "bert_mask_prob",
            0.15,
            "Probability of masking when dataset_type is bert_pretraining",
        ),
        OptionSpec::choice::<BertVocabFunc>(
            "bert_vocab_func",
            "Vocab function when dataset_type is bert_pretraining",
        )
        .with_default(BertVocabFunc::FeatureVector.to_string()),
        OptionSpec::int(
            "bert_max_vocab_size",
            0,
            "Set to > 0 to limit vocab size, replacing others with unk token",
        ),
        OptionSpec::int(
            "bert_smiles_to_sample",
            10000,
            "Set to > 0 to limit sampled smiles for vocab computation",
        ),
        OptionSpec::int_list(
            "bert_substructure_sizes",
            &[3],
            "Size of substructures to mask when bert_vocab_func is substructure",
        ),
        OptionSpec::choice::<BertMaskType>(
            "bert_mask_type",
            "How to mask atoms in bert_pretraining",
        )
        .with_default(BertMaskType::Cluster.to_string()),
        OptionSpec::flag(
            "bert_mask_bonds",
            "Mask bonds in bert pretraining when both adjacent atoms are zeroed out",
        ),
        OptionSpec::choice_list::<AdditionalFeature>(
            "additional_output_features",
            "Additional features to predict in bert output but not use as input; feature_vector vocab only",
        )
        .with_default(Vec::<&str>::new()),
        OptionSpec::choice::<KernelFunc>("kernel_func", "Kernel function for kernel pretraining"),
        OptionSpec::flag(
            "last_batch",
            "Whether to include the last batch in each training epoch even if it's less than the batch size",
        ),
    ]
}

fn model_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::int("ensemble_size", 1, "Number of models in ensemble"),
        OptionSpec::int("hidden_size", 300, "Dimensionality of hidden layers in MPN"),
        OptionSpec::flag("bias", "Whether to add bias to linear layers"),
        OptionSpec::int("depth", 3, "Number of message passing steps"),
        OptionSpec::flag(
            "diff_depth_weights",
            "Whether to use a different weight matrix at each step of message passing",
        ),
        OptionSpec::int(
            "layers_per_message",
            1,
            "Num linear layers between message passing steps",
        ),
        OptionSpec::flag("layer_norm", "Add layer norm after each message passing step"),
        OptionSpec::flag(
            "normalize_messages",
            "Normalize bond messages at each message passing step",
        ),
        OptionSpec::float("dropout", 0.0, "Dropout probability"),
        OptionSpec::choice::<Activation>("activation", "Activation function")
            .with_default(Activation::Relu.to_string()),
        OptionSpec::flag(
            "attention",
            "Perform self attention over the atoms in a molecule",
        ),
        OptionSpec::flag("message_attention", "Perform attention over messages"),
        OptionSpec::flag(
            "global_attention",
            "Perform global attention across all messages on each message passing step",
        ),
        OptionSpec::int(
            "message_attention_heads",
            1,
            "Number of heads to use for message attention",
        ),
        OptionSpec::flag(
            "master_node",
            "Add a master node to exchange information more easily",
        ),
        OptionSpec::int("master_dim", 600, "Number of dimensions for master node state"),
        OptionSpec::flag("use_master_as_output", "Use master node state as output"),
        OptionSpec::flag("addHs", "Explicitly adds hydrogens to the molecular graph"),
        OptionSpec::flag("three_d", "Adds 3D coordinates to atom and bond features"),
        OptionSpec::flag("virtual_edges", "Adds virtual edges between non-bonded atoms"),
        OptionSpec::flag(
            "drop_virtual_edges",
            "Randomly drops O(n_atoms) virtual edges so O(n_atoms) edges total instead of O(n_atoms^2)",
        ),
        OptionSpec::flag(
            "learn_virtual_edges",
            "Learn which virtual edges to add, limited to O(n_atoms)",
        ),
        OptionSpec::flag(
            "deepset",
            "Modify readout function to perform a Deep Sets set operation using linear layers",
        ),
        OptionSpec::flag(
            "set2set",
            "Modify readout function to perform a set2set operation using an RNN",
        ),
        OptionSpec::int("set2set_iters", 3, "Number of set2set RNN iterations to perform"),
        OptionSpec::flag(
            "jtnn",
            "Build junction tree and perform message passing over both original graph and tree",
        ),
        OptionSpec::new(
            "ffn_input_dropout",
            OptionKind::Float,
            "Input dropout for higher-capacity FFN (defaults to dropout)",
        ),
        OptionSpec::new(
            "ffn_dropout",
            OptionKind::Float,
            "Dropout for higher-capacity FFN (defaults to dropout)",
        ),
        OptionSpec::new(
            "ffn_hidden_size",
            OptionKind::Int,
            "Hidden dim for higher-capacity FFN (defaults to hidden_size)",
        ),
        OptionSpec::int("ffn_num_layers", 2, "Number of layers in FFN after MPN encoding"),
        OptionSpec::flag(
            "mayr_layers",
            "Use Mayr et al versions of dropout and linear layers",
        ),
        OptionSpec::flag(
            "freeze_encoder",
            "Whether to freeze the layers of the message passing encoder",
        ),
    ]
}

fn adversarial_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::flag("adversarial", "Adversarial scaffold regularization"),
        OptionSpec::float("wgan_beta", 10.0, "Multiplier for WGAN gradient penalty"),
        OptionSpec::int(
            "gan_d_per_g",
            5,
            "GAN discriminator training iterations per generator training iteration",
        ),
        OptionSpec::float("gan_lr_mult", 0.1, "Multiplier for GAN generator learning rate"),
        OptionSpec::flag("gan_use_scheduler", "Use noam scheduler for GAN optimizers"),
        OptionSpec::flag("moe", "Use mixture of experts model"),
        OptionSpec::int("cluster_split_seed", 0, "Random seed for K means cluster split"),
        OptionSpec::float(
            "cluster_max_ratio",
            4.0,
            "Max ratio of sizes between two clusters for K means cluster split",
        ),
        OptionSpec::flag(
            "batch_domain_encs",
            "Compute domain encoding means in batches, for speed",
        ),
        OptionSpec::float("lambda_moe", 0.1, "Multiplier for moe vs mtl loss"),
        OptionSpec::float("lambda_critic", 1.0, "Multiplier for critic loss"),
        OptionSpec::float("lambda_entropy", 0.001, "Multiplier for entropy regularization"),
        OptionSpec::int("m_rank", 100, "Mahalanobis matrix rank in moe model"),
        OptionSpec::int("num_sources", 10, "Number of source tasks for moe"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OptionValue;

    #[test]
    fn test_builtin_registries_build() {
        for mode in [Mode::Train, Mode::Hyperopt, Mode::Predict] {
            let registry = build_registry(mode).unwrap();
            assert!(!registry.is_empty(), "{mode} registry is empty");
        }
    }

    #[test]
    fn test_hyperopt_is_train_plus_search() {
        assert_eq!(
            hyperopt_registry().len(),
            train_registry().len() + search_options().len()
        );
        assert!(hyperopt_registry().get("results_dir").unwrap().required);
        assert!(!train_registry().contains("results_dir"));
    }

    #[test]
    fn test_required_train_options() {
        let required: Vec<&str> = train_registry()
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
            .collect();
        assert_eq!(required, vec!["data_path", "dataset_type"]);
    }

    #[test]
    fn test_defaults_are_well_typed() {
        for mode in [Mode::Train, Mode::Hyperopt, Mode::Predict] {
            for spec in registry(mode).iter() {
                if let Some(default) = &spec.default {
                    assert_eq!(
                        spec.check(default.clone()).as_ref().ok(),
                        Some(default),
                        "default for {} does not pass its own check",
                        spec.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_list_defaults() {
        let registry = train_registry();
        assert_eq!(
            registry.get("split_sizes").unwrap().default,
            Some(OptionValue::FloatList(vec![0.8, 0.1, 0.1]))
        );
        assert_eq!(
            registry.get("bert_substructure_sizes").unwrap().kind,
            OptionKind::IntList
        );
        assert_eq!(registry.get("metric").unwrap().default, None);
    }
}
