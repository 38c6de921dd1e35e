//! Typed training options, as ingested from a prepared option bag.
//!
//! These are the caller's values before any resolver stage has run: the
//! negative-sense flags are still present, optional FFN sizes may be unset,
//! and learning rates are unscaled. Groups that pass through resolution
//! untouched reuse the output types from [`crate::resolved`].

use std::path::PathBuf;

use cp_common::{DatasetType, FeaturesGenerator, KernelFunc, Metric, Result};

use crate::reader::OptionReader;
use crate::resolved::{
    AdversarialSettings, ModelSettings, PretrainingSettings, SearchSettings, SplitSettings,
};

/// Every training option, typed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub data: DataOptions,
    pub features: FeatureOptions,
    pub task: TaskOptions,
    pub split: SplitSettings,
    pub runtime: RuntimeOptions,
    pub training: TrainingOptions,
    pub learning_rates: LearningRateOptions,
    pub pretraining: PretrainingSettings,
    pub model: ModelSettings,
    pub ffn: FfnOptions,
    pub adversarial: AdversarialSettings,
    pub checkpoints: CheckpointOptions,
    pub save_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataOptions {
    /// A file, or a directory of pre-chunked files.
    pub data_path: PathBuf,
    pub prespecified_chunks_max_examples_per_epoch: i64,
    pub separate_test_set: Option<PathBuf>,
    pub max_data_size: Option<i64>,
    pub num_chunks: i64,
    pub chunk_temp_dir: PathBuf,
    pub memoize_chunks: bool,
    pub sparse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOptions {
    pub features_generator: Vec<FeaturesGenerator>,
    pub features_path: Option<PathBuf>,
    pub features_only: bool,
    pub no_features_scaling: bool,
    pub additional_atom_features: Vec<cp_common::AdditionalFeature>,
    pub functional_group_smarts: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskOptions {
    pub dataset_type: DatasetType,
    pub metric: Option<Metric>,
    pub test: bool,
    pub predict_features: bool,
    pub predict_features_and_task: bool,
    pub task_weight: f64,
    pub num_bins: i64,
    pub unsupervised_n_clusters: i64,
    pub show_individual_scores: bool,
    pub labels_to_show: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    pub no_cuda: bool,
    pub quiet: bool,
    pub log_frequency: i64,
    pub sequential: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub epochs: i64,
    pub batch_size: i64,
    pub truncate_outliers: bool,
    pub optimizer: cp_common::Optimizer,
    pub scheduler: cp_common::Scheduler,
    pub separate_ffn_lr: bool,
    pub lr_decay_rate: f64,
    pub max_grad_norm: Option<f64>,
    pub no_target_scaling: bool,
    pub last_batch: bool,
}

/// Unbroadcast, unscaled learning rate sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningRateOptions {
    pub init_lr: Vec<f64>,
    pub max_lr: Vec<f64>,
    pub final_lr: Vec<f64>,
    pub lr_scaler: Vec<f64>,
    pub warmup_epochs: Vec<f64>,
    pub weight_decay: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FfnOptions {
    pub ffn_hidden_size: Option<i64>,
    pub ffn_input_dropout: Option<f64>,
    pub ffn_dropout: Option<f64>,
    pub ffn_num_layers: i64,
    pub mayr_layers: bool,
    pub freeze_encoder: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointOptions {
    pub checkpoint_dir: Option<PathBuf>,
    pub ensemble_size: i64,
    pub load_encoder_only: bool,
}

impl TrainOptions {
    pub fn read(r: &mut OptionReader) -> Result<Self> {
        Ok(TrainOptions {
            data: DataOptions {
                data_path: r.path("data_path")?,
                prespecified_chunks_max_examples_per_epoch: r
                    .int("prespecified_chunks_max_examples_per_epoch")?,
                separate_test_set: r.opt_path("separate_test_set")?,
                max_data_size: r.opt_int("max_data_size")?,
                num_chunks: r.int("num_chunks")?,
                chunk_temp_dir: r.path("chunk_temp_dir")?,
                memoize_chunks: r.flag("memoize_chunks")?,
                sparse: r.flag("sparse")?,
            },
            features: FeatureOptions {
                features_generator: r.choice_list("features_generator")?,
                features_path: r.opt_path("features_path")?,
                features_only: r.flag("features_only")?,
                no_features_scaling: r.flag("no_features_scaling")?,
                additional_atom_features: r.choice_list("additional_atom_features")?,
                functional_group_smarts: r.path("functional_group_smarts")?,
            },
            task: TaskOptions {
                dataset_type: r.choice("dataset_type")?,
                metric: r.opt_choice("metric")?,
                test: r.flag("test")?,
                predict_features: r.flag("predict_features")?,
                predict_features_and_task: r.flag("predict_features_and_task")?,
                task_weight: r.float("task_weight")?,
                num_bins: r.int("num_bins")?,
                unsupervised_n_clusters: r.int("unsupervised_n_clusters")?,
                show_individual_scores: r.flag("show_individual_scores")?,
                labels_to_show: r.opt_string_list("labels_to_show")?,
            },
            split: SplitSettings {
                split_type: r.choice("split_type")?,
                split_sizes: r.float_list("split_sizes")?,
                scaffold_overlap: r.opt_float("scaffold_overlap")?,
                split_test_by_overlap_dataset: r.opt_path("split_test_by_overlap_dataset")?,
                num_folds: r.int("num_folds")?,
                folds_file: r.opt_path("folds_file")?,
                test_fold_index: r.opt_int("test_fold_index")?,
                seed: r.int("seed")?,
            },
            runtime: RuntimeOptions {
                no_cuda: r.flag("no_cuda")?,
                quiet: r.flag("quiet")?,
                log_frequency: r.int("log_frequency")?,
                sequential: r.flag("sequential")?,
            },
            training: TrainingOptions {
                epochs: r.int("epochs")?,
                batch_size: r.int("batch_size")?,
                truncate_outliers: r.flag("truncate_outliers")?,
                optimizer: r.choice("optimizer")?,
                scheduler: r.choice("scheduler")?,
                separate_ffn_lr: r.flag("separate_ffn_lr")?,
                lr_decay_rate: r.float("lr_decay_rate")?,
                max_grad_norm: r.opt_float("max_grad_norm")?,
                no_target_scaling: r.flag("no_target_scaling")?,
                last_batch: r.flag("last_batch")?,
            },
            learning_rates: LearningRateOptions {
                init_lr: r.float_list("init_lr")?,
                max_lr: r.float_list("max_lr")?,
                final_lr: r.float_list("final_lr")?,
                lr_scaler: r.float_list("lr_scaler")?,
                warmup_epochs: r.float_list("warmup_epochs")?,
                weight_decay: r.float_list("weight_decay")?,
            },
            pretraining: PretrainingSettings {
                bert_mask_prob: r.float("bert_mask_prob")?,
                bert_vocab_func: r.choice("bert_vocab_func")?,
                bert_max_vocab_size: r.int("bert_max_vocab_size")?,
                bert_smiles_to_sample: r.int("bert_smiles_to_sample")?,
                bert_substructure_sizes: r.int_list("bert_substructure_sizes")?,
                bert_mask_type: r.choice("bert_mask_type")?,
                bert_mask_bonds: r.flag("bert_mask_bonds")?,
                additional_output_features: r.choice_list("additional_output_features")?,
                kernel_func: r.opt_choice::<KernelFunc>("kernel_func")?,
            },
            model: ModelSettings {
                hidden_size: r.int("hidden_size")?,
                bias: r.flag("bias")?,
                depth: r.int("depth")?,
                diff_depth_weights: r.flag("diff_depth_weights")?,
                layers_per_message: r.int("layers_per_message")?,
                layer_norm: r.flag("layer_norm")?,
                normalize_messages: r.flag("normalize_messages")?,
                dropout: r.float("dropout")?,
                activation: r.choice("activation")?,
                attention: r.flag("attention")?,
                message_attention: r.flag("message_attention")?,
                global_attention: r.flag("global_attention")?,
                message_attention_heads: r.int("message_attention_heads")?,
                master_node: r.flag("master_node")?,
                master_dim: r.int("master_dim")?,
                use_master_as_output: r.flag("use_master_as_output")?,
                add_hs: r.flag("addHs")?,
                three_d: r.flag("three_d")?,
                virtual_edges: r.flag("virtual_edges")?,
                drop_virtual_edges: r.flag("drop_virtual_edges")?,
                learn_virtual_edges: r.flag("learn_virtual_edges")?,
                deepset: r.flag("deepset")?,
                set2set: r.flag("set2set")?,
                set2set_iters: r.int("set2set_iters")?,
                jtnn: r.flag("jtnn")?,
                vocab_path: r.opt_path("vocab_path")?,
            },
            ffn: FfnOptions {
                ffn_hidden_size: r.opt_int("ffn_hidden_size")?,
                ffn_input_dropout: r.opt_float("ffn_input_dropout")?,
                ffn_dropout: r.opt_float("ffn_dropout")?,
                ffn_num_layers: r.int("ffn_num_layers")?,
                mayr_layers: r.flag("mayr_layers")?,
                freeze_encoder: r.flag("freeze_encoder")?,
            },
            adversarial: AdversarialSettings {
                adversarial: r.flag("adversarial")?,
                wgan_beta: r.float("wgan_beta")?,
                gan_d_per_g: r.int("gan_d_per_g")?,
                gan_lr_mult: r.float("gan_lr_mult")?,
                gan_use_scheduler: r.flag("gan_use_scheduler")?,
                moe: r.flag("moe")?,
                cluster_split_seed: r.int("cluster_split_seed")?,
                cluster_max_ratio: r.float("cluster_max_ratio")?,
                batch_domain_encs: r.flag("batch_domain_encs")?,
                lambda_moe: r.float("lambda_moe")?,
                lambda_critic: r.float("lambda_critic")?,
                lambda_entropy: r.float("lambda_entropy")?,
                m_rank: r.int("m_rank")?,
                num_sources: r.int("num_sources")?,
            },
            checkpoints: CheckpointOptions {
                checkpoint_dir: r.opt_path("checkpoint_dir")?,
                ensemble_size: r.int("ensemble_size")?,
                load_encoder_only: r.flag("load_encoder_only")?,
            },
            save_dir: r.opt_path("save_dir")?,
        })
    }
}

impl SearchSettings {
    pub fn read(r: &mut OptionReader) -> Result<Self> {
        Ok(SearchSettings {
            results_dir: r.path("results_dir")?,
            port: r.int("port")?,
            min_budget: r.int("min_budget")?,
            max_budget: r.int("max_budget")?,
            eta: r.int("eta")?,
            n_iterations: r.int("n_iterations")?,
        })
    }
}
