//! The fully resolved configuration handed to downstream collaborators.
//!
//! Settings are grouped by concern, but every group is flattened on
//! serialization so the JSON form is a single object keyed by option name.
//! Options that were absent serialize as `null`; the negative-sense flags and
//! `lr_scaler` never appear.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cp_common::{
    Activation, AdditionalFeature, BertMaskType, BertVocabFunc, DatasetType, FeaturesGenerator,
    KernelFunc, Metric, Optimizer, Scheduler, SplitType,
};
use serde::{Serialize, Serializer};
use tempfile::TempDir;

/// Resolved training configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    #[serde(flatten)]
    pub data: DataSettings,
    #[serde(flatten)]
    pub features: FeatureSettings,
    #[serde(flatten)]
    pub task: TaskSettings,
    #[serde(flatten)]
    pub evaluation: EvaluationSettings,
    #[serde(flatten)]
    pub split: SplitSettings,
    #[serde(flatten)]
    pub runtime: RuntimeSettings,
    #[serde(flatten)]
    pub training: TrainingSettings,
    #[serde(flatten)]
    pub learning_rates: LearningRateGroups,
    #[serde(flatten)]
    pub pretraining: PretrainingSettings,
    #[serde(flatten)]
    pub model: ModelSettings,
    #[serde(flatten)]
    pub ffn: FfnSettings,
    #[serde(flatten)]
    pub adversarial: AdversarialSettings,
    #[serde(flatten)]
    pub checkpoints: CheckpointSettings,
    pub save_dir: SaveDir,
    /// Present only for hyperparameter search runs.
    #[serde(flatten)]
    pub search: Option<SearchSettings>,
}

impl ResolvedConfig {
    /// One-line description for logs and the `summary` output format.
    pub fn summary(&self) -> String {
        let checkpoints = match &self.checkpoints.checkpoint_paths {
            Some(set) => format!("{} checkpoint(s)", set.len()),
            None => "no checkpoints".to_string(),
        };
        let mut line = format!(
            "{} | metric={} ({}) | epochs={} | lr groups={} | ensemble={} | {} | cuda={} | save_dir={}",
            self.task.dataset_type,
            self.evaluation.metric,
            if self.evaluation.minimize_score {
                "minimize"
            } else {
                "maximize"
            },
            self.training.epochs,
            self.learning_rates.num_lr_groups,
            self.checkpoints.ensemble_size,
            checkpoints,
            if self.runtime.cuda_enabled { "on" } else { "off" },
            self.save_dir.path().display(),
        );
        if let Some(chunks) = &self.data.prespecified_chunk_dir {
            line.push_str(&format!(" | chunks={}", chunks.display()));
        }
        if let Some(search) = &self.search {
            line.push_str(&format!(
                " | search budget={}..{} eta={} iterations={}",
                search.min_budget, search.max_budget, search.eta, search.n_iterations
            ));
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSettings {
    /// A single data file. For chunked data this is the schema probe file.
    pub data_path: PathBuf,
    /// Set when `data_path` was given as a directory of chunks.
    pub prespecified_chunk_dir: Option<PathBuf>,
    pub prespecified_chunks_max_examples_per_epoch: i64,
    pub separate_test_set: Option<PathBuf>,
    pub max_data_size: Option<i64>,
    pub num_chunks: i64,
    pub chunk_temp_dir: PathBuf,
    pub memoize_chunks: bool,
    pub sparse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSettings {
    /// `None` when no generator was requested (an empty list counts as none).
    pub features_generator: Option<Vec<FeaturesGenerator>>,
    pub features_path: Option<PathBuf>,
    pub features_only: bool,
    pub use_input_features: bool,
    pub features_scaling: bool,
    pub additional_atom_features: Vec<AdditionalFeature>,
    pub functional_group_smarts: PathBuf,
}

impl FeatureSettings {
    /// Whether a generator or a precomputed features file was supplied.
    pub fn has_source(&self) -> bool {
        self.features_generator.is_some() || self.features_path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSettings {
    pub dataset_type: DatasetType,
    pub test: bool,
    pub predict_features: bool,
    pub predict_features_and_task: bool,
    pub task_weight: f64,
    pub num_bins: i64,
    pub unsupervised_n_clusters: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSettings {
    pub metric: Metric,
    /// Lower scores are better for the chosen metric.
    pub minimize_score: bool,
    pub show_individual_scores: bool,
    pub labels_to_show: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSettings {
    pub split_type: SplitType,
    pub split_sizes: Vec<f64>,
    pub scaffold_overlap: Option<f64>,
    pub split_test_by_overlap_dataset: Option<PathBuf>,
    pub num_folds: i64,
    pub folds_file: Option<PathBuf>,
    pub test_fold_index: Option<i64>,
    pub seed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeSettings {
    pub cuda_enabled: bool,
    pub quiet: bool,
    pub log_frequency: i64,
    pub sequential: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSettings {
    pub epochs: i64,
    pub batch_size: i64,
    pub truncate_outliers: bool,
    pub optimizer: Optimizer,
    pub scheduler: Scheduler,
    pub separate_ffn_lr: bool,
    pub lr_decay_rate: f64,
    pub max_grad_norm: Option<f64>,
    pub target_scaling: bool,
    pub last_batch: bool,
}

/// Per-group learning rate parameters.
///
/// Every sequence has exactly `num_lr_groups` entries. The three rates are
/// already multiplied by their scale factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningRateGroups {
    pub num_lr_groups: usize,
    pub init_lr: Vec<f64>,
    pub max_lr: Vec<f64>,
    pub final_lr: Vec<f64>,
    pub warmup_epochs: Vec<f64>,
    pub weight_decay: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PretrainingSettings {
    pub bert_mask_prob: f64,
    pub bert_vocab_func: BertVocabFunc,
    pub bert_max_vocab_size: i64,
    pub bert_smiles_to_sample: i64,
    pub bert_substructure_sizes: Vec<i64>,
    pub bert_mask_type: BertMaskType,
    pub bert_mask_bonds: bool,
    pub additional_output_features: Vec<AdditionalFeature>,
    pub kernel_func: Option<KernelFunc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSettings {
    pub hidden_size: i64,
    pub bias: bool,
    pub depth: i64,
    pub diff_depth_weights: bool,
    pub layers_per_message: i64,
    pub layer_norm: bool,
    pub normalize_messages: bool,
    pub dropout: f64,
    pub activation: Activation,
    pub attention: bool,
    pub message_attention: bool,
    pub global_attention: bool,
    pub message_attention_heads: i64,
    pub master_node: bool,
    pub master_dim: i64,
    pub use_master_as_output: bool,
    #[serde(rename = "addHs")]
    pub add_hs: bool,
    pub three_d: bool,
    pub virtual_edges: bool,
    pub drop_virtual_edges: bool,
    pub learn_virtual_edges: bool,
    pub deepset: bool,
    pub set2set: bool,
    pub set2set_iters: i64,
    pub jtnn: bool,
    pub vocab_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FfnSettings {
    pub ffn_hidden_size: i64,
    pub ffn_input_dropout: f64,
    pub ffn_dropout: f64,
    pub ffn_num_layers: i64,
    pub mayr_layers: bool,
    pub freeze_encoder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdversarialSettings {
    pub adversarial: bool,
    pub wgan_beta: f64,
    pub gan_d_per_g: i64,
    pub gan_lr_mult: f64,
    pub gan_use_scheduler: bool,
    pub moe: bool,
    pub cluster_split_seed: i64,
    pub cluster_max_ratio: f64,
    pub batch_domain_encs: bool,
    pub lambda_moe: f64,
    pub lambda_critic: f64,
    pub lambda_entropy: f64,
    pub m_rank: i64,
    pub num_sources: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointSettings {
    pub checkpoint_dir: Option<PathBuf>,
    /// Discovered checkpoints; `None` when no checkpoint directory was given.
    pub checkpoint_paths: Option<CheckpointSet>,
    /// Equals the number of discovered checkpoints when a directory was given.
    pub ensemble_size: i64,
    pub load_encoder_only: bool,
}

/// Checkpoint files found under a checkpoint directory, in sorted order.
///
/// Never empty: discovery fails instead of producing an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CheckpointSet {
    paths: Vec<PathBuf>,
}

impl CheckpointSet {
    pub(crate) fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Where checkpoints are written.
///
/// A temporary directory allocated during resolution is owned here and
/// removed only when the last clone of the owning configuration is dropped.
#[derive(Debug, Clone)]
pub enum SaveDir {
    /// A caller-supplied directory, created if absent.
    Explicit(PathBuf),
    /// A temporary directory owned for the lifetime of the configuration.
    Temporary(Arc<TempDir>),
}

impl SaveDir {
    pub fn path(&self) -> &Path {
        match self {
            SaveDir::Explicit(path) => path,
            SaveDir::Temporary(dir) => dir.path(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, SaveDir::Temporary(_))
    }
}

impl PartialEq for SaveDir {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl fmt::Display for SaveDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

impl Serialize for SaveDir {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.path().serialize(serializer)
    }
}

/// Hyperparameter search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSettings {
    pub results_dir: PathBuf,
    pub port: i64,
    pub min_budget: i64,
    pub max_budget: i64,
    pub eta: i64,
    pub n_iterations: i64,
}

/// Prediction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictConfig {
    pub test_path: PathBuf,
    pub preds_path: PathBuf,
    pub compound_names: bool,
    pub write_smiles: bool,
}
