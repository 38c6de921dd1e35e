//! Chemprop training configuration: option registry, resolution and validation.
//!
//! This crate provides:
//! - The option registry and the built-in option catalog
//! - Raw option bag ingestion with kind and choice checking
//! - The resolver stages that derive a complete configuration
//! - The fail-fast cross-field validator
//!
//! ```no_run
//! use cp_config::{resolve_train, FixedGpuProbe, RawOptionBag};
//!
//! let bag = RawOptionBag::new()
//!     .with("data_path", "data/tox21.csv")
//!     .with("dataset_type", "classification");
//! let config = resolve_train(bag, &FixedGpuProbe(false))?;
//! assert_eq!(config.evaluation.metric.to_string(), "auc");
//! # Ok::<(), cp_common::Error>(())
//! ```

pub mod bag;
pub mod catalog;
pub mod discover;
pub mod options;
pub mod platform;
pub mod reader;
pub mod registry;
pub mod resolve;
pub mod resolved;
pub mod validate;
pub mod value;

pub use bag::RawOptionBag;
pub use catalog::{
    hyperopt_registry, predict_registry, registry, train_registry, Mode, CHECKPOINT_FILENAME,
};
pub use platform::{FixedGpuProbe, GpuProbe};
pub use registry::{OptionRegistry, OptionSpec};
pub use resolve::{resolve_hyperopt, resolve_predict, resolve_train};
pub use resolved::{CheckpointSet, PredictConfig, ResolvedConfig, SaveDir, SearchSettings};
pub use validate::{validate, validate_search};
pub use value::{OptionKind, OptionValue};
