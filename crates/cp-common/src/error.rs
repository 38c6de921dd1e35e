//! Error types for configuration resolution.
//!
//! Every failure the engine can raise is a variant of [`Error`]. Variants carry
//! the offending field name(s) and, where relevant, the rejected value, so the
//! message alone is enough to fix the option bag.
//!
//! Errors also expose:
//! - Stable error codes for machine parsing
//! - A category for grouping
//! - A short headline and a remediation hint for humans
//!
//! # Agent-Facing Output
//!
//! Errors serialize to a structured [`ErrorReport`]:
//! ```json
//! {
//!   "code": 40,
//!   "category": "validation",
//!   "headline": "Incompatible Metric",
//!   "message": "metric \"auc\" is not valid for dataset type \"regression\"",
//!   "remediation": "Pick a metric allowed for the dataset type, or omit it to use the default."
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration resolution.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Option declarations (programming errors in the catalog).
    Registry,
    /// Raw option bag does not match the registry.
    Ingestion,
    /// A resolver stage could not compute a derived field.
    Resolution,
    /// Cross-field invariant violated.
    Validation,
    /// Filesystem and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Registry => write!(f, "registry"),
            ErrorCategory::Ingestion => write!(f, "ingestion"),
            ErrorCategory::Resolution => write!(f, "resolution"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for option registration, resolution and validation.
#[derive(Error, Debug)]
pub enum Error {
    // Registry errors (10-19)
    #[error("option \"{name}\" is already registered")]
    DuplicateOption { name: String },

    // Ingestion errors (20-29)
    #[error("missing required option \"{name}\"")]
    MissingRequiredOption { name: String },

    #[error("unknown option \"{name}\"")]
    UnknownOption { name: String },

    #[error("invalid value for option \"{name}\": {message}")]
    InvalidOptionValue { name: String, message: String },

    // Resolution errors (30-39)
    #[error("metric not implemented for kernel function \"{kernel_func}\"")]
    UnsupportedKernelFunction { kernel_func: String },

    #[error("failed to find any model checkpoints in directory \"{}\"", dir.display())]
    NoCheckpointsFound { dir: PathBuf },

    #[error("option \"{name}\" has {len} entries but must have between 1 and {groups}")]
    InvalidGroupCount {
        name: String,
        len: usize,
        groups: usize,
    },

    #[error("data directory \"{}\" contains no files", path.display())]
    EmptyDataDirectory { path: PathBuf },

    // Validation errors (40-49)
    #[error("metric \"{metric}\" is not valid for dataset type \"{dataset_type}\"")]
    IncompatibleMetric {
        metric: String,
        dataset_type: String,
    },

    #[error("jtnn requires a vocabulary file: {message}")]
    MissingVocabulary { message: String },

    #[error("incompatible modes: {message}")]
    IncompatibleMode { message: String },

    #[error("{mode} requires features_generator or features_path")]
    MissingFeatureSource { mode: String },

    #[error("ffn_num_layers must be >= 1 (got {value})")]
    InvalidLayerCount { value: i64 },

    #[error("invalid split configuration: {message}")]
    InvalidSplitConfiguration { message: String },

    #[error("invalid search configuration: {message}")]
    InvalidSearchConfiguration { message: String },

    // I/O errors (60-69)
    #[error("I/O error at \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Convenience constructor for filesystem failures.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Registry errors
    /// - 20-29: Ingestion errors
    /// - 30-39: Resolution errors
    /// - 40-49: Validation errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::DuplicateOption { .. } => 10,
            Error::MissingRequiredOption { .. } => 20,
            Error::UnknownOption { .. } => 21,
            Error::InvalidOptionValue { .. } => 22,
            Error::UnsupportedKernelFunction { .. } => 30,
            Error::NoCheckpointsFound { .. } => 31,
            Error::InvalidGroupCount { .. } => 32,
            Error::EmptyDataDirectory { .. } => 33,
            Error::IncompatibleMetric { .. } => 40,
            Error::MissingVocabulary { .. } => 41,
            Error::IncompatibleMode { .. } => 42,
            Error::MissingFeatureSource { .. } => 43,
            Error::InvalidLayerCount { .. } => 44,
            Error::InvalidSplitConfiguration { .. } => 45,
            Error::InvalidSearchConfiguration { .. } => 46,
            Error::Io { .. } => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DuplicateOption { .. } => ErrorCategory::Registry,

            Error::MissingRequiredOption { .. }
            | Error::UnknownOption { .. }
            | Error::InvalidOptionValue { .. } => ErrorCategory::Ingestion,

            Error::UnsupportedKernelFunction { .. }
            | Error::NoCheckpointsFound { .. }
            | Error::InvalidGroupCount { .. }
            | Error::EmptyDataDirectory { .. } => ErrorCategory::Resolution,

            Error::IncompatibleMetric { .. }
            | Error::MissingVocabulary { .. }
            | Error::IncompatibleMode { .. }
            | Error::MissingFeatureSource { .. }
            | Error::InvalidLayerCount { .. }
            | Error::InvalidSplitConfiguration { .. }
            | Error::InvalidSearchConfiguration { .. } => ErrorCategory::Validation,

            Error::Io { .. } | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::DuplicateOption { .. } => "Duplicate Option",
            Error::MissingRequiredOption { .. } => "Missing Required Option",
            Error::UnknownOption { .. } => "Unknown Option",
            Error::InvalidOptionValue { .. } => "Invalid Option Value",
            Error::UnsupportedKernelFunction { .. } => "Unsupported Kernel Function",
            Error::NoCheckpointsFound { .. } => "No Checkpoints Found",
            Error::InvalidGroupCount { .. } => "Invalid Learning Rate Group Count",
            Error::EmptyDataDirectory { .. } => "Empty Data Directory",
            Error::IncompatibleMetric { .. } => "Incompatible Metric",
            Error::MissingVocabulary { .. } => "Missing Vocabulary",
            Error::IncompatibleMode { .. } => "Incompatible Modes",
            Error::MissingFeatureSource { .. } => "Missing Feature Source",
            Error::InvalidLayerCount { .. } => "Invalid Layer Count",
            Error::InvalidSplitConfiguration { .. } => "Invalid Split Configuration",
            Error::InvalidSearchConfiguration { .. } => "Invalid Search Configuration",
            Error::Io { .. } => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::DuplicateOption { .. } => {
                "Two option declarations share a name. This is a bug in the option catalog."
            }
            Error::MissingRequiredOption { .. } => "Supply the option in the option bag.",
            Error::UnknownOption { .. } => {
                "Check the spelling against 'cp-core options <mode>', or remove the option."
            }
            Error::InvalidOptionValue { .. } => {
                "Use a value of the declared kind; choice options list their allowed values in 'cp-core options'."
            }
            Error::UnsupportedKernelFunction { .. } => {
                "Set kernel_func to one of features, features_dot or WL, or supply a metric explicitly."
            }
            Error::NoCheckpointsFound { .. } => {
                "Point checkpoint_dir at a directory tree containing model.pt files."
            }
            Error::InvalidGroupCount { .. } => {
                "Give one value per learning rate group (two when separate_ffn_lr is set), or a single value to broadcast."
            }
            Error::EmptyDataDirectory { .. } => {
                "Add at least one chunk file to the data directory, or point data_path at a single file."
            }
            Error::IncompatibleMetric { .. } => {
                "Pick a metric allowed for the dataset type, or omit it to use the default."
            }
            Error::MissingVocabulary { .. } => "Supply vocab_path pointing to an existing .vocab file.",
            Error::IncompatibleMode { .. } => "Disable one of the conflicting modes.",
            Error::MissingFeatureSource { .. } => "Supply features_generator or features_path.",
            Error::InvalidLayerCount { .. } => "Set ffn_num_layers to 1 or more.",
            Error::InvalidSplitConfiguration { .. } => {
                "scaffold_overlap needs split_type=scaffold_overlap; predetermined splits need both folds_file and test_fold_index."
            }
            Error::InvalidSearchConfiguration { .. } => {
                "Ensure 1 <= min_budget <= max_budget, eta >= 2 and n_iterations >= 1."
            }
            Error::Io { .. } => "Check that the path exists and is readable/writable.",
            Error::Json(_) => "Check the option file syntax with 'jq . <file>'.",
        }
    }

    /// Build a structured report for machine consumers.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            category: self.category(),
            headline: self.headline().to_string(),
            message: self.to_string(),
            remediation: self.remediation().to_string(),
        }
    }
}

/// Serializable view of an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: u32,
    pub category: ErrorCategory,
    pub headline: String,
    pub message: String,
    pub remediation: String,
}

impl ErrorReport {
    /// Format for a terminal: headline, reason and fix.
    pub fn human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline, self.message, self.remediation
        )
    }
}
