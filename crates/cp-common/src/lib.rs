//! Shared types for chemprop configuration resolution.
//!
//! This crate provides foundational types shared by cp-config and cp-core:
//! - The error taxonomy with stable codes
//! - Choice enums for every choice-constrained option
//! - Output format specifications

pub mod choices;
pub mod error;
pub mod output;

pub use choices::{
    Activation, AdditionalFeature, BertMaskType, BertVocabFunc, Choice, DatasetType,
    FeaturesGenerator, KernelFunc, Metric, Optimizer, Scheduler, SplitType,
};
pub use error::{Error, ErrorCategory, ErrorReport, Result};
pub use output::OutputFormat;
