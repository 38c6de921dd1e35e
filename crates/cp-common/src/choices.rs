//! Choice-constrained option values.
//!
//! Each choice option in the registry is backed by one of these enums, so a
//! resolved configuration can never hold a value outside its allowed set.
//! The wire spelling of every variant (as accepted in the option bag and
//! emitted in the resolved output) is fixed by the `=>` literal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Common surface of every choice enum.
pub trait Choice: Sized + Copy + 'static {
    /// Option-facing type name, used in error messages.
    const KIND: &'static str;
    /// Accepted spellings, in declaration order.
    const NAMES: &'static [&'static str];

    fn parse(s: &str) -> Option<Self>;
    fn as_str(&self) -> &'static str;
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl Choice for $name {
            const KIND: &'static str = $kind;
            const NAMES: &'static [&'static str] = &[$($text),+];

            fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(Choice::as_str(self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$name as Choice>::parse(s).ok_or_else(|| {
                    format!(
                        "unknown {} \"{}\"; expected one of: {}",
                        $kind,
                        s,
                        <$name as Choice>::NAMES.join(", ")
                    )
                })
            }
        }
    };
}

choice_enum! {
    /// Type of dataset; determines the loss function used during training.
    DatasetType ("dataset type") {
        Classification => "classification",
        Regression => "regression",
        RegressionWithBinning => "regression_with_binning",
        /// Cluster-label pretraining.
        Unsupervised => "unsupervised",
        /// Masked-atom pretraining.
        BertPretraining => "bert_pretraining",
        Kernel => "kernel",
    }
}

choice_enum! {
    /// Method of splitting the data into train/validation/test.
    SplitType ("split type") {
        Random => "random",
        Scaffold => "scaffold",
        ScaffoldOne => "scaffold_one",
        ScaffoldOverlap => "scaffold_overlap",
        Predetermined => "predetermined",
    }
}

choice_enum! {
    /// Evaluation metric.
    Metric ("metric") {
        Auc => "auc",
        PrcAuc => "prc-auc",
        Rmse => "rmse",
        Mae => "mae",
        R2 => "r2",
        Accuracy => "accuracy",
        ArgmaxAccuracy => "argmax_accuracy",
        LogLoss => "log_loss",
        MajorityBaselineAccuracy => "majority_baseline_accuracy",
    }
}

impl Metric {
    /// Whether a lower score is better for this metric.
    pub fn minimizes(self) -> bool {
        matches!(self, Metric::Rmse | Metric::Mae | Metric::LogLoss)
    }
}

choice_enum! {
    Optimizer ("optimizer") {
        Adam => "Adam",
        Sgd => "SGD",
    }
}

choice_enum! {
    /// Learning rate scheduler.
    Scheduler ("scheduler") {
        Noam => "noam",
        None => "none",
        Decay => "decay",
    }
}

choice_enum! {
    Activation ("activation") {
        Relu => "ReLU",
        LeakyRelu => "LeakyReLU",
        Prelu => "PReLU",
        Tanh => "tanh",
    }
}

choice_enum! {
    /// Vocabulary function for bert-style pretraining.
    BertVocabFunc ("vocabulary function") {
        Atom => "atom",
        AtomFeatures => "atom_features",
        FeatureVector => "feature_vector",
        Substructure => "substructure",
    }
}

choice_enum! {
    /// How atoms are masked during bert-style pretraining.
    BertMaskType ("mask type") {
        Random => "random",
        Correlation => "correlation",
        Cluster => "cluster",
    }
}

choice_enum! {
    /// Kernel function for kernel pretraining.
    KernelFunc ("kernel function") {
        Features => "features",
        FeaturesDot => "features_dot",
        Wl => "WL",
    }
}

impl KernelFunc {
    /// Kernels computed from molecule feature vectors.
    pub fn requires_features(self) -> bool {
        matches!(self, KernelFunc::Features | KernelFunc::FeaturesDot)
    }
}

choice_enum! {
    /// Method of generating additional molecule features.
    FeaturesGenerator ("features generator") {
        Morgan => "morgan",
        MorganCount => "morgan_count",
        Rdkit2d => "rdkit_2d",
        Mordred => "mordred",
    }
}

choice_enum! {
    /// Extra atom-level features.
    AdditionalFeature ("additional feature") {
        FunctionalGroup => "functional_group",
    }
}
