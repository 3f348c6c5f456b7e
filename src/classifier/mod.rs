pub mod onnxruntime;

use crate::error::Result;
use crate::features::FeatureTensor;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use onnxruntime::OnnxClassifier;

/// Probabilities at or below this value are labelled [`Label::Normal`]
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Screening outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Dysarthric,
}

impl Label {
    /// Map a classifier probability to a label.
    ///
    /// The threshold itself belongs to `Normal`.
    pub fn from_probability(probability: f32) -> Self {
        if probability <= DECISION_THRESHOLD {
            Label::Normal
        } else {
            Label::Dysarthric
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::Dysarthric => "Dysarthric",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for the trained speech classifier
///
/// Implementations are constructed once at startup and handed to callers;
/// there is no global model instance.
pub trait Classifier: Send + Sync {
    /// Get the classifier name for logging
    fn name(&self) -> &str;

    /// Probability in [0, 1] that the speech is dysarthric
    fn predict(&self, features: &FeatureTensor) -> Result<f32>;
}
