//! ONNX Runtime backend for the speech classifier
//!
//! The trained network takes a single float input of shape [1, 16, 8, 1] and
//! returns a sigmoid probability of shape [1, 1].

use crate::classifier::Classifier;
use crate::error::{AppError, Result};
use crate::features::{FeatureTensor, TENSOR_SHAPE};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// ONNX Runtime classifier session
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    /// Load the classifier model from an `.onnx` file
    pub fn load(model_path: &Path) -> Result<Self> {
        info!("Loading classifier model from {:?}", model_path);

        if !model_path.exists() {
            return Err(AppError::Classifier(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        // commit() returns bool in ort 2.0; a second init is harmless
        let _ = ort::init().with_name("speechscreen").commit();

        let session = Session::builder()
            .map_err(|e| AppError::Classifier(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::Classifier(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| AppError::Classifier(format!("Failed to load model: {}", e)))?;

        info!("Classifier model loaded");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "ONNX Runtime"
    }

    fn predict(&self, features: &FeatureTensor) -> Result<f32> {
        let input = Tensor::from_array((TENSOR_SHAPE, features.to_vec()))
            .map_err(|e| AppError::Classifier(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| AppError::Classifier(format!("Inference failed: {}", e)))?;

        // outputs: [1, 1]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::Classifier(format!("Failed to extract output: {}", e)))?;

        let probability = data
            .first()
            .copied()
            .ok_or_else(|| AppError::Classifier("Model returned an empty output".to_string()))?;

        debug!("Classifier output shape {:?}, probability {}", shape, probability);

        validate_probability(probability)
    }
}

fn validate_probability(probability: f32) -> Result<f32> {
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(AppError::Classifier(format!(
            "Model output {} is not a probability",
            probability
        )));
    }
    Ok(probability)
}
