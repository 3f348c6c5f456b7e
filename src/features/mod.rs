pub mod config;
pub mod mel;
pub mod mfcc;
pub mod shape;

use crate::audio::{load_audio_file, resample, Waveform};
use crate::error::{AppError, Result};
use ndarray::Array2;
use std::path::Path;
use tracing::debug;

pub use config::{ExtractorConfig, SampleRatePolicy};
pub use mel::MelConfig;
pub use shape::{
    pad_or_truncate, to_feature_tensor, FeatureTensor, MAX_PAD_LEN, N_MFCC, TENSOR_SHAPE,
};

/// Turns an audio file into the fixed (1, 16, 8, 1) classifier input.
///
/// Holds configuration only; every call allocates its own buffers, so one
/// extractor can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Decode `path` and build the classifier input tensor
    pub fn extract(&self, path: &Path) -> Result<FeatureTensor> {
        let waveform = self.load(path)?;
        self.extract_waveform(&waveform)
    }

    /// Decode `path` at the configured feature sample rate
    pub fn load(&self, path: &Path) -> Result<Waveform> {
        let waveform = load_audio_file(path)?;
        self.conform(waveform)
    }

    /// Bring a natively decoded waveform to the configured feature sample rate
    pub fn conform(&self, waveform: Waveform) -> Result<Waveform> {
        match self.config.sample_rate {
            SampleRatePolicy::Native => Ok(waveform),
            SampleRatePolicy::Resample(target) => {
                let samples = resample(
                    &waveform.samples,
                    waveform.sample_rate,
                    target,
                    self.config.resample_quality,
                )?;
                Ok(Waveform::new(samples, target))
            }
        }
    }

    /// MFCC matrix of shape (128, frames) before any length normalisation
    pub fn coefficients(&self, waveform: &Waveform) -> Result<Array2<f32>> {
        if waveform.sample_rate == 0 {
            return Err(AppError::Decode("Audio has a sample rate of 0".to_string()));
        }
        if waveform.is_empty() {
            return Err(AppError::Shape(
                "Audio contains no samples; cannot compute coefficient frames".to_string(),
            ));
        }

        let mel_config = MelConfig::for_sample_rate(waveform.sample_rate);
        let coefficients = mfcc::compute_mfcc(&waveform.samples, &mel_config, N_MFCC);

        if coefficients.ncols() == 0 {
            return Err(AppError::Shape(format!(
                "No coefficient frames from {} samples",
                waveform.len()
            )));
        }

        Ok(coefficients)
    }

    /// Build the classifier input from an already decoded waveform
    pub fn extract_waveform(&self, waveform: &Waveform) -> Result<FeatureTensor> {
        let coefficients = self.coefficients(waveform)?;
        let normalized = pad_or_truncate(&coefficients, MAX_PAD_LEN);
        let tensor = to_feature_tensor(normalized.view())?;

        debug!(
            "MFCC shape: {:?}, normalized: {:?}, tensor: {:?}",
            coefficients.dim(),
            normalized.dim(),
            tensor.shape()
        );

        Ok(tensor)
    }
}
