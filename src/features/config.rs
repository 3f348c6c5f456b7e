use crate::audio::ResampleQuality;
use serde::{Deserialize, Serialize};

/// Rate the trained pipeline loads audio at before computing MFCCs
pub const DEFAULT_FEATURE_SAMPLE_RATE: u32 = 22050;

/// Sample rate used for feature extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleRatePolicy {
    /// Keep the file's own sample rate
    Native,
    /// Resample to a fixed rate
    Resample(u32),
}

impl Default for SampleRatePolicy {
    fn default() -> Self {
        SampleRatePolicy::Resample(DEFAULT_FEATURE_SAMPLE_RATE)
    }
}

/// Configuration for feature extraction.
///
/// Only the decode-side parameters are configurable. STFT, mel and tensor
/// layout constants are fixed by the trained classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractorConfig {
    pub sample_rate: SampleRatePolicy,
    pub resample_quality: ResampleQuality,
}

impl ExtractorConfig {
    /// Keep the decoded file at its own sample rate
    pub fn native() -> Self {
        Self {
            sample_rate: SampleRatePolicy::Native,
            ..Default::default()
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = SampleRatePolicy::Resample(sample_rate);
        self
    }

    pub fn with_resample_quality(mut self, quality: ResampleQuality) -> Self {
        self.resample_quality = quality;
        self
    }
}
