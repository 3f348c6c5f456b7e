use crate::error::{AppError, Result};
use crate::features::ExtractorConfig;
use crate::spectrogram::SpectrogramConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Application configuration, loaded from an optional JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Trained classifier exported to ONNX
    pub model_path: PathBuf,
    /// Per-request copies of submitted recordings
    pub upload_dir: PathBuf,
    /// Rendered spectrogram images
    pub spectrogram_dir: PathBuf,
    /// Optional log file written alongside console output
    pub log_file: Option<PathBuf>,
    pub extractor: ExtractorConfig,
    pub spectrogram: SpectrogramConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/model.onnx"),
            upload_dir: PathBuf::from("static/uploads"),
            spectrogram_dir: PathBuf::from("static/spectrograms"),
            log_file: None,
            extractor: ExtractorConfig::default(),
            spectrogram: SpectrogramConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from `path`, or use defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        info!("Loading configuration from {:?}", path);
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("Invalid configuration {:?}: {}", path, e)))
    }

    /// Create the upload and spectrogram directories
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.spectrogram_dir)?;
        Ok(())
    }

    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = model_path.into();
        self
    }

    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self
    }

    pub fn with_spectrogram_dir(mut self, spectrogram_dir: impl Into<PathBuf>) -> Self {
        self.spectrogram_dir = spectrogram_dir.into();
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = Some(log_file.into());
        self
    }
}
