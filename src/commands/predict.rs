use crate::audio::load_audio_file;
use crate::classifier::{Classifier, Label};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::features::FeatureExtractor;
use crate::spectrogram::save_spectrogram;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Long-lived state shared by every request: configuration, the feature
/// extractor and the loaded classifier.
pub struct AppState {
    pub config: AppConfig,
    pub extractor: FeatureExtractor,
    pub classifier: Box<dyn Classifier>,
}

impl AppState {
    pub fn new(config: AppConfig, classifier: Box<dyn Classifier>) -> Self {
        let extractor = FeatureExtractor::new(config.extractor.clone());
        Self {
            config,
            extractor,
            classifier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    pub created_at: String,
    pub file_name: String,
    pub duration_ms: i64,
    pub probability: f32,
    pub label: Label,
    pub spectrogram_path: PathBuf,
}

/// Message shown when a request fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success(Prediction),
    Failure(Notice),
}

/// Check the submitted file name the way the upload form does
pub fn validate_upload_name(file_name: Option<&str>) -> Result<&str> {
    let name = match file_name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(AppError::InvalidInput("No file selected.".to_string())),
    };

    if !name.ends_with(".wav") {
        return Err(AppError::InvalidInput(
            "Invalid file type. Please upload a .wav file.".to_string(),
        ));
    }

    Ok(name)
}

/// Screen one recording.
///
/// The upload is copied to a per-request `<uuid>.wav`, a spectrogram is
/// written to `<uuid>.png`, and the copy is removed once the request is done.
pub fn predict_file(state: &AppState, source: &Path, file_name: Option<&str>) -> Result<Prediction> {
    let file_name = validate_upload_name(file_name)?.to_string();

    if !source.is_file() {
        return Err(AppError::Decode(format!("File not found: {:?}", source)));
    }

    state.config.ensure_dirs()?;

    let id = Uuid::new_v4().to_string();
    let upload_path = state.config.upload_dir.join(format!("{}.wav", id));
    let spectrogram_path = state.config.spectrogram_dir.join(format!("{}.png", id));

    std::fs::copy(source, &upload_path)?;
    info!("Screening {:?} as request {}", file_name, id);

    let result = screen_upload(state, &upload_path, &spectrogram_path);

    if let Err(e) = std::fs::remove_file(&upload_path) {
        warn!("Failed to remove upload {:?}: {}", upload_path, e);
    }

    let (probability, duration_ms) = match result {
        Ok(values) => values,
        Err(e) => {
            if spectrogram_path.exists() {
                let _ = std::fs::remove_file(&spectrogram_path);
            }
            return Err(e);
        }
    };

    let label = Label::from_probability(probability);
    info!(
        "Request {}: probability {:.4} -> {} ({})",
        id,
        probability,
        label,
        state.classifier.name()
    );

    Ok(Prediction {
        id,
        created_at: chrono::Utc::now().to_rfc3339(),
        file_name,
        duration_ms,
        probability,
        label,
        spectrogram_path,
    })
}

fn screen_upload(state: &AppState, upload_path: &Path, spectrogram_path: &Path) -> Result<(f32, i64)> {
    let waveform = load_audio_file(upload_path)?;
    let duration_ms = waveform.duration_ms();

    save_spectrogram(&waveform, spectrogram_path, &state.config.spectrogram)?;

    let features = state
        .extractor
        .extract_waveform(&state.extractor.conform(waveform)?)?;
    let probability = state.classifier.predict(&features)?;

    Ok((probability, duration_ms))
}

/// Run [`predict_file`] and turn any failure into a user-facing notice
pub fn run_prediction(state: &AppState, source: &Path, file_name: Option<&str>) -> Outcome {
    match predict_file(state, source, file_name) {
        Ok(prediction) => Outcome::Success(prediction),
        Err(e) => {
            if e.is_expected() {
                warn!("Prediction rejected: {}", e);
            } else {
                error!("Error during prediction: {}", e);
            }
            Outcome::Failure(Notice {
                message: e.user_message(),
            })
        }
    }
}
