use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Spectrogram render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Message suitable for showing to the person who submitted the recording.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Decode(_) => {
                "The file could not be read as audio. Please upload a valid .wav file.".to_string()
            }
            AppError::Shape(_) => {
                "The recording is too short to analyse. Please upload a longer recording."
                    .to_string()
            }
            _ => "Something went wrong while analysing the recording. Please try again."
                .to_string(),
        }
    }

    /// Whether this failure is an expected outcome of bad input rather than a fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_) | AppError::Decode(_) | AppError::Shape(_)
        )
    }
}

impl From<hound::Error> for AppError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AppError::Decode(format!("File not found: {}", io))
            }
            other => AppError::Decode(other.to_string()),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::Render(e.to_string())
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
