pub mod audio;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod features;
pub mod spectrogram;

use crate::error::{AppError, Result};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use classifier::{Classifier, Label, OnnxClassifier};
pub use commands::{predict_file, run_prediction, AppState, Notice, Outcome, Prediction};
pub use config::AppConfig;
pub use features::{FeatureExtractor, FeatureTensor};

const DEFAULT_LOG_FILTER: &str = "info,speechscreen_lib=debug";

/// Initialize logging to the console and, optionally, a log file.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::Config(format!("Failed to create log file {:?}: {}", path, e))
            })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr)) // Console output
        .with(file_layer) // File output
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to install tracing subscriber: {}", e)))
}
