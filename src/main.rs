use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speechscreen_lib::spectrogram::generate_spectrogram;
use speechscreen_lib::{
    init_logging, run_prediction, AppConfig, AppState, FeatureExtractor, OnnxClassifier, Outcome,
};
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "speechscreen",
    about = "Screen WAV speech recordings for dysarthria"
)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the classifier model path (.onnx)
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    /// Override the directory for per-request upload copies
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,
    /// Override the directory for spectrogram images
    #[arg(long, global = true)]
    spectrogram_dir: Option<PathBuf>,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a recording and render its spectrogram
    Predict { file: PathBuf },
    /// Print the classifier input tensor for a recording as JSON
    Features { file: PathBuf },
    /// Render a mel spectrogram image for a recording
    Spectrogram {
        file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    init_logging(config.log_file.as_deref()).context("failed to initialise logging")?;

    match cli.command {
        Commands::Predict { file } => run_predict(config, &file),
        Commands::Features { file } => run_features(&config, &file),
        Commands::Spectrogram { file, output } => run_spectrogram(&config, &file, output),
    }
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(model) = &cli.model {
        config = config.with_model_path(model);
    }
    if let Some(dir) = &cli.upload_dir {
        config = config.with_upload_dir(dir);
    }
    if let Some(dir) = &cli.spectrogram_dir {
        config = config.with_spectrogram_dir(dir);
    }
    if let Some(log_file) = &cli.log_file {
        config = config.with_log_file(log_file);
    }

    Ok(config)
}

fn run_predict(config: AppConfig, file: &Path) -> Result<ExitCode> {
    let classifier = OnnxClassifier::load(&config.model_path)
        .with_context(|| format!("failed to load classifier from {:?}", config.model_path))?;
    let state = AppState::new(config, Box::new(classifier));

    let file_name = file.file_name().and_then(|n| n.to_str());
    let outcome = run_prediction(&state, file, file_name);

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(match outcome {
        Outcome::Success(_) => ExitCode::SUCCESS,
        Outcome::Failure(_) => ExitCode::from(2),
    })
}

fn run_features(config: &AppConfig, file: &Path) -> Result<ExitCode> {
    let extractor = FeatureExtractor::new(config.extractor.clone());
    let tensor = extractor
        .extract(file)
        .with_context(|| format!("failed to extract features from {:?}", file))?;

    let report = serde_json::json!({
        "shape": tensor.shape(),
        "values": tensor.rows(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

fn run_spectrogram(config: &AppConfig, file: &Path, output: Option<PathBuf>) -> Result<ExitCode> {
    let output = match output {
        Some(path) => path,
        None => {
            config.ensure_dirs()?;
            config
                .spectrogram_dir
                .join(format!("{}.png", Uuid::new_v4()))
        }
    };

    generate_spectrogram(file, &output, &config.spectrogram)
        .with_context(|| format!("failed to render spectrogram for {:?}", file))?;

    info!("Spectrogram written to {:?}", output);
    println!("{}", output.display());
    Ok(ExitCode::SUCCESS)
}
