//! Mel spectrogram images for display.
//!
//! Independent of the classifier input: the full waveform at its native rate
//! is rendered with decibels relative to the peak power.

use crate::audio::{load_audio_file, Waveform};
use crate::error::{AppError, Result};
use crate::features::mel::{compute_mel_spectrogram, power_to_db, DbReference, MelConfig, AMIN, TOP_DB};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Magma colour stops, dark (quiet) to bright (loud)
const MAGMA: [(f32, [u8; 3]); 5] = [
    (0.0, [0, 0, 4]),
    (0.25, [81, 18, 124]),
    (0.5, [183, 55, 121]),
    (0.75, [252, 137, 97]),
    (1.0, [252, 253, 191]),
];

/// Output image layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpectrogramConfig {
    pub width: u32,
    pub height: u32,
    /// Width of the dB colour bar on the right edge, 0 to disable
    pub colorbar_width: u32,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 400,
            colorbar_width: 24,
        }
    }
}

/// Mel power spectrogram in dB relative to its peak, shape (n_mels, frames)
pub fn mel_spectrogram_db(waveform: &Waveform) -> Result<Array2<f32>> {
    if waveform.is_empty() {
        return Err(AppError::Shape(
            "Cannot draw a spectrogram of empty audio".to_string(),
        ));
    }
    if waveform.sample_rate == 0 {
        return Err(AppError::Decode("Audio has a sample rate of 0".to_string()));
    }

    let config = MelConfig::for_sample_rate(waveform.sample_rate);
    let mel = compute_mel_spectrogram(&waveform.samples, &config);
    Ok(power_to_db(&mel, DbReference::Peak, AMIN, Some(TOP_DB)))
}

/// Load `audio_path` at its native rate and write a PNG spectrogram to `output_path`
pub fn generate_spectrogram(
    audio_path: &Path,
    output_path: &Path,
    config: &SpectrogramConfig,
) -> Result<()> {
    let waveform = load_audio_file(audio_path)?;
    save_spectrogram(&waveform, output_path, config)
}

/// Write a PNG spectrogram of an already decoded waveform
pub fn save_spectrogram(
    waveform: &Waveform,
    output_path: &Path,
    config: &SpectrogramConfig,
) -> Result<()> {
    let db = mel_spectrogram_db(waveform)?;
    let image = render(&db, config)?;

    image.save_with_format(output_path, ImageFormat::Png)?;
    info!(
        "Wrote {}x{} spectrogram ({} frames) to {:?}",
        config.width,
        config.height,
        db.ncols(),
        output_path
    );
    Ok(())
}

/// Draw a dB spectrogram with low frequencies at the bottom
pub fn render(db: &Array2<f32>, config: &SpectrogramConfig) -> Result<RgbImage> {
    let (n_mels, frames) = db.dim();
    if n_mels == 0 || frames == 0 {
        return Err(AppError::Render("Spectrogram has no data".to_string()));
    }

    let bar = if config.colorbar_width > 0 {
        config.colorbar_width + config.colorbar_width / 2
    } else {
        0
    };
    if config.width <= bar || config.height == 0 {
        return Err(AppError::Render(format!(
            "Image size {}x{} too small",
            config.width, config.height
        )));
    }
    let plot_width = config.width - bar;
    let height = config.height;

    let max = db.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
    let floor = max - TOP_DB;

    let image = RgbImage::from_fn(config.width, height, |x, y| {
        // Fraction of full scale, 1.0 at the top
        let level = 1.0 - y as f32 / (height.max(2) - 1) as f32;

        if x < plot_width {
            let frame = (x as usize * frames / plot_width as usize).min(frames - 1);
            let band = ((height - 1 - y) as usize * n_mels / height as usize).min(n_mels - 1);
            let value = (db[[band, frame]] - floor) / TOP_DB;
            Rgb(colormap(value))
        } else if x >= config.width - config.colorbar_width {
            Rgb(colormap(level))
        } else {
            Rgb([255, 255, 255])
        }
    });

    Ok(image)
}

fn colormap(value: f32) -> [u8; 3] {
    let v = if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    };

    for pair in MAGMA.windows(2) {
        let (lo, lo_rgb) = pair[0];
        let (hi, hi_rgb) = pair[1];
        if v <= hi {
            let t = (v - lo) / (hi - lo);
            let mut rgb = [0u8; 3];
            for i in 0..3 {
                rgb[i] = (lo_rgb[i] as f32 + t * (hi_rgb[i] as f32 - lo_rgb[i] as f32)).round() as u8;
            }
            return rgb;
        }
    }

    MAGMA[MAGMA.len() - 1].1
}
