use crate::error::{AppError, Result};
use rubato::{
    FftFixedInOut, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Input chunk size fed to the resamplers
const RESAMPLE_CHUNK: usize = 1024;

/// Decoded mono audio at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        duration_ms(&self.samples, self.sample_rate)
    }
}

/// Resampler quality mode.
///
/// The trained classifier saw audio loaded through the fast mode, so this is a
/// reproducibility parameter and must not be changed for an existing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    /// Short windowed-sinc kernel with a 0.85 cutoff
    #[default]
    Fast,
    /// FFT-based fixed-ratio resampler
    Best,
}

/// Resample mono audio from `source_rate` to `target_rate`.
///
/// Output length is `ceil(len * target / source)` with the resampler delay removed.
pub fn resample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
    quality: ResampleQuality,
) -> Result<Vec<f32>> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(AppError::Decode(format!(
            "Cannot resample between {}Hz and {}Hz",
            source_rate, target_rate
        )));
    }

    info!(
        "Resampling from {}Hz to {}Hz ({:?})",
        source_rate, target_rate, quality
    );

    let expected_len =
        (samples.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;

    match quality {
        ResampleQuality::Fast => {
            let params = SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.85,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::Hann,
            };
            let mut resampler = SincFixedIn::<f32>::new(
                target_rate as f64 / source_rate as f64,
                1.0,
                params,
                RESAMPLE_CHUNK,
                1,
            )
            .map_err(|e| AppError::Decode(format!("Failed to create resampler: {}", e)))?;
            run_resampler(&mut resampler, samples, expected_len)
        }
        ResampleQuality::Best => {
            let mut resampler = FftFixedInOut::<f32>::new(
                source_rate as usize,
                target_rate as usize,
                RESAMPLE_CHUNK,
                1,
            )
            .map_err(|e| AppError::Decode(format!("Failed to create resampler: {}", e)))?;
            run_resampler(&mut resampler, samples, expected_len)
        }
    }
}

fn run_resampler<R: Resampler<f32>>(
    resampler: &mut R,
    samples: &[f32],
    expected_len: usize,
) -> Result<Vec<f32>> {
    let delay = resampler.output_delay();
    let needed = delay + expected_len;
    let mut output = Vec::with_capacity(needed + RESAMPLE_CHUNK);
    let mut pos = 0;

    // Zero chunks are fed past the end of the input to flush the delay line
    let max_pos = samples.len() + needed + 4 * RESAMPLE_CHUNK;

    while output.len() < needed {
        if pos > max_pos {
            return Err(AppError::Decode(
                "Resampler stopped producing output".to_string(),
            ));
        }

        let chunk_size = resampler.input_frames_next();
        let mut input_chunk = vec![0.0f32; chunk_size];
        if pos < samples.len() {
            let end = (pos + chunk_size).min(samples.len());
            input_chunk[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += chunk_size;

        let result = resampler
            .process(&[input_chunk], None)
            .map_err(|e| AppError::Decode(format!("Resampling failed: {}", e)))?;

        if !result.is_empty() {
            output.extend_from_slice(&result[0]);
        }
    }

    debug!(
        "Resampled {} -> {} samples (delay {})",
        samples.len(),
        expected_len,
        delay
    );

    Ok(output[delay..needed].to_vec())
}

/// Load audio from file as mono f32 at its native sample rate
pub fn load_audio_file(path: &Path) -> Result<Waveform> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" | "wave" => load_wav(path),
        "mp3" | "m4a" | "ogg" | "flac" => Err(AppError::Decode(format!(
            "Format {} not supported. Please convert to WAV.",
            extension
        ))),
        _ => Err(AppError::Decode(format!(
            "Unknown audio format: {:?}",
            path.file_name().unwrap_or_default()
        ))),
    }
}

fn load_wav(path: &Path) -> Result<Waveform> {
    let reader = hound::WavReader::open(path)?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    info!(
        "Loading WAV: {}Hz, {} channels, {:?} {} bits",
        sample_rate, channels, spec.sample_format, spec.bits_per_sample
    );

    if channels == 0 {
        return Err(AppError::Decode("WAV header declares zero channels".to_string()));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    // Convert to mono by averaging channels
    let mono_samples: Vec<f32> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok(Waveform::new(mono_samples, sample_rate))
}

/// Write mono f32 samples as a 32-bit float WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Calculate the duration in milliseconds
pub fn duration_ms(samples: &[f32], sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    ((samples.len() as f64 / sample_rate as f64) * 1000.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_i16_wav(path: &Path, channels: u16, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_int16_scaled_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_i16_wav(&path, 1, &[vec![16384], vec![-32768], vec![0]]);

        let wave = load_audio_file(&path).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.samples, vec![0.5, -1.0, 0.0]);
    }

    #[test]
    fn test_stereo_downmixed_by_average() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_i16_wav(&path, 2, &[vec![16384, 0], vec![-16384, -16384]]);

        let wave = load_audio_file(&path).unwrap();
        assert_eq!(wave.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = load_audio_file(Path::new("/nonexistent/recording.wav")).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();

        let err = load_audio_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_unsupported_extension_is_decode_error() {
        let err = load_audio_file(Path::new("clip.mp3")).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_float_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        write_wav(&path, &[0.1, -0.2, 0.3], 22050).unwrap();

        let wave = load_audio_file(&path).unwrap();
        assert_eq!(wave.sample_rate, 22050);
        assert_eq!(wave.samples, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_resample_output_length() {
        let samples = vec![0.0f32; 16000];
        for quality in [ResampleQuality::Fast, ResampleQuality::Best] {
            let out = resample(&samples, 16000, 22050, quality).unwrap();
            assert_eq!(out.len(), 22050, "{:?}", quality);
        }

        let odd = vec![0.0f32; 1001];
        let out = resample(&odd, 44100, 22050, ResampleQuality::Fast).unwrap();
        assert_eq!(out.len(), 501);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1f32, 0.2, 0.3];
        let out = resample(&samples, 22050, 22050, ResampleQuality::Fast).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_preserves_tone_level() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        let out = resample(&samples, 44100, 22050, ResampleQuality::Fast).unwrap();

        // Skip the edges where the kernel sees padding
        let mid = &out[2000..20000];
        let peak = mid.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.4 && peak < 0.6, "peak was {}", peak);
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(&vec![0.0; 16000], 16000), 1000);
        assert_eq!(duration_ms(&vec![0.0; 11025], 22050), 500);
        assert_eq!(duration_ms(&[], 0), 0);
    }
}
