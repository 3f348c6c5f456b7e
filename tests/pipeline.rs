//! End-to-end checks of the WAV -> (1, 16, 8, 1) tensor pipeline.

use ndarray::s;
use speechscreen_lib::audio::Waveform;
use speechscreen_lib::error::AppError;
use speechscreen_lib::features::{
    pad_or_truncate, ExtractorConfig, FeatureExtractor, MAX_PAD_LEN, N_MFCC, TENSOR_SHAPE,
};
use std::path::{Path, PathBuf};

fn write_i16_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        for _ in 0..channels {
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn voiced(seconds: f32, sample_rate: u32) -> Vec<f32> {
    let n = (seconds * sample_rate as f32) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            // Slow amplitude wobble so frames differ from each other
            let envelope = 0.5 + 0.4 * (2.0 * std::f32::consts::PI * 3.0 * t).sin();
            envelope
                * (0.5 * (2.0 * std::f32::consts::PI * 150.0 * t).sin()
                    + 0.2 * (2.0 * std::f32::consts::PI * 900.0 * t).sin())
        })
        .collect()
}

fn clip(dir: &Path, name: &str, seconds: f32, sample_rate: u32) -> PathBuf {
    let path = dir.join(name);
    write_i16_wav(&path, &voiced(seconds, sample_rate), sample_rate, 1);
    path
}

#[test]
fn shape_is_fixed_for_any_duration() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = FeatureExtractor::default();

    for (name, seconds) in [("short.wav", 0.1), ("medium.wav", 2.0), ("long.wav", 30.0)] {
        let path = clip(dir.path(), name, seconds, 16000);
        let tensor = extractor.extract(&path).unwrap();
        assert_eq!(tensor.shape(), &TENSOR_SHAPE, "{}", name);
    }

    let silence = dir.path().join("silence.wav");
    write_i16_wav(&silence, &vec![0.0; 8000], 8000, 1);
    let tensor = extractor.extract(&silence).unwrap();
    assert_eq!(tensor.shape(), &TENSOR_SHAPE);
}

#[test]
fn short_clip_padding_is_zero() {
    let extractor = FeatureExtractor::new(ExtractorConfig::native());
    let waveform = Waveform::new(voiced(1.0, 22050), 22050);

    let coefficients = extractor.coefficients(&waveform).unwrap();
    let frames = coefficients.ncols();
    assert_eq!(coefficients.nrows(), N_MFCC);
    assert!(frames < MAX_PAD_LEN);

    let normalized = pad_or_truncate(&coefficients, MAX_PAD_LEN);
    assert_eq!(normalized.dim(), (N_MFCC, MAX_PAD_LEN));
    assert_eq!(normalized.slice(s![.., ..frames]), coefficients);
    assert!(normalized.slice(s![.., frames..]).iter().all(|&v| v == 0.0));
}

#[test]
fn long_clip_truncated_without_alteration() {
    // 25s at 22.05kHz is 1077 frames
    let extractor = FeatureExtractor::new(ExtractorConfig::native());
    let waveform = Waveform::new(voiced(25.0, 22050), 22050);

    let coefficients = extractor.coefficients(&waveform).unwrap();
    assert!(coefficients.ncols() > MAX_PAD_LEN);

    let normalized = pad_or_truncate(&coefficients, MAX_PAD_LEN);
    assert_eq!(normalized, coefficients.slice(s![.., ..MAX_PAD_LEN]));

    let tensor = extractor.extract_waveform(&waveform).unwrap();
    for t in 0..16 {
        for c in 0..8 {
            assert_eq!(tensor.get(t, c), Some(coefficients[[c, t]]));
        }
    }
}

#[test]
fn stereo_file_matches_mono_file() {
    let dir = tempfile::tempdir().unwrap();
    let samples = voiced(0.5, 16000);
    let mono = dir.path().join("mono.wav");
    let stereo = dir.path().join("stereo.wav");
    write_i16_wav(&mono, &samples, 16000, 1);
    write_i16_wav(&stereo, &samples, 16000, 2);

    let extractor = FeatureExtractor::default();
    assert_eq!(
        extractor.extract(&mono).unwrap(),
        extractor.extract(&stereo).unwrap()
    );
}

#[test]
fn repeated_extraction_is_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = clip(dir.path(), "repeat.wav", 1.5, 44100);
    let extractor = FeatureExtractor::default();

    let runs: Vec<Vec<u32>> = (0..3)
        .map(|_| {
            extractor
                .extract(&path)
                .unwrap()
                .to_vec()
                .iter()
                .map(|v| v.to_bits())
                .collect()
        })
        .collect();

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[test]
fn concurrent_extraction_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let path = clip(dir.path(), "shared.wav", 1.0, 22050);
    let extractor = FeatureExtractor::default();
    let expected = extractor.extract(&path).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| extractor.extract(&path).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn zero_length_file_is_shape_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    write_i16_wav(&path, &[], 16000, 1);

    let err = FeatureExtractor::default().extract(&path).unwrap_err();
    assert!(matches!(err, AppError::Shape(_)), "{:?}", err);
}

#[test]
fn undecodable_file_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = FeatureExtractor::default();

    let missing = dir.path().join("missing.wav");
    assert!(matches!(
        extractor.extract(&missing).unwrap_err(),
        AppError::Decode(_)
    ));

    let corrupt = dir.path().join("corrupt.wav");
    std::fs::write(&corrupt, vec![0u8; 64]).unwrap();
    assert!(matches!(
        extractor.extract(&corrupt).unwrap_err(),
        AppError::Decode(_)
    ));
}
