//! Mel-frequency cepstral coefficients.
//!
//! Log-power mel spectrogram (reference 1.0, 80 dB dynamic range) followed by
//! an orthonormal DCT-II over the mel axis.

use super::mel::{compute_mel_spectrogram, power_to_db, DbReference, MelConfig, AMIN, TOP_DB};
use ndarray::Array2;
use std::f64::consts::PI;

/// Orthonormal DCT-II basis, shape (n_out, n).
///
/// Row `k` is `s_k * cos(pi * k * (2j + 1) / 2n)` with `s_0 = sqrt(1/n)` and
/// `s_k = sqrt(2/n)` otherwise.
pub fn dct_basis(n_out: usize, n: usize) -> Array2<f32> {
    let mut basis = Array2::<f32>::zeros((n_out, n));
    let nf = n as f64;

    for k in 0..n_out {
        let scale = if k == 0 {
            (1.0 / nf).sqrt()
        } else {
            (2.0 / nf).sqrt()
        };
        for j in 0..n {
            let angle = PI * k as f64 * (2.0 * j as f64 + 1.0) / (2.0 * nf);
            basis[[k, j]] = (scale * angle.cos()) as f32;
        }
    }

    basis
}

/// Compute MFCCs, shape (n_mfcc, frames).
///
/// `n_mfcc` is clamped to `config.n_mels`; the DCT cannot yield more
/// coefficients than mel bands.
pub fn compute_mfcc(samples: &[f32], config: &MelConfig, n_mfcc: usize) -> Array2<f32> {
    let mel = compute_mel_spectrogram(samples, config);
    let log_mel = power_to_db(&mel, DbReference::Fixed(1.0), AMIN, Some(TOP_DB));

    let basis = dct_basis(n_mfcc.min(config.n_mels), config.n_mels);
    basis.dot(&log_mel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(16, 16);
        let gram = basis.dot(&basis.t());
        for i in 0..16 {
            for j in 0..16 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (gram[[i, j]] - expected).abs() < 1e-5,
                    "gram[{}, {}] = {}",
                    i,
                    j,
                    gram[[i, j]]
                );
            }
        }
    }

    #[test]
    fn test_constant_input_lands_in_first_coefficient() {
        let basis = dct_basis(8, 8);
        let x = Array2::from_elem((8, 1), -100.0f32);
        let y = basis.dot(&x);

        assert!((y[[0, 0]] - (-100.0 * 8f32.sqrt())).abs() < 1e-3);
        for k in 1..8 {
            assert!(y[[k, 0]].abs() < 1e-3);
        }
    }

    #[test]
    fn test_mfcc_shape() {
        let config = MelConfig::default();
        let samples: Vec<f32> = (0..22050).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let mfcc = compute_mfcc(&samples, &config, 128);
        assert_eq!(mfcc.dim(), (128, config.num_frames(samples.len())));
        assert!(mfcc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_mfcc_of_silence_is_flat() {
        // Silence floors every mel band at -100 dB, so only c0 is non-zero
        let config = MelConfig::default();
        let mfcc = compute_mfcc(&vec![0.0f32; 2048], &config, 128);

        let c0 = -100.0 * 128f32.sqrt();
        for t in 0..mfcc.ncols() {
            assert!((mfcc[[0, t]] - c0).abs() < 1e-2);
            for k in 1..128 {
                assert!(mfcc[[k, t]].abs() < 1e-2);
            }
        }
    }

    #[test]
    fn test_n_mfcc_clamped_to_mel_bands() {
        let config = MelConfig {
            n_mels: 40,
            ..Default::default()
        };
        let mfcc = compute_mfcc(&vec![0.0f32; 1024], &config, 128);
        assert_eq!(mfcc.nrows(), 40);
    }
}
