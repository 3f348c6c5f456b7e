use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Floor applied to power values before taking the logarithm
pub const AMIN: f32 = 1e-10;

/// Dynamic range kept below the loudest value when converting to decibels
pub const TOP_DB: f32 = 80.0;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

/// Mel spectrogram configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MelConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub fmin: f32,
    /// Upper band edge, Nyquist when unset
    pub fmax: Option<f32>,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512, // ~23ms at 22.05kHz
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
        }
    }
}

impl MelConfig {
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    pub fn fmax_hz(&self) -> f32 {
        self.fmax.unwrap_or(self.sample_rate as f32 / 2.0)
    }

    /// Number of centered frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        let padded = len + 2 * (self.n_fft / 2);
        if padded < self.n_fft {
            return 0;
        }
        (padded - self.n_fft) / self.hop_length + 1
    }
}

/// Reference level for decibel conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DbReference {
    /// Fixed reference power
    Fixed(f32),
    /// Peak power of the input, so the loudest bin maps to 0 dB
    Peak,
}

/// Centered short-time power spectrum, shape (n_fft / 2 + 1, frames).
///
/// Frames are taken from the signal zero-padded by `n_fft / 2` on both sides
/// with a periodic Hann window.
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;

    // Periodic Hann window
    let window: Vec<f32> = (0..n_fft)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n_fft as f32).cos()))
        .collect();

    let pad_length = n_fft / 2;
    let mut padded = vec![0.0f32; pad_length];
    padded.extend_from_slice(samples);
    padded.extend(vec![0.0f32; pad_length]);

    if padded.len() < n_fft {
        return Array2::<f32>::zeros((n_freqs, 0));
    }

    let num_frames = (padded.len() - n_fft) / hop_length + 1;
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut spectrogram = Array2::<f32>::zeros((n_freqs, num_frames));
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_length;

        for ((slot, &s), &w) in buffer
            .iter_mut()
            .zip(&padded[start..start + n_fft])
            .zip(window.iter())
        {
            *slot = Complex::new(s * w, 0.0);
        }

        fft.process(&mut buffer);

        for (i, c) in buffer.iter().take(n_freqs).enumerate() {
            spectrogram[[i, frame_idx]] = c.norm_sqr();
        }
    }

    spectrogram
}

/// Compute mel power spectrogram, shape (n_mels, frames)
pub fn compute_mel_spectrogram(samples: &[f32], config: &MelConfig) -> Array2<f32> {
    let spectrogram = power_spectrogram(samples, config.n_fft, config.hop_length);

    let mel_filterbank = create_mel_filterbank(
        config.sample_rate,
        config.n_fft,
        config.n_mels,
        config.fmin,
        config.fmax_hz(),
    );

    mel_filterbank.dot(&spectrogram)
}

/// Convert a power spectrogram to decibels.
///
/// `10 * log10(max(amin, S)) - 10 * log10(max(amin, ref))`, then floored at
/// `max - top_db` when `top_db` is given.
pub fn power_to_db(
    power: &Array2<f32>,
    reference: DbReference,
    amin: f32,
    top_db: Option<f32>,
) -> Array2<f32> {
    let ref_value = match reference {
        DbReference::Fixed(v) => v.abs(),
        DbReference::Peak => power.fold(0.0f32, |m, &x| m.max(x)),
    };
    let offset = 10.0 * ref_value.max(amin).log10();

    let mut db = power.mapv(|x| 10.0 * x.max(amin).log10() - offset);

    if let Some(top_db) = top_db {
        let max = db.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
        db.mapv_inplace(|x| x.max(max - top_db));
    }

    db
}

/// Convert frequency to mel (Slaney scale: linear below 1kHz, log above)
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert mel (Slaney scale) to frequency
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Create mel filterbank matrix, shape (n_mels, n_fft / 2 + 1).
///
/// Triangular filters on the Slaney mel scale, each scaled to unit area.
pub fn create_mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;

    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let mel_min = hz_to_mel(fmin as f64);
    let mel_max = hz_to_mel(fmax as f64);

    // Band edges in Hz, evenly spaced in mel
    let mel_f: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filterbank = Array2::<f32>::zeros((n_mels, n_freqs));

    for m in 0..n_mels {
        let (left, center, right) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
        let enorm = 2.0 / (right - left);

        for (k, &f) in fft_freqs.iter().enumerate() {
            let rising = (f - left) / (center - left);
            let falling = (right - f) / (right - center);
            let weight = rising.min(falling).max(0.0);
            filterbank[[m, k]] = (weight * enorm) as f32;
        }
    }

    filterbank
}
