//! Time-axis normalisation and the classifier input layout.
//!
//! The trained model takes a (1, 16, 8, 1) tensor: the first 16 frames and
//! first 8 coefficients of the transposed, padded MFCC matrix. The slice drops
//! almost all computed coefficients, but the model was trained on exactly this
//! layout, so changing it requires retraining.

use crate::error::{AppError, Result};
use ndarray::{s, Array2, Array4, ArrayView2, Axis};

/// Number of MFCCs computed per frame
pub const N_MFCC: usize = 128;

/// Fixed time-axis length after padding or truncation
pub const MAX_PAD_LEN: usize = 1024;

/// Frames kept for the classifier
pub const TENSOR_FRAMES: usize = 16;

/// Coefficients kept for the classifier
pub const TENSOR_COEFFICIENTS: usize = 8;

/// (batch, time, coefficient, channel)
pub const TENSOR_SHAPE: [usize; 4] = [1, TENSOR_FRAMES, TENSOR_COEFFICIENTS, 1];

/// Classifier input tensor, always shaped [`TENSOR_SHAPE`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor(Array4<f32>);

impl FeatureTensor {
    /// Wrap an array, rejecting anything that is not exactly [`TENSOR_SHAPE`]
    pub fn from_array(array: Array4<f32>) -> Result<Self> {
        if array.shape() != TENSOR_SHAPE {
            return Err(AppError::Shape(format!(
                "Feature tensor must be {:?}, got {:?}",
                TENSOR_SHAPE,
                array.shape()
            )));
        }
        Ok(Self(array))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn into_array(self) -> Array4<f32> {
        self.0
    }

    /// Value at time frame `t`, coefficient `c`
    pub fn get(&self, t: usize, c: usize) -> Option<f32> {
        self.0.get([0, t, c, 0]).copied()
    }

    /// Values in row-major (logical) order
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.iter().copied().collect()
    }

    /// Rows of coefficients, one per time frame
    pub fn rows(&self) -> Vec<Vec<f32>> {
        (0..TENSOR_FRAMES)
            .map(|t| {
                (0..TENSOR_COEFFICIENTS)
                    .map(|c| self.0[[0, t, c, 0]])
                    .collect()
            })
            .collect()
    }
}

/// Force the time axis (columns) to `target_len`.
///
/// Shorter input is right-padded with zero columns; longer input keeps the
/// earliest `target_len` columns unchanged.
pub fn pad_or_truncate(coefficients: &Array2<f32>, target_len: usize) -> Array2<f32> {
    let (rows, cols) = coefficients.dim();
    let keep = cols.min(target_len);

    let mut normalized = Array2::<f32>::zeros((rows, target_len));
    normalized
        .slice_mut(s![.., ..keep])
        .assign(&coefficients.slice(s![.., ..keep]));

    normalized
}

/// Transpose to (time, coefficient), keep the leading 16x8 block and add the
/// channel and batch axes.
pub fn to_feature_tensor(normalized: ArrayView2<'_, f32>) -> Result<FeatureTensor> {
    let (coefficients, frames) = normalized.dim();
    if coefficients < TENSOR_COEFFICIENTS || frames < TENSOR_FRAMES {
        return Err(AppError::Shape(format!(
            "Need at least {} coefficients x {} frames, got {} x {}",
            TENSOR_COEFFICIENTS, TENSOR_FRAMES, coefficients, frames
        )));
    }

    let block = normalized
        .t()
        .slice(s![..TENSOR_FRAMES, ..TENSOR_COEFFICIENTS])
        .as_standard_layout()
        .into_owned();

    let tensor = block.insert_axis(Axis(2)).insert_axis(Axis(0));
    FeatureTensor::from_array(tensor)
}
