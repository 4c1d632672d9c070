//! Image preprocessing for the classifier input contract.
//!
//! Pure and deterministic: identical input bytes always produce the same
//! tensor. Decode -> nearest-neighbor resize to 224x224 -> RGB -> f32 in
//! [0,1].

use crate::error::{Result, ScanError};
use image::imageops::FilterType;

pub const INPUT_WIDTH: u32 = 224;
pub const INPUT_HEIGHT: u32 = 224;
pub const INPUT_CHANNELS: usize = 3;

/// Normalized classifier input, laid out HWC with an implicit leading batch
/// dimension of 1: `[1, 224, 224, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
}

impl InputTensor {
    pub fn shape() -> [usize; 4] {
        [1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, INPUT_CHANNELS]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Decode an uploaded image into the classifier's fixed-size input tensor.
pub fn preprocess(image_bytes: &[u8]) -> Result<InputTensor> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| ScanError::InvalidImage(e.to_string()))?;

    let resized = decoded.resize_exact(INPUT_WIDTH, INPUT_HEIGHT, FilterType::Nearest);
    let rgb = resized.to_rgb8();

    let data: Vec<f32> = rgb.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    debug_assert_eq!(data.len(), InputTensor::shape().iter().product::<usize>());

    Ok(InputTensor { data })
}
