//! Image preprocessing for the face pipeline.
//!
//! Decodes image bytes (PNG/JPEG/BMP/GIF), stretches them to the configured
//! resolution, and scales every RGB channel value into [0, 1].

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_SIDE: u32 = 128;
pub const CHANNELS: usize = 3;

/// Target resolution for normalized images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig { width: DEFAULT_SIDE, height: DEFAULT_SIDE }
    }
}

impl ImageConfig {
    /// `[height, width, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.height as usize, self.width as usize, CHANNELS]
    }

    pub fn value_count(&self) -> usize {
        self.shape().iter().product()
    }
}

/// A normalized image in row-major HWC order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 3],
    data: Vec<f64>,
}

impl ImageTensor {
    /// `[height, width, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// The same tensor viewed with a leading batch axis of 1.
    pub fn batch_shape(&self) -> [usize; 4] {
        [1, self.shape[0], self.shape[1], self.shape[2]]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Channel value at `(row, col, channel)`.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> f64 {
        self.data[(row * self.shape[1] + col) * self.shape[2] + channel]
    }
}

/// Normalizes to the default 128x128 resolution.
pub fn normalize(bytes: &[u8]) -> Result<ImageTensor> {
    normalize_with(bytes, &ImageConfig::default())
}

/// Decodes `bytes`, resizes to `config` ignoring aspect ratio, and divides
/// every channel by 255. No EXIF orientation is applied.
pub fn normalize_with(bytes: &[u8], config: &ImageConfig) -> Result<ImageTensor> {
    let img = image::load_from_memory(bytes)?;
    let resized = img.resize_exact(config.width, config.height, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let data: Vec<f64> = rgb
        .pixels()
        .flat_map(|p| p.0.iter().map(|&c| c as f64 / 255.0))
        .collect();
    Ok(ImageTensor { shape: config.shape(), data })
}
