use crate::error::StageError;
use image::GrayImage;
use imageproc::filter::{median_filter, separable_filter_equal};
use std::str::FromStr;

use super::threshold::{binary_threshold, MIDPOINT};

/// Denoising filter applied to the cropped raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingMethod {
    Median,
    Gaussian,
    None,
}

impl FromStr for SmoothingMethod {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "median" => Ok(Self::Median),
            "gaussian" => Ok(Self::Gaussian),
            "none" => Ok(Self::None),
            _ => Err(StageError::UnknownMethod {
                kind: "smoothing",
                value: s.to_string(),
            }),
        }
    }
}

/// Smooth a binary raster and force it back to two levels
pub fn apply(image: &GrayImage, method: &str, kernel_size: u32) -> Result<GrayImage, StageError> {
    let method: SmoothingMethod = method.parse()?;
    let radius = kernel_size / 2;

    let smoothed = match method {
        // Median filter preserves edges better than Gaussian blur
        SmoothingMethod::Median => median_filter(image, radius, radius),
        SmoothingMethod::Gaussian => {
            let kernel = gaussian_kernel(kernel_size.max(1));
            separable_filter_equal(image, &kernel)
        }
        SmoothingMethod::None => image.clone(),
    };

    // Blurring introduces gray values along edges
    Ok(binary_threshold(&smoothed, MIDPOINT))
}

/// Normalized 1-D Gaussian with exactly `size` taps.
/// Sigma is derived from the size: 0.3 * ((size - 1) * 0.5 - 1) + 0.8
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;

    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();

    weights.into_iter().map(|w| w / total).collect()
}
