use crate::error::StageError;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use std::str::FromStr;

use super::sharpen;

/// Threshold used to force a raster back to exactly two levels
pub const MIDPOINT: u8 = 127;

/// Adaptive mean threshold parameters
const WINDOW_SIZE: u32 = 11;
const OFFSET: i32 = 2;

/// Binarization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarizationMethod {
    /// Global threshold chosen by maximizing between-class variance
    Otsu,
    /// Per-pixel threshold from the local mean
    Adaptive,
    /// Caller-supplied global threshold
    Fixed,
}

impl FromStr for BinarizationMethod {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "otsu" => Ok(Self::Otsu),
            "adaptive" => Ok(Self::Adaptive),
            "fixed" => Ok(Self::Fixed),
            _ => Err(StageError::UnknownMethod {
                kind: "binarization",
                value: s.to_string(),
            }),
        }
    }
}

/// Sharpen then binarize a grayscale raster.
///
/// The output only ever contains 0 and 255. Dark content stays dark for
/// every method, so the result keeps the polarity of the input.
pub fn apply(
    image: &GrayImage,
    method: &str,
    threshold: u8,
    sharpen_intensity: f32,
) -> Result<GrayImage, StageError> {
    let method: BinarizationMethod = method.parse()?;
    let sharpened = sharpen::apply(image, sharpen_intensity);

    let binary = match method {
        BinarizationMethod::Otsu => {
            let level = otsu_level(&sharpened);
            tracing::debug!("Otsu level: {}", level);
            binary_threshold(&sharpened, level)
        }
        BinarizationMethod::Adaptive => adaptive_mean_threshold(&sharpened, WINDOW_SIZE, OFFSET),
        BinarizationMethod::Fixed => binary_threshold(&sharpened, threshold),
    };

    Ok(binary_threshold(&binary, MIDPOINT))
}

/// Pixels strictly above `level` become 255, everything else 0
pub fn binary_threshold(img: &GrayImage, level: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }
    out
}

/// Mean adaptive thresholding
///
/// For each pixel, threshold = round(mean of the window) - offset.
/// Windows that overhang the image read replicated edge pixels, so every
/// mean is taken over the full window area.
fn adaptive_mean_threshold(img: &GrayImage, window_size: u32, offset: i32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }
    let half_window = (window_size / 2) as usize;
    let window = 2 * half_window + 1;
    let integral = compute_integral_image(img, half_window);
    let stride = width as usize + 2 * half_window + 1;
    let area = (window * window) as f64;

    GrayImage::from_fn(width, height, |x, y| {
        // Padded coordinates: the window for (x, y) starts at (x, y)
        let (x1, y1) = (x as usize, y as usize);
        let (x2, y2) = (x1 + window, y1 + window);

        let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
            - integral[y1 * stride + x2]
            - integral[y2 * stride + x1];
        let mean = (sum as f64 / area).round() as i32;

        let pixel = img.get_pixel(x, y).0[0] as i32;
        if pixel > mean - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Summed-area table with a zero first row and column, over the image
/// extended by `pad` replicated edge pixels on every side
fn compute_integral_image(img: &GrayImage, pad: usize) -> Vec<u64> {
    let (width, height) = img.dimensions();
    let padded_width = width as usize + 2 * pad;
    let padded_height = height as usize + 2 * pad;
    let stride = padded_width + 1;
    let mut integral = vec![0u64; stride * (padded_height + 1)];

    let source = |p: usize, len: u32| p.saturating_sub(pad).min(len as usize - 1) as u32;

    for y in 0..padded_height {
        let sy = source(y, height);
        let mut row_sum = 0u64;
        for x in 0..padded_width {
            row_sum += img.get_pixel(source(x, width), sy).0[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    integral
}
