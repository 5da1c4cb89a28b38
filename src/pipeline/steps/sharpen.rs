use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;

/// Base center weight of the sharpening kernel.
/// With zero intensity this is still a mild sharpen, not an identity.
const BASE_CENTER_WEIGHT: f32 = 5.0;

/// Apply Laplacian-based sharpening
/// Center weight 5 + intensity, cardinal neighbors -1, corners 0.
/// Results are rounded to the nearest level, then saturated.
pub fn apply(image: &GrayImage, intensity: f32) -> GrayImage {
    let center = BASE_CENTER_WEIGHT + intensity;
    let kernel: [f32; 9] = [0.0, -1.0, 0.0, -1.0, center, -1.0, 0.0, -1.0, 0.0];

    let filtered: ImageBuffer<Luma<f32>, Vec<f32>> = filter3x3::<_, f32, f32>(image, &kernel);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = filtered.get_pixel(x, y).0[0];
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
