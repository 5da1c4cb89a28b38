use crate::error::StageError;
use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

use super::threshold::MIDPOINT;

/// Axis-aligned rectangle in pixel coordinates, half-open on the far sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crop a binary raster to the bounding box of its largest dark region
pub fn apply(binary: &GrayImage) -> Result<GrayImage, StageError> {
    let bounds = largest_region_bounds(binary).ok_or(StageError::NoForeground)?;
    tracing::debug!(
        "Cropping {}x{} to {}x{} at ({}, {})",
        binary.width(),
        binary.height(),
        bounds.width,
        bounds.height,
        bounds.x,
        bounds.y
    );

    Ok(imageops::crop_imm(binary, bounds.x, bounds.y, bounds.width, bounds.height).to_image())
}

/// Bounding box of the external contour enclosing the largest area.
///
/// Foreground is the dark (ink) side of the raster. Holes and regions
/// nested inside holes are ignored. On equal areas the contour found first
/// in raster order wins.
pub fn largest_region_bounds(binary: &GrayImage) -> Option<Bounds> {
    // find_contours follows non-zero pixels, so ink has to become non-zero
    let ink = GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        if binary.get_pixel(x, y).0[0] > MIDPOINT {
            image::Luma([0u8])
        } else {
            image::Luma([255u8])
        }
    });

    let contours: Vec<Contour<u32>> = find_contours(&ink);

    let mut largest: Option<(&Contour<u32>, f64)> = None;
    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let area = enclosed_area(&contour.points);
        match largest {
            Some((_, best)) if best >= area => {}
            _ => largest = Some((contour, area)),
        }
    }

    largest.and_then(|(contour, _)| bounding_rect(&contour.points))
}

/// Shoelace area of a closed point chain
fn enclosed_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    (twice_area as f64 / 2.0).abs()
}

fn bounding_rect(points: &[Point<u32>]) -> Option<Bounds> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blank(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255]))
    }

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    #[test]
    fn test_crop_to_centered_square() {
        let mut img = blank(100, 100);
        fill(&mut img, 30, 30, 40, 40);

        let cropped = apply(&img).unwrap();
        assert_eq!(cropped.dimensions(), (40, 40));
        assert!(cropped.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_blank_image_has_no_foreground() {
        let err = apply(&blank(50, 50)).unwrap_err();
        assert!(matches!(err, StageError::NoForeground));
    }

    #[test]
    fn test_full_foreground_keeps_dimensions() {
        let img = GrayImage::new(25, 15);
        let cropped = apply(&img).unwrap();
        assert_eq!(cropped.dimensions(), (25, 15));
    }

    #[test]
    fn test_largest_region_wins() {
        let mut img = blank(80, 60);
        fill(&mut img, 2, 2, 5, 5);
        fill(&mut img, 40, 20, 30, 20);

        let bounds = largest_region_bounds(&img).unwrap();
        assert_eq!(
            bounds,
            Bounds {
                x: 40,
                y: 20,
                width: 30,
                height: 20
            }
        );
    }

    #[test]
    fn test_enclosed_area_counts_hollow_frames() {
        // A thin hollow frame encloses more area than a solid block
        let mut img = blank(100, 100);
        fill(&mut img, 5, 5, 50, 2);
        fill(&mut img, 5, 53, 50, 2);
        fill(&mut img, 5, 5, 2, 50);
        fill(&mut img, 53, 5, 2, 50);
        fill(&mut img, 70, 70, 20, 20);
        // Nested block inside the frame's hole is not an external region
        fill(&mut img, 20, 20, 10, 10);

        let bounds = largest_region_bounds(&img).unwrap();
        assert_eq!((bounds.x, bounds.y, bounds.width, bounds.height), (5, 5, 50, 50));
    }

    #[test]
    fn test_equal_areas_pick_first_in_raster_order() {
        let mut img = blank(60, 60);
        fill(&mut img, 35, 40, 10, 10);
        fill(&mut img, 5, 5, 10, 10);

        let bounds = largest_region_bounds(&img).unwrap();
        assert_eq!((bounds.x, bounds.y), (5, 5));
    }

    #[test]
    fn test_crop_never_grows() {
        let mut img = blank(33, 21);
        fill(&mut img, 0, 3, 33, 4);
        fill(&mut img, 10, 0, 3, 21);

        let cropped = apply(&img).unwrap();
        assert!(cropped.width() <= img.width());
        assert!(cropped.height() <= img.height());
    }
}
