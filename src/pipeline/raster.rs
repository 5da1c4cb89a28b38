use crate::error::StageError;
use image::{GrayImage, ImageFormat};
use std::path::{Path, PathBuf};

/// Load any supported image file as 8-bit grayscale
pub fn load_grayscale(path: &Path) -> Result<GrayImage, StageError> {
    let image = image::open(path).map_err(|source| StageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.into_luma8())
}

/// Create the parent directory of `path` if it does not exist yet
pub fn ensure_parent(path: &Path) -> Result<(), StageError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|source| StageError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

pub fn save_png(image: &GrayImage, path: &Path) -> Result<(), StageError> {
    ensure_parent(path)?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| StageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Write an uncompressed BMP for the tracer.
///
/// The extension is always replaced with `.bmp`; the returned path is the
/// one actually written.
pub fn save_bitmap(image: &GrayImage, requested: &Path) -> Result<PathBuf, StageError> {
    let path = requested.with_extension("bmp");
    ensure_parent(&path)?;
    image
        .save_with_format(&path, ImageFormat::Bmp)
        .map_err(|source| StageError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_load_converts_color_to_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.png");

        let mut img = RgbImage::from_pixel(10, 6, Rgb([255, 255, 255]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.save(&path).unwrap();

        let gray = load_grayscale(&path).unwrap();
        assert_eq!(gray.dimensions(), (10, 6));
        assert_eq!(gray.get_pixel(5, 5).0[0], 255);
        assert!(gray.get_pixel(0, 0).0[0] < 255);
    }

    #[test]
    fn test_load_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = load_grayscale(&path).unwrap_err();
        assert!(matches!(err, StageError::Read { .. }));
    }

    #[test]
    fn test_save_bitmap_forces_bmp_extension() {
        let dir = tempfile::tempdir().unwrap();
        let img = GrayImage::from_fn(8, 8, |x, _| if x < 4 { Luma([0]) } else { Luma([255]) });

        let written = save_bitmap(&img, &dir.path().join("smoothed_shape.png")).unwrap();
        assert_eq!(written, dir.path().join("smoothed_shape.bmp"));
        assert!(!dir.path().join("smoothed_shape.png").exists());

        let format = image::ImageReader::open(&written)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .format();
        assert_eq!(format, Some(ImageFormat::Bmp));
        assert_eq!(load_grayscale(&written).unwrap(), img);
    }
}
