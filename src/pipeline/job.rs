use std::path::{Path, PathBuf};

pub const BINARY_PREFIX: &str = "binary_";
pub const CROPPED_PREFIX: &str = "cropped_";
pub const SMOOTHED_PREFIX: &str = "smoothed_";
pub const OUTPUT_EXTENSION: &str = "svg";

/// One input image and every file the pipeline derives from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub input: PathBuf,
    /// Sanitized file stem shared by all derived files
    pub name: String,
    pub binary: PathBuf,
    pub cropped: PathBuf,
    pub smoothed: PathBuf,
    pub svg: PathBuf,
}

impl ImageJob {
    pub fn new(input: &Path, processed_dir: &Path, output_dir: &Path) -> Self {
        let name = base_name(input);

        Self {
            input: input.to_path_buf(),
            binary: processed_dir.join(format!("{}{}.png", BINARY_PREFIX, name)),
            cropped: processed_dir.join(format!("{}{}.png", CROPPED_PREFIX, name)),
            smoothed: processed_dir.join(format!("{}{}.bmp", SMOOTHED_PREFIX, name)),
            svg: output_dir.join(format!("{}.{}", name, OUTPUT_EXTENSION)),
            name,
        }
    }
}

/// File stem with anything outside `[A-Za-z0-9_.-]` replaced by `_`
pub fn base_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "image".to_string()
    } else {
        sanitized
    }
}
