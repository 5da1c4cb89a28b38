use crate::pipeline::job::base_name;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions picked up when a directory is given as input
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp",
];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand directories into their supported image files (sorted, not
/// recursive). Plain files are kept as given, whatever their extension.
pub fn collect(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported_image(p))
                .collect();
            found.sort();
            tracing::debug!("Found {} image(s) in {}", found.len(), path.display());
            inputs.extend(found);
        } else {
            inputs.push(path.clone());
        }
    }

    Ok(inputs)
}

/// Base names shared by more than one input, with the inputs that share them.
///
/// Jobs with the same base name would write the same intermediate and
/// output files.
pub fn duplicate_names(inputs: &[PathBuf]) -> Vec<(String, Vec<PathBuf>)> {
    let mut by_name: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for input in inputs {
        by_name.entry(base_name(input)).or_default().push(input.clone());
    }

    let mut duplicates: Vec<(String, Vec<PathBuf>)> = by_name
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .collect();
    duplicates.sort();
    duplicates
}
