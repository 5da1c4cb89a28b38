use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parameters of the image pipeline, fixed for the duration of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// One of "otsu", "adaptive", "fixed"
    pub binarization_method: String,
    /// Only used when `binarization_method` is "fixed"
    pub binarization_threshold: u8,
    /// One of "median", "gaussian", "none"
    pub smoothing_method: String,
    /// Odd, 1..=15
    pub smoothing_kernel_size: u32,
    /// 0.0..=5.0
    pub sharpen_intensity: f32,
    /// Speckles below this many pixels are dropped by the tracer (0..=100)
    #[serde(rename = "svg_turdsize", alias = "trace_speck_size")]
    pub trace_speck_size: u32,
    /// Jobs in flight at once (1..=16)
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binarization_method: "otsu".to_string(),
            binarization_threshold: 127,
            smoothing_method: "median".to_string(),
            smoothing_kernel_size: 3,
            sharpen_intensity: 0.5,
            trace_speck_size: 2,
            max_workers: 4,
        }
    }
}

impl PipelineConfig {
    /// Check numeric ranges and the odd-kernel invariant.
    ///
    /// Strategy names are not checked here; the stage that consumes them
    /// reports an unknown method as its own failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let smoothing_enabled = !self.smoothing_method.trim().eq_ignore_ascii_case("none");
        if smoothing_enabled {
            let k = self.smoothing_kernel_size;
            if !(1..=15).contains(&k) || k % 2 == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "smoothing_kernel_size",
                    message: format!("{} (must be odd and between 1 and 15)", k),
                });
            }
        }

        if !self.sharpen_intensity.is_finite() || !(0.0..=5.0).contains(&self.sharpen_intensity) {
            return Err(ConfigError::InvalidValue {
                field: "sharpen_intensity",
                message: format!("{} (must be between 0 and 5)", self.sharpen_intensity),
            });
        }

        if self.trace_speck_size > 100 {
            return Err(ConfigError::InvalidValue {
                field: "svg_turdsize",
                message: format!("{} (must be between 0 and 100)", self.trace_speck_size),
            });
        }

        if !(1..=16).contains(&self.max_workers) {
            return Err(ConfigError::InvalidValue {
                field: "max_workers",
                message: format!("{} (must be between 1 and 16)", self.max_workers),
            });
        }

        Ok(())
    }
}

/// Full run configuration: pipeline parameters plus where things live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
    /// Path (or bare name looked up on PATH) of the potrace executable
    pub potrace_path: PathBuf,
    /// Directory for binary_/cropped_/smoothed_ intermediates
    pub processed_dir: PathBuf,
    /// Directory for the final SVG files
    pub output_dir: PathBuf,
    /// Upper bound on a single tracer invocation
    pub trace_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            potrace_path: PathBuf::from("potrace"),
            processed_dir: PathBuf::from("processed_images"),
            output_dir: PathBuf::from("output_svgs"),
            trace_timeout_secs: 60,
        }
    }
}

/// Per-run overrides supplied by the caller; `None` keeps the loaded value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub binarization_method: Option<String>,
    pub binarization_threshold: Option<u8>,
    pub smoothing_method: Option<String>,
    pub smoothing_kernel_size: Option<u32>,
    pub sharpen_intensity: Option<f32>,
    pub trace_speck_size: Option<u32>,
    pub max_workers: Option<usize>,
    pub potrace_path: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub trace_timeout_secs: Option<u64>,
}

impl Config {
    /// Load a YAML or JSON config document, chosen by file extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let parsed = match ext.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str::<Config>(&text).map_err(|e| e.to_string())
            }
            Some("json") => serde_json::from_str::<Config>(&text).map_err(|e| e.to_string()),
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        let config = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply caller overrides on top of the loaded values
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        let p = &mut self.pipeline;
        if let Some(v) = overrides.binarization_method {
            p.binarization_method = v;
        }
        if let Some(v) = overrides.binarization_threshold {
            p.binarization_threshold = v;
        }
        if let Some(v) = overrides.smoothing_method {
            p.smoothing_method = v;
        }
        if let Some(v) = overrides.smoothing_kernel_size {
            p.smoothing_kernel_size = v;
        }
        if let Some(v) = overrides.sharpen_intensity {
            p.sharpen_intensity = v;
        }
        if let Some(v) = overrides.trace_speck_size {
            p.trace_speck_size = v;
        }
        if let Some(v) = overrides.max_workers {
            p.max_workers = v;
        }
        if let Some(v) = overrides.potrace_path {
            self.potrace_path = v;
        }
        if let Some(v) = overrides.processed_dir {
            self.processed_dir = v;
        }
        if let Some(v) = overrides.output_dir {
            self.output_dir = v;
        }
        if let Some(v) = overrides.trace_timeout_secs {
            self.trace_timeout_secs = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        if self.trace_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "trace_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn trace_timeout(&self) -> Duration {
        Duration::from_secs(self.trace_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml_document() {
        let file = write_config(
            ".yaml",
            "binarization_method: fixed\n\
             binarization_threshold: 100\n\
             smoothing_method: gaussian\n\
             smoothing_kernel_size: 5\n\
             sharpen_intensity: 1.5\n\
             svg_turdsize: 10\n\
             max_workers: 2\n\
             potrace_path: /opt/potrace/bin/potrace\n",
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pipeline.binarization_method, "fixed");
        assert_eq!(config.pipeline.binarization_threshold, 100);
        assert_eq!(config.pipeline.smoothing_method, "gaussian");
        assert_eq!(config.pipeline.smoothing_kernel_size, 5);
        assert_eq!(config.pipeline.sharpen_intensity, 1.5);
        assert_eq!(config.pipeline.trace_speck_size, 10);
        assert_eq!(config.pipeline.max_workers, 2);
        assert_eq!(config.potrace_path, PathBuf::from("/opt/potrace/bin/potrace"));
        // Unset keys fall back to defaults
        assert_eq!(config.output_dir, PathBuf::from("output_svgs"));
        assert_eq!(config.trace_timeout_secs, 60);
    }

    #[test]
    fn test_load_json_document() {
        let file = write_config(
            ".json",
            r#"{"binarization_method": "adaptive", "max_workers": 8}"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pipeline.binarization_method, "adaptive");
        assert_eq!(config.pipeline.max_workers, 8);
        assert_eq!(config.pipeline.smoothing_method, "median");
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = write_config(".ini", "max_workers = 2");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_reports_parse_error() {
        let file = write_config(".yaml", "max_workers: [not, a, number]");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides_replace_loaded_values() {
        let config = Config::default().apply(ConfigOverrides {
            binarization_method: Some("fixed".to_string()),
            binarization_threshold: Some(90),
            max_workers: Some(1),
            ..Default::default()
        });

        assert_eq!(config.pipeline.binarization_method, "fixed");
        assert_eq!(config.pipeline.binarization_threshold, 90);
        assert_eq!(config.pipeline.max_workers, 1);
        assert_eq!(config.pipeline.smoothing_method, "median");
    }

    #[test]
    fn test_validate_rejects_even_kernel() {
        let mut config = PipelineConfig::default();
        config.smoothing_kernel_size = 4;
        assert!(config.validate().is_err());

        config.smoothing_kernel_size = 17;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ignores_kernel_when_smoothing_disabled() {
        let config = PipelineConfig {
            smoothing_method: "none".to_string(),
            smoothing_kernel_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let config = PipelineConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            sharpen_intensity: 5.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            trace_speck_size: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(PipelineConfig::default().validate().is_ok());
    }
}
