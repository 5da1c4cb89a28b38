//! Convert bitmap images to SVG outlines.
//!
//! Each image is sharpened and binarized, cropped to its largest dark
//! region, smoothed, and finally traced by potrace.

pub mod config;
pub mod error;
pub mod inputs;
pub mod pipeline;
pub mod tracer;

pub use config::{Config, ConfigOverrides, PipelineConfig};
pub use error::{ConfigError, StageError};
pub use pipeline::{ImageJob, JobReport, Pipeline, PipelineResult, Stage};
pub use tracer::{Potrace, Tracer};
