//! Raster-to-SVG pipeline
//!
//! Binarize, crop and smooth an image in memory, then hand a BMP to the
//! tracer. Intermediates are written next to each other for diagnostics.

pub mod job;
pub mod orchestrator;
pub mod raster;
pub mod steps;

pub use job::ImageJob;
pub use orchestrator::{JobReport, Pipeline, PipelineResult, Stage, StepTiming};
