//! Raster-to-vector tracing
//!
//! Tracing is delegated to an external program. The [`Tracer`] trait is the
//! seam between the pipeline and that program, so tests and alternative
//! backends can stand in for potrace.

pub mod potrace;

pub use potrace::Potrace;

use crate::error::StageError;
use futures::future::BoxFuture;
use std::path::Path;

/// Trait that every tracing backend implements
pub trait Tracer: Send + Sync {
    /// Returns the backend identifier (e.g., "potrace")
    fn name(&self) -> &'static str;

    /// Trace a monochrome BMP into an SVG file, dropping specks smaller
    /// than `speck_size` pixels
    fn trace<'a>(
        &'a self,
        bitmap: &'a Path,
        svg: &'a Path,
        speck_size: u32,
    ) -> BoxFuture<'a, Result<(), StageError>>;
}
