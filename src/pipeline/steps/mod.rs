//! Individual raster stages

pub mod crop;
pub mod sharpen;
pub mod smooth;
pub mod threshold;
