//! hoa-resample: Resampling and downsampling of voxel volumes.
//!
//! This crate provides:
//! - **`CpuResampler`** - nearest neighbour and trilinear resampling through a
//!   similarity transform, parallel over z planes
//! - **Pyramids** - 2x mean downsampling for multi-resolution levels
//!
#![warn(missing_docs)]

mod pyramid;
mod resample;

pub use pyramid::{build_pyramid, downsample_2x};
pub use resample::{CpuResampler, ResampleConfig};

// Re-export the core resampling interface
pub use hoa_core::image::{Image, ImageGrid, Interpolator, Resampler};
