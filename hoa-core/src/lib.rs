//! hoa-core: Volume of interest geometry and cross-dataset registration for
//! Human Organ Atlas datasets.
//!
//! This crate provides coordinate types, similarity transforms, the
//! registration inventory, volumes of interest, and the array and resampling
//! interfaces that concrete backends implement.
//!

pub mod array;
pub mod coordinate;
pub mod dataset;
pub mod error;
pub mod image;
pub mod registration;
pub mod transform;
pub mod voi;

pub use array::{ArrayProvider, LazyArray, VoxelSource};
pub use coordinate::{transform_point, ArrayCoordinate, Axis, PhysicalCoordinate};
pub use dataset::{DataInfo, Dataset, Donor, RegistrationHint, Sample, Scan};
pub use error::{Error, Result};
pub use image::{Image, ImageGrid, Interpolator, Resampler};
pub use registration::RegistrationInventory;
pub use transform::{build_transform, SimilarityTransform};
pub use voi::{TransformSource, Voi};
