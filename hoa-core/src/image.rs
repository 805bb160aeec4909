//! Materialized images and the resampling interface.
#![allow(clippy::cast_precision_loss)]

use ndarray::Array3;

use crate::array::LazyArray;
use crate::coordinate::PhysicalCoordinate;
use crate::error::Result;
use crate::transform::SimilarityTransform;

/// Physical sampling grid of an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGrid {
    /// Number of voxels, `[z, y, x]`.
    pub shape: [usize; 3],
    /// Isotropic voxel spacing in micrometers.
    pub spacing_um: f64,
    /// Physical position of voxel `[0, 0, 0]`.
    pub origin: PhysicalCoordinate,
}

impl ImageGrid {
    /// Grid of a lazy array, without reading any voxels.
    #[must_use]
    pub fn of(array: &LazyArray) -> Self {
        let (z, y, x) = array.shape();
        Self {
            shape: [z, y, x],
            spacing_um: array.spacing_um(),
            origin: array.origin(),
        }
    }

    /// Physical position of the voxel at `[z, y, x]`.
    #[inline]
    #[must_use]
    pub fn index_to_physical(&self, z: usize, y: usize, x: usize) -> PhysicalCoordinate {
        self.origin
            + PhysicalCoordinate::new(x as f64, y as f64, z as f64) * self.spacing_um
    }

    /// Continuous voxel index `[z, y, x]` of a physical point.
    #[inline]
    #[must_use]
    pub fn physical_to_index(&self, point: &PhysicalCoordinate) -> [f64; 3] {
        let rel = (*point - self.origin) / self.spacing_um;
        [rel.z, rel.y, rel.x]
    }
}

/// Voxel data together with its physical grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Voxels, `(z, y, x)` ordered.
    pub data: Array3<u16>,
    pub spacing_um: f64,
    pub origin: PhysicalCoordinate,
}

impl Image {
    /// Creates an image.
    #[must_use]
    pub fn new(data: Array3<u16>, spacing_um: f64, origin: PhysicalCoordinate) -> Self {
        Self {
            data,
            spacing_um,
            origin,
        }
    }

    /// Reads a lazy array into an image.
    ///
    /// # Errors
    /// Returns any error raised while reading the array.
    pub fn from_lazy(array: &LazyArray) -> Result<Self> {
        Ok(Self::new(array.compute()?, array.spacing_um(), array.origin()))
    }

    /// Sampling grid of this image.
    #[must_use]
    pub fn grid(&self) -> ImageGrid {
        let (z, y, x) = self.data.dim();
        ImageGrid {
            shape: [z, y, x],
            spacing_um: self.spacing_um,
            origin: self.origin,
        }
    }
}

/// Interpolation used when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolator {
    /// Value of the nearest voxel.
    NearestNeighbor,
    /// Trilinear interpolation.
    #[default]
    Linear,
}

/// Resamples images on to other grids.
pub trait Resampler: Send + Sync {
    /// Samples `moving` at every voxel of `reference`.
    ///
    /// `transform` maps physical points of the reference grid to physical
    /// points of the moving image. Reference voxels that map outside of the
    /// moving image are set to `fill_value`.
    ///
    /// # Errors
    /// Implementations may fail on invalid grids.
    fn resample(
        &self,
        moving: &Image,
        reference: &ImageGrid,
        transform: &SimilarityTransform,
        interpolator: Interpolator,
        fill_value: u16,
    ) -> Result<Array3<u16>>;
}
