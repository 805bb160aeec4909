//! Lazily evaluated voxel arrays.
//!
//! A [`LazyArray`] is a window onto a [`VoxelSource`]. Slicing only moves the
//! window; voxels are read when [`LazyArray::compute`] is called. Arrays are
//! stored `(z, y, x)`, and every axis is labelled with physical coordinates
//! `index * spacing`.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap, clippy::cast_precision_loss)]

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use ndarray::{s, Array3};

use crate::coordinate::{Axis, PhysicalCoordinate};
use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Read-only source of voxels.
pub trait VoxelSource: Send + Sync {
    /// Shape of the full array, `[z, y, x]`.
    fn shape(&self) -> [usize; 3];

    /// Reads a block of voxels. Ranges are guaranteed to be within `shape()`.
    fn read(&self, z: Range<usize>, y: Range<usize>, x: Range<usize>) -> Result<Array3<u16>>;
}

impl VoxelSource for Array3<u16> {
    fn shape(&self) -> [usize; 3] {
        let (z, y, x) = self.dim();
        [z, y, x]
    }

    fn read(&self, z: Range<usize>, y: Range<usize>, x: Range<usize>) -> Result<Array3<u16>> {
        Ok(self.slice(s![z, y, x]).to_owned())
    }
}

/// Gives access to the voxel arrays of datasets.
pub trait ArrayProvider: Send + Sync {
    /// Lazy array for `dataset` at `downsample_level`.
    ///
    /// # Errors
    /// Returns an error if the provider has no array for the dataset or level.
    fn array(&self, dataset: &Dataset, downsample_level: u32) -> Result<LazyArray>;
}

/// Lazily evaluated window onto a voxel source.
#[derive(Clone)]
pub struct LazyArray {
    name: String,
    source: Arc<dyn VoxelSource>,
    spacing_um: f64,
    /// Half-open index window per axis, `[z, y, x]`.
    window: [Range<i64>; 3],
}

impl LazyArray {
    /// Wraps a full voxel source.
    pub fn new(name: impl Into<String>, source: Arc<dyn VoxelSource>, spacing_um: f64) -> Self {
        let [z, y, x] = source.shape();
        Self {
            name: name.into(),
            source,
            spacing_um,
            window: [0..z as i64, 0..y as i64, 0..x as i64],
        }
    }

    /// Array name, usually the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Voxel spacing in micrometers.
    #[must_use]
    pub fn spacing_um(&self) -> f64 {
        self.spacing_um
    }

    /// Selects a half-open index range along each axis.
    ///
    /// Ranges are relative to this array. Nothing is checked or read until
    /// [`compute`](Self::compute) is called.
    #[must_use]
    pub fn isel(&self, x: Range<i64>, y: Range<i64>, z: Range<i64>) -> Self {
        let shift = |current: &Range<i64>, r: Range<i64>| {
            (current.start + r.start)..(current.start + r.end)
        };
        Self {
            name: self.name.clone(),
            source: Arc::clone(&self.source),
            spacing_um: self.spacing_um,
            window: [
                shift(&self.window[0], z),
                shift(&self.window[1], y),
                shift(&self.window[2], x),
            ],
        }
    }

    fn range(&self, axis: Axis) -> &Range<i64> {
        &self.window[axis.array_index()]
    }

    /// Number of elements along `axis`.
    #[must_use]
    pub fn len(&self, axis: Axis) -> usize {
        let r = self.range(axis);
        (r.end - r.start).max(0) as usize
    }

    /// Returns true if any axis has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Axis::ZYX.iter().any(|&a| self.len(a) == 0)
    }

    /// Shape `(z, y, x)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.len(Axis::Z), self.len(Axis::Y), self.len(Axis::X))
    }

    /// Physical coordinate labels along `axis`.
    #[must_use]
    pub fn coords(&self, axis: Axis) -> Vec<f64> {
        self.range(axis)
            .clone()
            .map(|i| i as f64 * self.spacing_um)
            .collect()
    }

    /// Physical coordinate of the first voxel.
    #[must_use]
    pub fn origin(&self) -> PhysicalCoordinate {
        PhysicalCoordinate::new(
            self.range(Axis::X).start as f64,
            self.range(Axis::Y).start as f64,
            self.range(Axis::Z).start as f64,
        ) * self.spacing_um
    }

    /// Reads the voxels in this window.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the window reaches outside of the
    /// source array, or any error raised by the source.
    pub fn compute(&self) -> Result<Array3<u16>> {
        let full = self.source.shape();
        let mut ranges: [Range<usize>; 3] = [0..0, 0..0, 0..0];
        for axis in Axis::ZYX {
            let i = axis.array_index();
            let r = &self.window[i];
            if r.start < 0 || r.end < r.start || r.end > full[i] as i64 {
                return Err(Error::OutOfBounds {
                    axis,
                    start: r.start,
                    end: r.end,
                    len: full[i],
                });
            }
            ranges[i] = r.start as usize..r.end as usize;
        }

        let [z, y, x] = ranges;
        let data = self.source.read(z, y, x)?;
        if data.dim() != self.shape() {
            return Err(Error::ShapeMismatch(format!(
                "{} returned {:?}, expected {:?}",
                self.name,
                data.dim(),
                self.shape()
            )));
        }
        Ok(data)
    }
}

impl fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArray")
            .field("name", &self.name)
            .field("spacing_um", &self.spacing_um)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
