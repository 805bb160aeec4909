//! In-memory array provider.
//!
//! Holds voxel arrays per dataset and downsample level. Arrays stored in
//! `(x, y, z)` order, as OME-Zarr groups are, are wrapped in a
//! [`TransposedSource`] so every provided array reads `(z, y, x)`.
#![allow(clippy::cast_possible_wrap)]

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use hoa_core::array::{ArrayProvider, LazyArray, VoxelSource};
use hoa_core::{Dataset, Error as CoreError};
use hoa_resample::build_pyramid;
use log::debug;
use ndarray::Array3;

use crate::error::Result;
use crate::location::StorageLocation;

/// Presents an `(x, y, z)` ordered source as `(z, y, x)`.
pub struct TransposedSource<S> {
    inner: S,
}

impl<S: VoxelSource> TransposedSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: VoxelSource> VoxelSource for TransposedSource<S> {
    fn shape(&self) -> [usize; 3] {
        let [a, b, c] = self.inner.shape();
        [c, b, a]
    }

    fn read(
        &self,
        z: Range<usize>,
        y: Range<usize>,
        x: Range<usize>,
    ) -> hoa_core::Result<Array3<u16>> {
        let block = self.inner.read(x, y, z)?;
        Ok(block.reversed_axes().as_standard_layout().into_owned())
    }
}

/// Array provider backed by arrays held in memory.
#[derive(Default)]
pub struct InMemoryArrayProvider {
    arrays: HashMap<String, BTreeMap<u32, Arc<dyn VoxelSource>>>,
}

impl InMemoryArrayProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a `(z, y, x)` ordered array for one level of a dataset.
    pub fn insert_level(&mut self, dataset: &str, level: u32, data: Array3<u16>) {
        self.insert_source(dataset, level, Arc::new(data));
    }

    /// Stores a source for one level of a dataset, replacing any existing one.
    pub fn insert_source(&mut self, dataset: &str, level: u32, source: Arc<dyn VoxelSource>) {
        debug!("storing {dataset} level {level}: {:?}", source.shape());
        self.arrays
            .entry(dataset.to_owned())
            .or_default()
            .insert(level, source);
    }

    /// Stores an array in the axis order of the dataset's storage format.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedUrl`] if the dataset URL cannot be
    /// parsed.
    pub fn insert_stored(&mut self, dataset: &Dataset, level: u32, data: Array3<u16>) -> Result<()> {
        if StorageLocation::of(dataset)?.is_transposed() {
            self.insert_source(dataset.name(), level, Arc::new(TransposedSource::new(data)));
        } else {
            self.insert_level(dataset.name(), level, data);
        }
        Ok(())
    }

    /// Stores `base` as level 0 and its downsampled levels up to `max_level`.
    pub fn insert_pyramid(&mut self, dataset: &str, base: Array3<u16>, max_level: u32) {
        for (level, data) in (0..).zip(build_pyramid(base, max_level)) {
            self.insert_level(dataset, level, data);
        }
    }

    /// Levels held for a dataset, in increasing order.
    #[must_use]
    pub fn levels(&self, dataset: &str) -> Vec<u32> {
        self.arrays
            .get(dataset)
            .map(|levels| levels.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl ArrayProvider for InMemoryArrayProvider {
    fn array(&self, dataset: &Dataset, downsample_level: u32) -> hoa_core::Result<LazyArray> {
        let source = self
            .arrays
            .get(dataset.name())
            .and_then(|levels| levels.get(&downsample_level))
            .ok_or_else(|| CoreError::MissingArray {
                dataset: dataset.name().to_owned(),
                level: downsample_level,
            })?;
        let spacing = dataset.voxel_size_um() * 2f64.powi(downsample_level as i32);
        Ok(LazyArray::new(dataset.name(), Arc::clone(source), spacing))
    }
}
