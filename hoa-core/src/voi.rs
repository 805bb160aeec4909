//! Volumes of interest.
//!
//! A volume of interest (VOI) is a cuboid sub-volume of a dataset, defined
//! at one downsample level. Coordinates are array coordinates, where 0 is the
//! centre of the first voxel, 1 the centre of the second voxel and so on.
//!
//! VOIs are immutable: changing level or dataset returns a new VOI.
#![allow(clippy::cast_possible_wrap)]

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::array::{ArrayProvider, LazyArray};
use crate::coordinate::{transform_point, ArrayCoordinate};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::image::{Image, ImageGrid, Interpolator, Resampler};
use crate::registration::RegistrationInventory;
use crate::transform::SimilarityTransform;

/// Where the transform between two datasets comes from.
#[derive(Debug, Clone, Copy)]
pub enum TransformSource<'a> {
    /// Look the transform up in a registration inventory.
    Inventory(&'a RegistrationInventory),
    /// Use this transform, mapping the source dataset on to the target.
    Explicit(SimilarityTransform),
}

impl TransformSource<'_> {
    /// Transform mapping `source` physical space on to `target`.
    ///
    /// # Errors
    /// Returns [`Error::NoRegistrationPath`] if an inventory lookup fails.
    pub fn resolve(&self, source: &Dataset, target: &Dataset) -> Result<SimilarityTransform> {
        match self {
            Self::Inventory(inventory) => inventory.get_registration(source, target),
            Self::Explicit(transform) => Ok(*transform),
        }
    }
}

impl<'a> From<&'a RegistrationInventory> for TransformSource<'a> {
    fn from(inventory: &'a RegistrationInventory) -> Self {
        Self::Inventory(inventory)
    }
}

impl From<SimilarityTransform> for TransformSource<'_> {
    fn from(transform: SimilarityTransform) -> Self {
        Self::Explicit(transform)
    }
}

fn check_level(level: i32) -> Result<u32> {
    u32::try_from(level).map_err(|_| Error::InvalidParameter {
        parameter: "downsample_level",
        reason: format!("level must be >= 0, got {level}"),
    })
}

fn check_extent(lower_corner: ArrayCoordinate, size: ArrayCoordinate) -> Result<()> {
    lower_corner
        .checked_add(&size)
        .map(|_| ())
        .ok_or_else(|| Error::InvalidParameter {
            parameter: "size",
            reason: format!("upper corner of {lower_corner} + {size} overflows"),
        })
}

/// A volume of interest attached to a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Voi {
    dataset: Arc<Dataset>,
    downsample_level: u32,
    lower_corner: ArrayCoordinate,
    size: ArrayCoordinate,
}

impl Voi {
    /// Creates a VOI.
    ///
    /// The corner and size are not checked against the dataset bounds; a VOI
    /// outside of the dataset only fails when its data is read.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `downsample_level` is negative
    /// or the upper corner does not fit in an `i64`.
    pub fn new(
        dataset: Arc<Dataset>,
        downsample_level: i32,
        lower_corner: ArrayCoordinate,
        size: ArrayCoordinate,
    ) -> Result<Self> {
        check_extent(lower_corner, size)?;
        Ok(Self {
            dataset,
            downsample_level: check_level(downsample_level)?,
            lower_corner,
            size,
        })
    }

    /// Dataset this VOI is in.
    #[must_use]
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Downsample level the VOI is defined at.
    #[must_use]
    pub fn downsample_level(&self) -> u32 {
        self.downsample_level
    }

    /// Index of the lower corner.
    #[must_use]
    pub fn lower_corner(&self) -> ArrayCoordinate {
        self.lower_corner
    }

    /// Size in voxels.
    #[must_use]
    pub fn size(&self) -> ArrayCoordinate {
        self.size
    }

    /// Exclusive upper corner, `lower_corner + size`.
    #[must_use]
    pub fn upper_corner(&self) -> ArrayCoordinate {
        self.lower_corner + self.size
    }

    /// Voxel size at this VOI's downsample level, in micrometers.
    #[must_use]
    pub fn voxel_size_um(&self) -> f64 {
        self.dataset.voxel_size_um() * level_factor(self.downsample_level)
    }

    /// All 8 corners, x varying slowest and z fastest.
    #[must_use]
    pub fn corners(&self) -> [ArrayCoordinate; 8] {
        let lo = self.lower_corner;
        let hi = self.upper_corner();
        let mut corners = [ArrayCoordinate::default(); 8];
        let mut i = 0;
        for x in [lo.x, hi.x] {
            for y in [lo.y, hi.y] {
                for z in [lo.z, hi.z] {
                    corners[i] = ArrayCoordinate::new(x, y, z);
                    i += 1;
                }
            }
        }
        corners
    }

    /// Lazy data array for this VOI.
    ///
    /// # Errors
    /// Returns any error raised by the provider. Voxels are not read.
    pub fn get_data_array(&self, provider: &dyn ArrayProvider) -> Result<LazyArray> {
        let array = provider.array(&self.dataset, self.downsample_level)?;
        let lo = self.lower_corner;
        let hi = self.upper_corner();
        Ok(array.isel(lo.x..hi.x, lo.y..hi.y, lo.z..hi.z))
    }

    /// Reads this VOI into an image with its physical spacing and origin.
    ///
    /// # Errors
    /// Returns any error raised by the provider, including out of bounds
    /// reads.
    pub fn get_image(&self, provider: &dyn ArrayProvider) -> Result<Image> {
        Image::from_lazy(&self.get_data_array(provider)?)
    }

    /// The same region at another downsample level.
    ///
    /// The lower corner is rounded down and the size rounded up, so the new
    /// VOI always contains the original region.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `new_level` is negative or the
    /// region does not fit in `i64` coordinates at the new level.
    pub fn change_downsample_level(&self, new_level: i32) -> Result<Self> {
        let new_level = check_level(new_level)?;
        if new_level == self.downsample_level {
            return Ok(self.clone());
        }
        let ratio = level_factor(self.downsample_level) / level_factor(new_level);
        let lower_corner = self.lower_corner.scaled(ratio).floor();
        let size = self.size.scaled(ratio).ceil();
        check_extent(lower_corner, size)?;
        Ok(Self {
            dataset: Arc::clone(&self.dataset),
            downsample_level: new_level,
            lower_corner,
            size,
        })
    }

    /// Transforms this VOI into another dataset.
    ///
    /// The returned VOI is at downsample level 0 and is the smallest
    /// axis-aligned box of target voxels containing the transformed region.
    ///
    /// # Errors
    /// Returns [`Error::NoRegistrationPath`] if the transform is looked up in
    /// an inventory that does not connect the datasets, or
    /// [`Error::InvalidParameter`] if either voxel size is unusable or the
    /// transformed box does not fit in `i64` coordinates.
    pub fn transform_to<'a>(
        &self,
        target: Arc<Dataset>,
        transform: impl Into<TransformSource<'a>>,
    ) -> Result<Self> {
        let source: TransformSource<'a> = transform.into();
        let transform = source.resolve(&self.dataset, &target)?;
        self.dataset.validate()?;
        target.validate()?;

        // Registrations are defined at full resolution.
        let full_res = self.change_downsample_level(0)?;
        let source_voxel = self.dataset.voxel_size_um();
        let target_voxel = target.voxel_size_um();

        let corners = full_res.corners().map(|corner| {
            let physical = corner.to_physical(source_voxel);
            transform_point(&physical, &transform).to_array(target_voxel)
        });

        let (lower, upper) = corners[1..]
            .iter()
            .fold((corners[0], corners[0]), |(lo, hi), c| (lo.min(c), hi.max(c)));
        let size = upper
            .checked_add(&ArrayCoordinate::new(1, 1, 1))
            .and_then(|upper| upper.checked_sub(&lower))
            .ok_or_else(|| Error::InvalidParameter {
                parameter: "lower_corner",
                reason: format!("transformed box {lower}..={upper} overflows"),
            })?;

        debug!(
            "transformed {} {} -> {} {}",
            self.dataset.name(),
            full_res.lower_corner,
            target.name(),
            lower
        );
        Self::new(target, 0, lower, size)
    }

    /// Resamples this VOI's data on to the grid of `target`.
    ///
    /// `transform` maps this VOI's dataset on to the target's dataset. The
    /// resampler is given its inverse, since resampling maps output grid
    /// points back to input points. Voxels outside of this VOI are set to 0.
    ///
    /// # Errors
    /// Returns any error from resolving the transform, reading this VOI, or
    /// resampling.
    pub fn get_data_array_on_voi<'a>(
        &self,
        target: &Voi,
        provider: &dyn ArrayProvider,
        resampler: &dyn Resampler,
        interpolator: Interpolator,
        transform: impl Into<TransformSource<'a>>,
    ) -> Result<Image> {
        let source: TransformSource<'a> = transform.into();
        let transform = source.resolve(&self.dataset, &target.dataset)?;
        let moving = self.get_image(provider)?;
        let reference = ImageGrid::of(&target.get_data_array(provider)?);
        let data = resampler.resample(&moving, &reference, &transform.inverse(), interpolator, 0)?;
        Ok(Image::new(data, reference.spacing_um, reference.origin))
    }
}

impl fmt::Display for Voi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VOI(dataset={}, downsample_level={}, lower_corner={}, size={})",
            self.dataset.name(),
            self.downsample_level,
            self.lower_corner,
            self.size
        )
    }
}

/// Spacing multiplier of a downsample level, `2^level`.
fn level_factor(level: u32) -> f64 {
    2f64.powi(level as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::PhysicalCoordinate;
    use crate::transform::build_transform;
    use approx::assert_relative_eq;

    fn spleen() -> Arc<Dataset> {
        Arc::new(Dataset::new(
            "LADAF-2020-27_spleen_complete-organ_25.08um_bm05",
            25.08,
        ))
    }

    fn voi(level: i32, lower: [i64; 3], size: [i64; 3]) -> Voi {
        Voi::new(spleen(), level, lower.into(), size.into()).unwrap()
    }

    #[test]
    fn test_voi_properties() {
        let v = voi(2, [1, 2, 3], [30, 20, 10]);
        assert_eq!(v.voxel_size_um(), 100.32);
        assert_eq!(v.upper_corner(), ArrayCoordinate::new(31, 22, 13));
    }

    #[test]
    fn test_negative_level_rejected() {
        let err = Voi::new(spleen(), -1, ArrayCoordinate::default(), [1, 1, 1].into()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter { parameter: "downsample_level", .. }
        ));
        assert!(voi(0, [0, 0, 0], [1, 1, 1]).change_downsample_level(-3).is_err());
    }

    #[test]
    fn test_extent_overflow_rejected() {
        let edge = ArrayCoordinate::new(i64::MAX - 5, 0, 0);
        let err = Voi::new(spleen(), 0, edge, [10, 1, 1].into()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { parameter: "size", .. }));

        // Fits at level 0, not once scaled to full resolution from level 3.
        let v = voi(3, [i64::MAX / 4, 0, 0], [1, 1, 1]);
        assert!(v.change_downsample_level(0).is_err());
    }

    #[test]
    fn test_transform_to_overflow_is_an_error() {
        let v = voi(0, [i64::MAX - 5, 0, 0], [1, 1, 1]);
        let other = Arc::new(Dataset::new("finer", 12.54));
        let err = v
            .transform_to(other, SimilarityTransform::identity())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter { parameter: "lower_corner", .. }
        ));
    }

    #[test]
    fn test_corners() {
        let v = voi(0, [0, 10, 20], [1, 2, 3]);
        let corners = v.corners();
        assert_eq!(corners[0], ArrayCoordinate::new(0, 10, 20));
        assert_eq!(corners[1], ArrayCoordinate::new(0, 10, 23));
        assert_eq!(corners[2], ArrayCoordinate::new(0, 12, 20));
        assert_eq!(corners[7], ArrayCoordinate::new(1, 12, 23));
    }

    #[test]
    fn test_change_downsample_level() {
        let v = voi(4, [100, 50, 23], [40, 20, 1]);
        let fine = v.change_downsample_level(2).unwrap();
        assert_eq!(fine.downsample_level(), 2);
        assert_eq!(fine.lower_corner(), ArrayCoordinate::new(400, 200, 92));
        assert_eq!(fine.size(), ArrayCoordinate::new(160, 80, 4));

        let coarse = voi(0, [5, 6, 7], [3, 3, 3]).change_downsample_level(1).unwrap();
        assert_eq!(coarse.lower_corner(), ArrayCoordinate::new(2, 3, 3));
        assert_eq!(coarse.size(), ArrayCoordinate::new(2, 2, 2));
    }

    #[test]
    fn test_transform_to_identity_keeps_box() {
        let other = Arc::new(Dataset::new("same-grid", 25.08));
        let v = voi(0, [10, 20, 30], [4, 5, 6]);
        let t = v.transform_to(other, SimilarityTransform::identity()).unwrap();
        assert_eq!(t.lower_corner(), ArrayCoordinate::new(10, 20, 30));
        // Upper corners map to themselves and are made exclusive with +1.
        assert_eq!(t.size(), ArrayCoordinate::new(5, 6, 7));
    }

    #[test]
    fn test_transform_to_normalizes_level() {
        let other = Arc::new(Dataset::new("half", 50.16));
        let v = voi(1, [10, 20, 30], [4, 4, 4]);
        let t = v.transform_to(other, SimilarityTransform::identity()).unwrap();
        assert_eq!(t.downsample_level(), 0);
        assert_eq!(t.lower_corner(), ArrayCoordinate::new(10, 20, 30));
        assert_eq!(t.size(), ArrayCoordinate::new(5, 5, 5));
    }

    #[test]
    fn test_transform_to_without_registration() {
        let inventory = RegistrationInventory::new();
        let other = Arc::new(Dataset::new("unregistered", 1.0));
        let err = voi(0, [0, 0, 0], [1, 1, 1])
            .transform_to(other, &inventory)
            .unwrap_err();
        assert!(matches!(err, Error::NoRegistrationPath { .. }));
        assert!(err.to_string().contains("unregistered"));
    }

    #[test]
    fn test_transform_to_translation() {
        let other = Arc::new(Dataset::new("other", 2.0));
        let mut inventory = RegistrationInventory::new();
        let shift = build_transform(PhysicalCoordinate::new(10.0, 0.0, -4.0), 0.0, 1.0).unwrap();
        inventory.add_registration(&spleen(), &other, shift);

        let v = Voi::new(
            Arc::new(Dataset::new("LADAF-2020-27_spleen_complete-organ_25.08um_bm05", 1.0)),
            0,
            [0, 0, 8].into(),
            [4, 4, 4].into(),
        )
        .unwrap();
        let t = v.transform_to(Arc::clone(&other), &inventory).unwrap();
        assert_eq!(t.dataset().name(), "other");
        assert_eq!(t.lower_corner(), ArrayCoordinate::new(5, 0, 2));
        assert_eq!(t.size(), ArrayCoordinate::new(3, 3, 3));
        assert_relative_eq!(t.voxel_size_um(), 2.0);
    }

    #[test]
    fn test_display() {
        let v = voi(1, [1, 2, 3], [4, 5, 6]);
        assert_eq!(
            v.to_string(),
            "VOI(dataset=LADAF-2020-27_spleen_complete-organ_25.08um_bm05, downsample_level=1, \
             lower_corner=(x=1, y=2, z=3), size=(x=4, y=5, z=6))"
        );
    }
}
