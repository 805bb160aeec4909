//! Array-space and physical-space coordinates.
//!
//! All public coordinates are ordered `(x, y, z)`. Transforms act on points
//! ordered `(z, y, x)`; [`transform_point`] is the only place where that
//! reordering happens.
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::transform::SimilarityTransform;

/// Named array axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Axes in storage order of a voxel array.
    pub const ZYX: [Axis; 3] = [Axis::Z, Axis::Y, Axis::X];

    /// Position of this axis in a `(z, y, x)` ordered array.
    #[inline]
    #[must_use]
    pub fn array_index(self) -> usize {
        match self {
            Axis::Z => 0,
            Axis::Y => 1,
            Axis::X => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Voxel index into a dataset at a given downsample level.
///
/// There is no bounds invariant: coordinates may be negative or lie past the
/// end of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayCoordinate {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ArrayCoordinate {
    /// Creates a new array coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Returns the component along `axis`.
    #[inline]
    #[must_use]
    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Position of this voxel in physical space.
    #[inline]
    #[must_use]
    pub fn to_physical(&self, voxel_size_um: f64) -> PhysicalCoordinate {
        PhysicalCoordinate::new(
            self.x as f64 * voxel_size_um,
            self.y as f64 * voxel_size_um,
            self.z as f64 * voxel_size_um,
        )
    }

    /// Multiplies each component by `factor` without rounding.
    #[inline]
    #[must_use]
    pub fn scaled(&self, factor: f64) -> PhysicalCoordinate {
        PhysicalCoordinate::new(
            self.x as f64 * factor,
            self.y as f64 * factor,
            self.z as f64 * factor,
        )
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        Self::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        Self::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    /// Component-wise sum, or `None` if any component overflows.
    #[inline]
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(other.x)?,
            self.y.checked_add(other.y)?,
            self.z.checked_add(other.z)?,
        ))
    }

    /// Component-wise difference, or `None` if any component overflows.
    #[inline]
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        Some(Self::new(
            self.x.checked_sub(other.x)?,
            self.y.checked_sub(other.y)?,
            self.z.checked_sub(other.z)?,
        ))
    }

    /// Returns true if every component is strictly positive.
    #[inline]
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }
}

// Operators saturate at the `i64` range; use `checked_add`/`checked_sub`
// where overflow must be reported.
impl Add for ArrayCoordinate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x.saturating_add(rhs.x),
            self.y.saturating_add(rhs.y),
            self.z.saturating_add(rhs.z),
        )
    }
}

impl Add<i64> for ArrayCoordinate {
    type Output = Self;

    fn add(self, rhs: i64) -> Self {
        self + Self::new(rhs, rhs, rhs)
    }
}

impl Sub for ArrayCoordinate {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.x.saturating_sub(rhs.x),
            self.y.saturating_sub(rhs.y),
            self.z.saturating_sub(rhs.z),
        )
    }
}

impl From<[i64; 3]> for ArrayCoordinate {
    fn from([x, y, z]: [i64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for ArrayCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

/// Point in physical space, in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicalCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PhysicalCoordinate {
    /// Creates a new physical coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    #[inline]
    #[must_use]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Returns the component along `axis`.
    #[inline]
    #[must_use]
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Index of the voxel containing this point.
    ///
    /// This rounds down, so converting an array coordinate to physical space
    /// and back is not guaranteed to give the original value when the voxel
    /// sizes differ or the division is inexact.
    #[inline]
    #[must_use]
    pub fn to_array(&self, voxel_size_um: f64) -> ArrayCoordinate {
        (*self / voxel_size_um).floor()
    }

    /// Component-wise floor.
    #[inline]
    #[must_use]
    pub fn floor(&self) -> ArrayCoordinate {
        ArrayCoordinate::new(
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64,
        )
    }

    /// Component-wise ceiling.
    #[inline]
    #[must_use]
    pub fn ceil(&self) -> ArrayCoordinate {
        ArrayCoordinate::new(
            self.x.ceil() as i64,
            self.y.ceil() as i64,
            self.z.ceil() as i64,
        )
    }

    /// Returns true if every component is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Components in the `(z, y, x)` order used by transforms.
    #[inline]
    pub(crate) fn to_zyx(self) -> Vector3<f64> {
        Vector3::new(self.z, self.y, self.x)
    }

    /// Builds a coordinate from components in `(z, y, x)` order.
    #[inline]
    pub(crate) fn from_zyx(v: &Vector3<f64>) -> Self {
        Self::new(v[2], v[1], v[0])
    }
}

impl Add for PhysicalCoordinate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for PhysicalCoordinate {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for PhysicalCoordinate {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for PhysicalCoordinate {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl From<[f64; 3]> for PhysicalCoordinate {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for PhysicalCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={} um, y={} um, z={} um)", self.x, self.y, self.z)
    }
}

/// Applies `transform` to a physical point.
///
/// Transforms are defined on `(z, y, x)` ordered points. The point is
/// reordered on the way in and back to `(x, y, z)` on the way out. Every
/// caller that maps a point through a registration must use this function.
#[inline]
#[must_use]
pub fn transform_point(
    coord: &PhysicalCoordinate,
    transform: &SimilarityTransform,
) -> PhysicalCoordinate {
    let mapped = transform.apply_zyx(&coord.to_zyx());
    PhysicalCoordinate::from_zyx(&mapped)
}
