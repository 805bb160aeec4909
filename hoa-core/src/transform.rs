//! Similarity transforms between physical spaces.
//!
//! A similarity transform is an isotropic scale, followed by a rotation,
//! followed by a translation:
//!
//! ```text
//! T(p) = scale * (R · p) + t
//! ```
//!
//! Points are ordered `(z, y, x)` inside a transform. Use
//! [`transform_point`](crate::coordinate::transform_point) to apply one to a
//! [`PhysicalCoordinate`].

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::coordinate::PhysicalCoordinate;
use crate::error::{Error, Result};

/// Invertible similarity transform acting on `(z, y, x)` ordered points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    scale: f64,
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SimilarityTransform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Builds a transform from its parts, all in `(z, y, x)` order.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if `scale` is not a finite positive
    /// number or the translation is not finite.
    pub fn from_parts(
        scale: f64,
        rotation: Rotation3<f64>,
        translation_zyx: Vector3<f64>,
    ) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::invalid(
                "scale",
                format!("must be finite and > 0, got {scale}"),
            ));
        }
        if !translation_zyx.iter().all(|v| v.is_finite()) {
            return Err(Error::invalid(
                "translation",
                format!("must be finite, got {translation_zyx:?}"),
            ));
        }
        Ok(Self {
            scale,
            rotation,
            translation: translation_zyx,
        })
    }

    /// Isotropic scale factor.
    #[inline]
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotation matrix, `(z, y, x)` ordered.
    #[inline]
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        *self.rotation.matrix()
    }

    /// Translation, `(z, y, x)` ordered.
    #[inline]
    #[must_use]
    pub fn translation_zyx(&self) -> Vector3<f64> {
        self.translation
    }

    /// Translation as a physical coordinate.
    #[inline]
    #[must_use]
    pub fn translation(&self) -> PhysicalCoordinate {
        PhysicalCoordinate::from_zyx(&self.translation)
    }

    /// Applies the transform to a `(z, y, x)` ordered point.
    #[inline]
    #[must_use]
    pub fn apply_zyx(&self, point: &Vector3<f64>) -> Vector3<f64> {
        (self.rotation * point) * self.scale + self.translation
    }

    /// The exact inverse of this transform.
    ///
    /// Applying a transform and then its inverse to a point whose image has
    /// no rounding error returns the point unchanged.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let scale = 1.0 / self.scale;
        Self {
            scale,
            rotation,
            translation: (rotation * (-self.translation)) * scale,
        }
    }

    /// Returns the transform that applies `self` first and `next` second.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        Self {
            scale: self.scale * next.scale,
            rotation: next.rotation * self.rotation,
            translation: (next.rotation * self.translation) * next.scale + next.translation,
        }
    }

    /// Composes transforms in order, first element applied first.
    ///
    /// An empty sequence composes to the identity.
    pub fn compose<'a, I>(transforms: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        transforms
            .into_iter()
            .fold(Self::identity(), |acc, t| acc.then(t))
    }
}

/// Builds a similarity transform from a translation, rotation and scale.
///
/// The transform scales by `scale`, rotates by `rotation_deg` degrees about
/// the first axis of its `(z, y, x)` frame (the physical z axis, so x and y
/// are mixed), then translates. The centre of rotation is the origin.
///
/// # Errors
/// Returns [`Error::InvalidParameter`] if `scale` is not finite and positive,
/// or if the rotation or translation are not finite.
pub fn build_transform(
    translation: PhysicalCoordinate,
    rotation_deg: f64,
    scale: f64,
) -> Result<SimilarityTransform> {
    if !rotation_deg.is_finite() {
        return Err(Error::invalid(
            "rotation",
            format!("must be finite, got {rotation_deg}"),
        ));
    }
    let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), rotation_deg.to_radians());
    SimilarityTransform::from_parts(scale, rotation, translation.to_zyx())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> SimilarityTransform {
        build_transform(PhysicalCoordinate::new(12.5, -3.0, 40.0), 17.0, 1.7).unwrap()
    }

    #[test]
    fn test_identity() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(SimilarityTransform::identity().apply_zyx(&p), p);
        assert_eq!(SimilarityTransform::default(), SimilarityTransform::identity());
    }

    #[test]
    fn test_scale_then_rotate_then_translate() {
        let t = build_transform(PhysicalCoordinate::new(0.0, 0.0, 10.0), 90.0, 2.0).unwrap();
        // (z, y, x) = (1, 1, 0): scale -> (2, 2, 0), rotate -> (2, 0, 2),
        // translate z by 10 -> (12, 0, 2).
        let out = t.apply_zyx(&Vector3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(out, Vector3::new(12.0, 0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = sample();
        let inv = t.inverse();
        let p = Vector3::new(-4.25, 1000.0, 3.5);
        assert_relative_eq!(inv.apply_zyx(&t.apply_zyx(&p)), p, epsilon = 1e-9);
        assert_relative_eq!(t.apply_zyx(&inv.apply_zyx(&p)), p, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_of_origin_is_exact() {
        let t = sample();
        let origin = Vector3::zeros();
        assert_eq!(t.inverse().apply_zyx(&t.apply_zyx(&origin)), origin);
    }

    #[test]
    fn test_then_matches_sequential_application() {
        let a = sample();
        let b = build_transform(PhysicalCoordinate::new(-1.0, 5.0, 0.5), -33.0, 0.25).unwrap();
        let p = Vector3::new(3.0, -7.0, 11.0);

        let ab = a.then(&b);
        assert_relative_eq!(ab.apply_zyx(&p), b.apply_zyx(&a.apply_zyx(&p)), epsilon = 1e-9);
        assert_relative_eq!(ab.scale(), 1.7 * 0.25);

        // Translations make composition order matter.
        let ba = b.then(&a);
        assert!((ab.apply_zyx(&p) - ba.apply_zyx(&p)).norm() > 1.0);
    }

    #[test]
    fn test_compose_empty_is_identity() {
        let t = SimilarityTransform::compose(std::iter::empty());
        assert_eq!(t, SimilarityTransform::identity());
    }

    #[test]
    fn test_invalid_parameters() {
        let origin = PhysicalCoordinate::origin();
        assert!(matches!(
            build_transform(origin, 0.0, 0.0),
            Err(Error::InvalidParameter { parameter: "scale", .. })
        ));
        assert!(build_transform(origin, 0.0, -1.0).is_err());
        assert!(build_transform(origin, f64::NAN, 1.0).is_err());
        assert!(build_transform(PhysicalCoordinate::new(f64::INFINITY, 0.0, 0.0), 0.0, 1.0).is_err());
    }

    #[test]
    fn test_translation_accessors() {
        let t = build_transform(PhysicalCoordinate::new(1.0, 2.0, 3.0), 0.0, 1.0).unwrap();
        assert_eq!(t.translation_zyx(), Vector3::new(3.0, 2.0, 1.0));
        assert_eq!(t.translation(), PhysicalCoordinate::new(1.0, 2.0, 3.0));
    }
}
