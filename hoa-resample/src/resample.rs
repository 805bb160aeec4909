//! CPU resampler.
//!
//! Every reference voxel is mapped to a physical point, through the
//! transform into the moving image's physical space, and then to a
//! continuous voxel index of the moving image where it is sampled.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use hoa_core::coordinate::transform_point;
use hoa_core::error::{Error, Result};
use hoa_core::image::{Image, ImageGrid, Interpolator, Resampler};
use hoa_core::transform::SimilarityTransform;
use log::debug;
use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

/// Slack allowed when deciding whether a continuous index is inside an axis.
const INDEX_TOLERANCE: f64 = 1e-6;

/// Resampler configuration.
#[derive(Clone, Debug)]
pub struct ResampleConfig {
    /// Whether to resample z planes in parallel.
    pub parallel: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Resampler running on the CPU.
#[derive(Clone, Debug, Default)]
pub struct CpuResampler {
    config: ResampleConfig,
}

impl CpuResampler {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: ResampleConfig) -> Self {
        Self { config }
    }

    /// Set whether to use parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }
}

fn check_spacing(parameter: &'static str, spacing: f64) -> Result<()> {
    if spacing.is_finite() && spacing > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            parameter,
            reason: format!("spacing must be positive, got {spacing}"),
        })
    }
}

/// Clamped position along one axis, or `None` if outside `[0, len - 1]`.
#[inline]
fn axis_position(index: f64, len: usize) -> Option<f64> {
    let last = len.checked_sub(1)? as f64;
    if index < -INDEX_TOLERANCE || index > last + INDEX_TOLERANCE || index.is_nan() {
        return None;
    }
    Some(index.clamp(0.0, last))
}

/// Lower neighbour, upper neighbour and weight of the upper neighbour.
#[inline]
fn linear_weights(position: f64, len: usize) -> (usize, usize, f64) {
    let lower = (position.floor() as usize).min(len - 1);
    let upper = (lower + 1).min(len - 1);
    (lower, upper, position - lower as f64)
}

fn sample(data: &ArrayView3<'_, u16>, index: [f64; 3], interpolator: Interpolator) -> Option<u16> {
    let (nz, ny, nx) = data.dim();
    let z = axis_position(index[0], nz)?;
    let y = axis_position(index[1], ny)?;
    let x = axis_position(index[2], nx)?;

    let value = match interpolator {
        Interpolator::NearestNeighbor => {
            return Some(data[[z.round() as usize, y.round() as usize, x.round() as usize]]);
        }
        Interpolator::Linear => {
            let (z0, z1, wz) = linear_weights(z, nz);
            let (y0, y1, wy) = linear_weights(y, ny);
            let (x0, x1, wx) = linear_weights(x, nx);
            let v = |z, y, x| f64::from(data[[z, y, x]]);

            let c00 = v(z0, y0, x0) * (1.0 - wx) + v(z0, y0, x1) * wx;
            let c01 = v(z0, y1, x0) * (1.0 - wx) + v(z0, y1, x1) * wx;
            let c10 = v(z1, y0, x0) * (1.0 - wx) + v(z1, y0, x1) * wx;
            let c11 = v(z1, y1, x0) * (1.0 - wx) + v(z1, y1, x1) * wx;
            let c0 = c00 * (1.0 - wy) + c01 * wy;
            let c1 = c10 * (1.0 - wy) + c11 * wy;
            c0 * (1.0 - wz) + c1 * wz
        }
    };
    Some(value.round().clamp(0.0, f64::from(u16::MAX)) as u16)
}

impl Resampler for CpuResampler {
    fn resample(
        &self,
        moving: &Image,
        reference: &ImageGrid,
        transform: &SimilarityTransform,
        interpolator: Interpolator,
        fill_value: u16,
    ) -> Result<Array3<u16>> {
        check_spacing("moving spacing", moving.spacing_um)?;
        check_spacing("reference spacing", reference.spacing_um)?;

        let [nz, ny, nx] = reference.shape;
        debug!(
            "resampling {:?} on to {:?} ({interpolator:?})",
            moving.data.dim(),
            reference.shape
        );

        let plane_len = ny * nx;
        let mut out = vec![fill_value; nz * plane_len];
        if plane_len == 0 {
            return Array3::from_shape_vec((nz, ny, nx), out)
                .map_err(|e| Error::ShapeMismatch(e.to_string()));
        }

        let moving_grid = moving.grid();
        let data = moving.data.view();
        let fill_plane = |(z, plane): (usize, &mut [u16])| {
            for y in 0..ny {
                for x in 0..nx {
                    let point = transform_point(&reference.index_to_physical(z, y, x), transform);
                    let index = moving_grid.physical_to_index(&point);
                    if let Some(value) = sample(&data, index, interpolator) {
                        plane[y * nx + x] = value;
                    }
                }
            }
        };

        if self.config.parallel {
            out.par_chunks_mut(plane_len).enumerate().for_each(fill_plane);
        } else {
            out.chunks_mut(plane_len).enumerate().for_each(fill_plane);
        }

        Array3::from_shape_vec((nz, ny, nx), out).map_err(|e| Error::ShapeMismatch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoa_core::coordinate::PhysicalCoordinate;

    fn ramp() -> Array3<u16> {
        Array3::from_shape_fn((3, 4, 5), |(z, y, x)| (100 * z + 10 * y + x) as u16)
    }

    #[test]
    fn test_axis_position() {
        assert_eq!(axis_position(-0.5, 4), None);
        assert_eq!(axis_position(3.5, 4), None);
        assert_eq!(axis_position(3.0 + 1e-9, 4), Some(3.0));
        assert_eq!(axis_position(0.0, 0), None);
        assert_eq!(axis_position(f64::NAN, 4), None);
    }

    #[test]
    fn test_linear_midpoint() {
        let data = ramp();
        let value = sample(&data.view(), [0.5, 0.5, 0.5], Interpolator::Linear);
        // Mean of 0, 1, 10, 11, 100, 101, 110, 111.
        assert_eq!(value, Some(56));
    }

    #[test]
    fn test_nearest_rounds() {
        let data = ramp();
        let value = sample(&data.view(), [1.4, 2.6, 0.2], Interpolator::NearestNeighbor);
        assert_eq!(value, Some(130));
    }

    #[test]
    fn test_single_voxel_axis() {
        let data = Array3::from_elem((1, 1, 2), 7u16);
        assert_eq!(sample(&data.view(), [0.0, 0.0, 0.5], Interpolator::Linear), Some(7));
    }

    #[test]
    fn test_invalid_spacing() {
        let moving = Image::new(ramp(), 0.0, PhysicalCoordinate::origin());
        let grid = ImageGrid {
            shape: [1, 1, 1],
            spacing_um: 1.0,
            origin: PhysicalCoordinate::origin(),
        };
        let result = CpuResampler::default().resample(
            &moving,
            &grid,
            &SimilarityTransform::identity(),
            Interpolator::Linear,
            0,
        );
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let moving = Image::new(ramp(), 2.0, PhysicalCoordinate::new(1.0, 2.0, 3.0));
        let t = hoa_core::build_transform(PhysicalCoordinate::new(0.7, -1.3, 0.4), 5.0, 1.1)
            .unwrap();
        let grid = moving.grid();

        let parallel = CpuResampler::default()
            .resample(&moving, &grid, &t, Interpolator::Linear, 9)
            .unwrap();
        let sequential = CpuResampler::default()
            .with_parallel(false)
            .resample(&moving, &grid, &t, Interpolator::Linear, 9)
            .unwrap();
        assert_eq!(parallel, sequential);
    }
}
