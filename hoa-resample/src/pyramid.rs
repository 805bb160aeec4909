//! Multi-resolution pyramids.
//!
//! Level `n + 1` is level `n` downsampled by 2 along every axis, each output
//! voxel being the mean of a 2x2x2 block. Odd-sized axes round up; the last
//! block along such an axis only averages the voxels that exist.
#![allow(clippy::cast_possible_truncation)]

use log::debug;
use ndarray::Array3;
use rayon::prelude::*;

/// Halves the resolution of a volume by block averaging.
#[must_use]
pub fn downsample_2x(data: &Array3<u16>) -> Array3<u16> {
    let (nz, ny, nx) = data.dim();
    let (oz, oy, ox) = (nz.div_ceil(2), ny.div_ceil(2), nx.div_ceil(2));
    let plane_len = oy * ox;
    let mut out = vec![0u16; oz * plane_len];
    if plane_len == 0 {
        return Array3::zeros((oz, oy, ox));
    }

    out.par_chunks_mut(plane_len)
        .enumerate()
        .for_each(|(z, plane)| {
            for y in 0..oy {
                for x in 0..ox {
                    let mut sum = 0u32;
                    let mut count = 0u32;
                    for iz in 2 * z..(2 * z + 2).min(nz) {
                        for iy in 2 * y..(2 * y + 2).min(ny) {
                            for ix in 2 * x..(2 * x + 2).min(nx) {
                                sum += u32::from(data[[iz, iy, ix]]);
                                count += 1;
                            }
                        }
                    }
                    // Round half up.
                    plane[y * ox + x] = ((sum + count / 2) / count) as u16;
                }
            }
        });

    // `out` holds exactly `oz` planes of `oy * ox` voxels.
    Array3::from_shape_vec((oz, oy, ox), out).expect("buffer matches output shape")
}

/// Builds levels `0..=max_level`, level 0 being `base`.
#[must_use]
pub fn build_pyramid(base: Array3<u16>, max_level: u32) -> Vec<Array3<u16>> {
    let mut levels = Vec::with_capacity(max_level as usize + 1);
    levels.push(base);
    for level in 1..=max_level {
        let next = downsample_2x(&levels[levels.len() - 1]);
        debug!("pyramid level {level}: {:?}", next.dim());
        levels.push(next);
    }
    levels
}
