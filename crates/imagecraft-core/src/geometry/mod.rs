//! Geometric transformations: rotation, cropping, flipping and orientation
//! normalization.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, y grows downward
//! - Rotation angles are in degrees, positive = clockwise on screen
//! - Crop rectangles are in pixels and may extend past the image edges
//!
//! Quarter-turn rotations, flips and orientation normalization are lossless
//! index remaps; only arbitrary-angle rotation resamples.

mod crop;
mod flip;
mod orientation;
mod rotation;

pub use crop::{crop, CropRect};
pub use flip::{flip, FlipAxis};
pub use orientation::normalize_orientation;
pub use rotation::{compute_rotated_bounds, rotate, rotate_quarter_turns, InterpolationFilter};

use crate::error::Result;
use crate::parallel::for_each_row;
use crate::raster::{buffer_len, try_alloc, RasterImage};

/// Build a `width x height` image where every output pixel is copied from
/// the source pixel `source_of(x, y)` returns.
pub(crate) fn remap<F>(image: &RasterImage, width: u32, height: u32, source_of: F) -> Result<RasterImage>
where
    F: Fn(u32, u32) -> (u32, u32) + Sync + Send,
{
    let channels = image.channels();
    let src_stride = image.stride();
    let src = image.pixels();
    let mut out = try_alloc::<u8>(buffer_len(width, height, image.format())?)?;

    for_each_row(&mut out, width as usize * channels, |y, row| {
        for (x, dst) in row.chunks_exact_mut(channels).enumerate() {
            let (sx, sy) = source_of(x as u32, y as u32);
            let idx = sy as usize * src_stride + sx as usize * channels;
            dst.copy_from_slice(&src[idx..idx + channels]);
        }
    });

    image.derive(width, height, out)
}
