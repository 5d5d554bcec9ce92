//! Applying an EXIF orientation tag to the pixels.

use tracing::debug;

use super::flip::{flip, FlipAxis};
use super::rotation::rotate_quarter_turns;
use crate::error::Result;
use crate::raster::{Orientation, RasterImage};

/// Return an upright copy of `image` tagged [`Orientation::Normal`].
///
/// The tag's quarter turns are applied clockwise, then the horizontal mirror
/// if the tag has one. Lossless.
pub fn normalize_orientation(image: &RasterImage) -> Result<RasterImage> {
    let orientation = image.orientation();
    if orientation == Orientation::Normal {
        return Ok(image.clone());
    }
    debug!(?orientation, width = image.width(), height = image.height(), "normalize orientation");

    let rotated = rotate_quarter_turns(image, orientation.quarter_turns())?;
    let upright = if orientation.is_mirrored() {
        flip(&rotated, FlipAxis::Horizontal)?
    } else {
        rotated
    };
    Ok(upright.with_orientation(Orientation::Normal))
}
