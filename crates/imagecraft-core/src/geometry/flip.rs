//! Lossless horizontal and vertical mirroring.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::remap;
use crate::error::Result;
use crate::raster::RasterImage;

/// Mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlipAxis {
    /// Mirror left-right.
    Horizontal,
    /// Mirror top-bottom.
    Vertical,
}

/// Mirror the image about the given axis. Flipping twice is the identity.
pub fn flip(image: &RasterImage, axis: FlipAxis) -> Result<RasterImage> {
    let (w, h) = image.dimensions();
    debug!(?axis, width = w, height = h, "flip");
    match axis {
        FlipAxis::Horizontal => remap(image, w, h, |x, y| (w - 1 - x, y)),
        FlipAxis::Vertical => remap(image, w, h, |x, y| (x, h - 1 - y)),
    }
}
