//! Rectangular cropping in pixel coordinates.
//!
//! A crop rectangle may extend past the image edges: the result is the
//! intersection of the rectangle and the image. A rectangle that misses the
//! image entirely is an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::parallel::for_each_row;
use crate::raster::{buffer_len, try_alloc, RasterImage};

/// A crop rectangle in pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Convert a rectangle in normalized coordinates (0.0-1.0 of the image
    /// size) to pixels. Values are clamped to the unit square and the result
    /// is at least 1x1.
    pub fn from_normalized(
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let (iw, ih) = (image_width as f64, image_height as f64);
        let px_left = (left.clamp(0.0, 1.0) * iw).round() as u32;
        let px_top = (top.clamp(0.0, 1.0) * ih).round() as u32;
        let px_width = (width.clamp(0.0, 1.0) * iw).round() as u32;
        let px_height = (height.clamp(0.0, 1.0) * ih).round() as u32;

        let px_left = px_left.min(image_width.saturating_sub(1));
        let px_top = px_top.min(image_height.saturating_sub(1));
        Self {
            x: px_left as i64,
            y: px_top as i64,
            width: px_width.min(image_width - px_left).max(1),
            height: px_height.min(image_height - px_top).max(1),
        }
    }

    /// The largest rectangle with aspect `aspect_width:aspect_height`
    /// centered in the image.
    pub fn centered_aspect(image_width: u32, image_height: u32, aspect_width: u32, aspect_height: u32) -> Self {
        let (iw, ih) = (image_width as u64, image_height as u64);
        let (aw, ah) = (aspect_width.max(1) as u64, aspect_height.max(1) as u64);

        // Compare iw/ih against aw/ah without floating point.
        let (w, h) = if iw * ah > ih * aw {
            ((ih * aw / ah).max(1), ih)
        } else {
            (iw, (iw * ah / aw).max(1))
        };

        Self {
            x: ((iw - w) / 2) as i64,
            y: ((ih - h) / 2) as i64,
            width: w as u32,
            height: h as u32,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width as i64)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height as i64)
    }

    /// Intersection with a `width x height` image as `(x, y, w, h)`, or
    /// `None` when they do not overlap.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i64);
        let y1 = self.bottom().min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

/// Crop the image to `rect`, clipped to the image bounds.
///
/// # Arguments
///
/// * `image` - Source image, left untouched
/// * `rect` - Pixel rectangle; may extend past any edge
///
/// # Returns
///
/// The pixels inside the intersection of `rect` and the image.
///
/// # Errors
///
/// `OutOfBounds` when `rect` and the image do not overlap.
pub fn crop(image: &RasterImage, rect: &CropRect) -> Result<RasterImage> {
    let (iw, ih) = image.dimensions();
    let (x, y, w, h) = rect.clip_to(iw, ih).ok_or(EngineError::OutOfBounds {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        image_width: iw,
        image_height: ih,
    })?;
    debug!(?rect, x, y, width = w, height = h, "crop");

    if (x, y, w, h) == (0, 0, iw, ih) {
        return Ok(image.clone());
    }

    let channels = image.channels();
    let src_stride = image.stride();
    let row_len = w as usize * channels;
    let offset = x as usize * channels;
    let src = image.pixels();
    let mut out = try_alloc::<u8>(buffer_len(w, h, image.format())?)?;

    for_each_row(&mut out, row_len, |row_y, row| {
        let start = (y as usize + row_y) * src_stride + offset;
        row.copy_from_slice(&src[start..start + row_len]);
    });

    image.derive(w, h, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelFormat;

    fn test_image(width: u32, height: u32) -> RasterImage {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        RasterImage::new(width, height, PixelFormat::Rgb8, pixels).unwrap()
    }

    // ===== Clipping Tests =====

    #[test]
    fn test_crop_inside() {
        let img = test_image(100, 80);
        let out = crop(&img, &CropRect::new(10, 5, 30, 20)).unwrap();
        assert_eq!(out.dimensions(), (30, 20));
        assert_eq!(out.pixel(0, 0).unwrap(), &[10, 5, 0]);
        assert_eq!(out.pixel(29, 19).unwrap(), &[39, 24, 0]);
    }

    #[test]
    fn test_full_crop_is_copy() {
        let img = test_image(20, 10);
        assert_eq!(crop(&img, &CropRect::new(0, 0, 20, 10)).unwrap(), img);
    }

    #[test]
    fn test_partial_overlap_clips() {
        let img = test_image(100, 100);
        let out = crop(&img, &CropRect::new(90, 90, 20, 20)).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(out.pixel(0, 0).unwrap(), &[90, 90, 0]);
    }

    #[test]
    fn test_negative_origin_clips() {
        let img = test_image(50, 50);
        let out = crop(&img, &CropRect::new(-10, -5, 20, 20)).unwrap();
        assert_eq!(out.dimensions(), (10, 15));
        assert_eq!(out.pixel(0, 0).unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn test_fully_outside_fails() {
        let img = test_image(100, 100);
        let err = crop(&img, &CropRect::new(500, 500, 20, 20)).unwrap_err();
        assert_eq!(
            err,
            EngineError::OutOfBounds {
                x: 500,
                y: 500,
                width: 20,
                height: 20,
                image_width: 100,
                image_height: 100,
            }
        );
    }

    #[test]
    fn test_touching_edge_is_outside() {
        let img = test_image(10, 10);
        assert!(crop(&img, &CropRect::new(10, 0, 5, 5)).is_err());
        assert!(crop(&img, &CropRect::new(-5, 0, 5, 5)).is_err());
    }

    #[test]
    fn test_extreme_origin_is_out_of_bounds() {
        let img = test_image(8, 8);
        for rect in [
            CropRect::new(i64::MAX - 2, 0, 10, 5),
            CropRect::new(0, i64::MAX, 5, u32::MAX),
            CropRect::new(i64::MIN, i64::MIN, 10, 10),
        ] {
            let err = crop(&img, &rect).unwrap_err();
            assert!(matches!(err, EngineError::OutOfBounds { .. }), "{:?}", rect);
        }
        assert_eq!(CropRect::new(i64::MAX - 2, 0, 10, 5).right(), i64::MAX);
    }

    #[test]
    fn test_crop_keeps_alpha() {
        let img = RasterImage::new(2, 2, PixelFormat::Rgba8, (0..16).collect()).unwrap();
        let out = crop(&img, &CropRect::new(1, 1, 1, 1)).unwrap();
        assert_eq!(out.pixels(), &[12, 13, 14, 15]);
    }

    // ===== Helper Tests =====

    #[test]
    fn test_from_normalized_center() {
        let rect = CropRect::from_normalized(0.25, 0.25, 0.5, 0.5, 100, 100);
        assert_eq!(rect, CropRect::new(25, 25, 50, 50));
    }

    #[test]
    fn test_from_normalized_clamps() {
        let rect = CropRect::from_normalized(-1.0, 0.9, 2.0, 0.5, 100, 100);
        assert_eq!(rect, CropRect::new(0, 90, 100, 10));
        let tiny = CropRect::from_normalized(0.0, 0.0, 0.0, 0.0, 100, 100);
        assert_eq!((tiny.width, tiny.height), (1, 1));
    }

    #[test]
    fn test_centered_aspect_landscape_to_square() {
        let rect = CropRect::centered_aspect(400, 300, 1, 1);
        assert_eq!(rect, CropRect::new(50, 0, 300, 300));
    }

    #[test]
    fn test_centered_aspect_portrait() {
        let rect = CropRect::centered_aspect(1000, 1000, 3, 4);
        assert_eq!(rect, CropRect::new(125, 0, 750, 1000));
        let rect = CropRect::centered_aspect(600, 1000, 3, 4);
        assert_eq!(rect, CropRect::new(0, 100, 600, 800));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn crop_output_fits_inside_rect_and_image(
            w in 1u32..60,
            h in 1u32..60,
            x in -80i64..80,
            y in -80i64..80,
            cw in 1u32..80,
            ch in 1u32..80,
        ) {
            let img = RasterImage::solid(w, h, [1, 2, 3]).unwrap();
            let rect = CropRect::new(x, y, cw, ch);
            match crop(&img, &rect) {
                Ok(out) => {
                    prop_assert!(out.width() <= cw.min(w));
                    prop_assert!(out.height() <= ch.min(h));
                }
                Err(e) => {
                    let is_out_of_bounds = matches!(e, EngineError::OutOfBounds { .. });
                    prop_assert!(is_out_of_bounds);
                    prop_assert!(rect.clip_to(w, h).is_none());
                }
            }
        }

        #[test]
        fn centered_aspect_fits(w in 1u32..5000, h in 1u32..5000, aw in 1u32..20, ah in 1u32..20) {
            let rect = CropRect::centered_aspect(w, h, aw, ah);
            prop_assert!(rect.x >= 0 && rect.y >= 0);
            prop_assert!(rect.right() <= w as i64);
            prop_assert!(rect.bottom() <= h as i64);
            prop_assert!(rect.width >= 1 && rect.height >= 1);
        }
    }
}
