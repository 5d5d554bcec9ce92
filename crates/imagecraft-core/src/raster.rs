//! The in-memory raster image every operation consumes and produces.
//!
//! A [`RasterImage`] is immutable by convention: operations borrow their
//! input and allocate a fresh output. Its fields are private so an image
//! that violates the size invariant cannot be constructed.

use image::{DynamicImage, ImageBuffer, Rgb, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::geometry;
use crate::primitives::luma;

/// Channel layout of the interleaved pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PixelFormat {
    /// 8-bit red, green, blue.
    #[default]
    Rgb8,
    /// 8-bit red, green, blue, straight (non-premultiplied) alpha.
    Rgba8,
}

impl PixelFormat {
    /// Number of bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    #[inline]
    pub fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::Rgba8)
    }
}

/// Color space the pixel values are encoded in.
///
/// The engine carries this tag through every operation unchanged; pixel math
/// always runs on the encoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorSpace {
    #[default]
    Srgb,
    DisplayP3,
    LinearSrgb,
}

/// EXIF orientation values (1-8): a quarter-turn rotation plus an optional mirror.
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (top-left origin, no transformation needed).
    #[default]
    Normal = 1,
    /// Mirrored horizontally.
    FlipHorizontal = 2,
    /// Rotated 180 degrees.
    Rotate180 = 3,
    /// Mirrored vertically.
    FlipVertical = 4,
    /// Rotate 90 CW then mirror horizontally.
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Rotate 270 CW then mirror horizontally.
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl Orientation {
    /// Build an orientation from a clockwise quarter-turn count and a mirror flag.
    ///
    /// The mirror is applied after the rotation, matching the EXIF definitions.
    pub fn from_parts(quarter_turns: u32, mirrored: bool) -> Self {
        match (quarter_turns % 4, mirrored) {
            (0, false) => Orientation::Normal,
            (0, true) => Orientation::FlipHorizontal,
            (1, false) => Orientation::Rotate90CW,
            (1, true) => Orientation::Transpose,
            (2, false) => Orientation::Rotate180,
            (2, true) => Orientation::FlipVertical,
            (3, false) => Orientation::Rotate270CW,
            _ => Orientation::Transverse,
        }
    }

    /// Clockwise quarter turns needed to display the image upright.
    pub fn quarter_turns(self) -> u32 {
        match self {
            Orientation::Normal | Orientation::FlipHorizontal => 0,
            Orientation::Rotate90CW | Orientation::Transpose => 1,
            Orientation::Rotate180 | Orientation::FlipVertical => 2,
            Orientation::Rotate270CW | Orientation::Transverse => 3,
        }
    }

    /// Whether a horizontal mirror follows the rotation.
    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            Orientation::FlipHorizontal
                | Orientation::FlipVertical
                | Orientation::Transpose
                | Orientation::Transverse
        )
    }

    /// Returns true if this orientation swaps width and height dimensions.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        self.quarter_turns() % 2 == 1
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Resampling filter used by [`RasterImage::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Bilinear,
    Lanczos3,
}

impl ResampleFilter {
    fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            ResampleFilter::Nearest => image::imageops::FilterType::Nearest,
            ResampleFilter::Bilinear => image::imageops::FilterType::Triangle,
            ResampleFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// A decoded raster image with interleaved 8-bit pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    orientation: Orientation,
    color_space: ColorSpace,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Create an image, checking that dimensions are non-zero and the buffer
    /// holds exactly `width * height * channels` bytes.
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidImage(format!(
                "dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = buffer_len(width, height, format)?;
        if pixels.len() != expected {
            return Err(EngineError::InvalidImage(format!(
                "expected {} bytes for {}x{} {:?}, got {}",
                expected,
                width,
                height,
                format,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            orientation: Orientation::Normal,
            color_space: ColorSpace::Srgb,
            pixels,
        })
    }

    /// Create an RGB image filled with a single color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let len = buffer_len(width, height, PixelFormat::Rgb8)?;
        let mut pixels = try_alloc(len)?;
        for chunk in pixels.chunks_exact_mut(3) {
            chunk.copy_from_slice(&rgb);
        }
        Self::new(width, height, PixelFormat::Rgb8, pixels)
    }

    /// Tag the image with the orientation its pixels are stored in.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    /// Build an output image sharing this image's format and color space.
    ///
    /// Outputs are always stored upright.
    pub(crate) fn derive(&self, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Ok(Self::new(width, height, self.format, pixels)?.with_color_space(self.color_space))
    }

    /// Create a RasterImage from an `image::RgbImage`.
    pub fn from_rgb_image(img: image::RgbImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelFormat::Rgb8, img.into_raw())
    }

    /// Create a RasterImage from an `image::RgbaImage`.
    pub fn from_rgba_image(img: image::RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelFormat::Rgba8, img.into_raw())
    }

    /// Convert any decoded `DynamicImage`, keeping alpha when present.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        if img.color().has_alpha() {
            Self::from_rgba_image(img.into_rgba8())
        } else {
            Self::from_rgb_image(img.into_rgb8())
        }
    }

    /// Convert to a `DynamicImage` for encoding or further processing.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let mismatch = || EngineError::InvalidImage("pixel buffer rejected by image crate".into());
        match self.format {
            PixelFormat::Rgb8 => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(self.width, self.height, self.pixels.clone())
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(mismatch)
            }
            PixelFormat::Rgba8 => {
                ImageBuffer::<Rgba<u8>, _>::from_raw(self.width, self.height, self.pixels.clone())
                    .map(DynamicImage::ImageRgba8)
                    .ok_or_else(mismatch)
            }
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Interleaved pixel data, row-major, top-left origin.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels()
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Channel values of the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.channels();
        let idx = y as usize * self.stride() + x as usize * channels;
        Some(&self.pixels[idx..idx + channels])
    }

    /// BT.709 luma of the pixel at `(x, y)`, normalized to 0.0-1.0.
    pub fn luma_at(&self, x: u32, y: u32) -> Option<f32> {
        self.pixel(x, y).map(|p| {
            luma(
                p[0] as f32 / 255.0,
                p[1] as f32 / 255.0,
                p[2] as f32 / 255.0,
            )
        })
    }

    /// Return an upright copy: the orientation tag is applied to the pixels
    /// (lossless quarter turns and mirrors) and reset to `Normal`.
    pub fn normalize_orientation(&self) -> Result<Self> {
        geometry::normalize_orientation(self)
    }

    /// Resize to exact dimensions with the `image` crate's resamplers.
    pub fn resize(&self, width: u32, height: u32, filter: ResampleFilter) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::invalid(
                "size",
                format!("target dimensions must be non-zero, got {}x{}", width, height),
            ));
        }
        if self.dimensions() == (width, height) {
            return Ok(self.clone());
        }

        let resized = match self.to_dynamic()? {
            DynamicImage::ImageRgba8(img) => DynamicImage::ImageRgba8(image::imageops::resize(
                &img,
                width,
                height,
                filter.to_image_filter(),
            )),
            other => DynamicImage::ImageRgb8(image::imageops::resize(
                &other.into_rgb8(),
                width,
                height,
                filter.to_image_filter(),
            )),
        };

        Ok(Self::from_dynamic(resized)?
            .with_orientation(self.orientation)
            .with_color_space(self.color_space))
    }

    /// Resize so the longest edge is at most `max_edge`, preserving aspect ratio.
    pub fn resize_to_fit(&self, max_edge: u32, filter: ResampleFilter) -> Result<Self> {
        if max_edge == 0 {
            return Err(EngineError::invalid("maxEdge", "must be non-zero"));
        }
        if self.width <= max_edge && self.height <= max_edge {
            return Ok(self.clone());
        }
        let (width, height) = fit_dimensions(self.width, self.height, max_edge);
        self.resize(width, height, filter)
    }
}

/// Dimensions that fit within `max_edge` while keeping the aspect ratio.
fn fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let ratio = width as f64 / height as f64;
    if width >= height {
        let h = (max_edge as f64 / ratio).round() as u32;
        (max_edge, h.max(1))
    } else {
        let w = (max_edge as f64 * ratio).round() as u32;
        (w.max(1), max_edge)
    }
}

/// Byte length of a `width x height` buffer, failing on address-space overflow.
pub(crate) fn buffer_len(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(format.channels()))
        .ok_or(EngineError::ResourceExhausted {
            bytes: (width as u64 * height as u64).saturating_mul(format.channels() as u64),
        })
}

/// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| EngineError::ResourceExhausted {
            bytes: (len as u64).saturating_mul(std::mem::size_of::<T>() as u64),
        })?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Reject outputs above the configured pixel budget before allocating them.
pub(crate) fn check_budget(width: u32, height: u32, format: PixelFormat, max_pixels: u64) -> Result<()> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(EngineError::ResourceExhausted {
            bytes: pixels.saturating_mul(format.channels() as u64),
        });
    }
    Ok(())
}
