//! WASM-compatible wrapper types for image data.
//!
//! Pixel data lives in WASM memory; `pixels()` copies it out to a
//! `Uint8Array`. Keep images on the WASM side between edits and only extract
//! pixels for display or export.

use imagecraft_core::{EngineError, PixelFormat, RasterImage};
use wasm_bindgen::prelude::*;

/// A decoded raster image handle for JavaScript.
#[wasm_bindgen]
pub struct JsRasterImage {
    inner: RasterImage,
}

#[wasm_bindgen]
impl JsRasterImage {
    /// Create an image from interleaved pixel data.
    ///
    /// # Arguments
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `pixels` - RGB (3 bytes per pixel) or RGBA (4 bytes per pixel) data, row-major
    /// * `has_alpha` - Whether `pixels` is RGBA
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, has_alpha: bool) -> Result<JsRasterImage, JsValue> {
        Self::try_new(width, height, pixels, has_alpha).map_err(crate::js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// 3 for RGB, 4 for RGBA.
    #[wasm_bindgen(getter)]
    pub fn channels(&self) -> usize {
        self.inner.channels()
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.inner.pixels().len()
    }

    /// EXIF orientation value (1-8) the pixels are stored in.
    #[wasm_bindgen(getter)]
    pub fn orientation(&self) -> u8 {
        self.inner.orientation() as u8
    }

    /// Copy of the pixel data as a `Uint8Array`.
    pub fn pixels(&self) -> Vec<u8> {
        self.inner.pixels().to_vec()
    }
}

impl JsRasterImage {
    pub(crate) fn try_new(width: u32, height: u32, pixels: Vec<u8>, has_alpha: bool) -> Result<Self, EngineError> {
        let format = if has_alpha { PixelFormat::Rgba8 } else { PixelFormat::Rgb8 };
        RasterImage::new(width, height, format, pixels).map(Self::from_raster)
    }

    pub(crate) fn from_raster(inner: RasterImage) -> Self {
        Self { inner }
    }

    pub(crate) fn raster(&self) -> &RasterImage {
        &self.inner
    }
}
