//! Image encoding WASM bindings for the export step.
//!
//! JPEG has no alpha channel, so RGBA images are flattened to RGB by dropping
//! alpha. PNG keeps whatever channels the image has.
//!
//! ```typescript
//! import { encode_jpeg, encode_png } from '@imagecraft/wasm';
//!
//! const jpegBytes = encode_jpeg(output, 90);
//! const pngBytes = encode_png(output);
//! ```

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use imagecraft_core::{EngineError, PixelFormat, RasterImage};
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::types::JsRasterImage;

/// Errors that can occur during image encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error(transparent)]
    Image(#[from] EngineError),
}

fn check_dimensions(image: &RasterImage) -> Result<(), EncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Encode to baseline JPEG. Quality is clamped to 1-100.
pub fn jpeg_bytes(image: &RasterImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    check_dimensions(image)?;
    let quality = quality.clamp(1, 100);

    let rgb = match image.format() {
        PixelFormat::Rgb8 => image.pixels().to_vec(),
        PixelFormat::Rgba8 => image.to_dynamic()?.into_rgb8().into_raw(),
    };

    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, quality)
        .write_image(&rgb, image.width(), image.height(), ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(output.into_inner())
}

/// Encode to PNG, keeping the alpha channel when present.
pub fn png_bytes(image: &RasterImage) -> Result<Vec<u8>, EncodeError> {
    check_dimensions(image)?;
    let color = match image.format() {
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
        PixelFormat::Rgba8 => ExtendedColorType::Rgba8,
    };

    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(image.pixels(), image.width(), image.height(), color)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(output)
}

/// Encode an image to JPEG bytes.
///
/// # Arguments
///
/// * `image` - The image to encode
/// * `quality` - JPEG quality 1-100 (90 is a good default for export)
#[wasm_bindgen]
pub fn encode_jpeg(image: &JsRasterImage, quality: u8) -> Result<Vec<u8>, JsValue> {
    jpeg_bytes(image.raster(), quality).map_err(crate::js_error)
}

/// Encode an image to PNG bytes.
#[wasm_bindgen]
pub fn encode_png(image: &JsRasterImage) -> Result<Vec<u8>, JsValue> {
    png_bytes(image.raster()).map_err(crate::js_error)
}
