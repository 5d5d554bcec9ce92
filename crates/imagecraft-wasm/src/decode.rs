//! Image decoding WASM bindings.
//!
//! Decodes JPEG or PNG bytes into a [`JsRasterImage`]. The EXIF orientation
//! tag is read and recorded on the image rather than applied here; the
//! editing pipeline normalizes orientation when the image is loaded.
//!
//! ```typescript
//! import { decode_image } from '@imagecraft/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const image = decode_image(bytes);
//! console.log(`Decoded ${image.width}x${image.height}, orientation ${image.orientation}`);
//! ```

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::ImageReader;
use imagecraft_core::{EngineError, Orientation, RasterImage};
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::types::JsRasterImage;

/// Errors that can occur while decoding image bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported or unrecognized image format")]
    UnsupportedFormat,

    #[error("Corrupted or invalid image data: {0}")]
    CorruptedFile(String),

    #[error(transparent)]
    Image(#[from] EngineError),
}

/// Decode JPEG or PNG bytes into a raster image tagged with its EXIF orientation.
pub fn decode_bytes(bytes: &[u8]) -> Result<RasterImage, DecodeError> {
    let orientation = extract_orientation(bytes);

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    if reader.format().is_none() {
        return Err(DecodeError::UnsupportedFormat);
    }
    let decoded = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(RasterImage::from_dynamic(decoded)?.with_orientation(orientation))
}

/// Read the EXIF orientation tag, defaulting to `Normal` when absent or unreadable.
pub fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = Reader::new().read_from_container(&mut cursor) else {
        return Orientation::Normal;
    };

    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from)
        .unwrap_or(Orientation::Normal)
}

/// Decode a JPEG or PNG file.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported format or are corrupted.
#[wasm_bindgen]
pub fn decode_image(bytes: &[u8]) -> Result<JsRasterImage, JsValue> {
    decode_bytes(bytes)
        .map(JsRasterImage::from_raster)
        .map_err(crate::js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use imagecraft_core::PixelFormat;

    fn png_bytes(img: image::DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_rgb_png() {
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 10, y as u8 * 20, 5]));
        let decoded = decode_bytes(&png_bytes(img.into())).unwrap();

        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.format(), PixelFormat::Rgb8);
        assert_eq!(decoded.pixel(3, 2), Some(&[30u8, 40, 5][..]));
        assert_eq!(decoded.orientation(), Orientation::Normal);
    }

    #[test]
    fn test_decode_rgba_png_keeps_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 128]));
        let decoded = decode_bytes(&png_bytes(img.into())).unwrap();

        assert_eq!(decoded.format(), PixelFormat::Rgba8);
        assert_eq!(decoded.pixel(1, 1), Some(&[1u8, 2, 3, 128][..]));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_bytes(&[0u8, 1, 2, 3, 4, 5]),
            Err(DecodeError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_decode_truncated_png_fails() {
        let img = RgbImage::from_pixel(16, 16, Rgb([9, 9, 9]));
        let bytes = png_bytes(img.into());
        let result = decode_bytes(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(DecodeError::CorruptedFile(_))));
    }

    #[test]
    fn test_missing_exif_is_normal() {
        let img = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        assert_eq!(extract_orientation(&png_bytes(img.into())), Orientation::Normal);
        assert_eq!(extract_orientation(&[]), Orientation::Normal);
    }
}
