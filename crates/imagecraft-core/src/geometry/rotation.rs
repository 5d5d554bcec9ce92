//! Image rotation around the center.
//!
//! Multiples of 90 degrees are lossless index remaps. Any other angle uses
//! inverse mapping: for each output pixel center we find the source position
//! and interpolate it with the configured [`InterpolationFilter`]: bilinear
//! for interactive previews, Lanczos3 for export.
//!
//! For a clockwise rotation by θ (y pointing down) the inverse transform is:
//! ```text
//! src_x =  dx * cos(θ) + dy * sin(θ) + src_cx
//! src_y = -dx * sin(θ) + dy * cos(θ) + src_cy
//! ```
//! where `(dx, dy)` is the output pixel center relative to the output center.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::remap;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::parallel::for_each_row;
use crate::raster::{buffer_len, check_budget, try_alloc, RasterImage};

/// Angles within this many degrees of a multiple of 90 take the lossless path.
const QUARTER_TURN_TOLERANCE: f64 = 0.001;

/// Interpolation filter for arbitrary-angle rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterpolationFilter {
    /// 2x2 neighborhood.
    #[default]
    Bilinear,
    /// 6x6 windowed sinc, slower and sharper.
    Lanczos3,
}

/// Clockwise quarter turns if `degrees` (already in [0, 360)) is a multiple of 90.
fn as_quarter_turns(degrees: f64) -> Option<u32> {
    let turns = (degrees / 90.0).round();
    if (degrees - turns * 90.0).abs() < QUARTER_TURN_TOLERANCE {
        Some(turns as u32 % 4)
    } else {
        None
    }
}

/// Compute the dimensions of the bounding box for a rotated image.
///
/// The result is the smallest canvas containing every corner of the rotated
/// image. The direction of rotation does not matter.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    let angle = angle_degrees.rem_euclid(360.0);
    if let Some(turns) = as_quarter_turns(angle) {
        return if turns % 2 == 1 { (height, width) } else { (width, height) };
    }

    let rad = angle.to_radians();
    let cos = rad.cos().abs();
    let sin = rad.sin().abs();
    let (w, h) = (width as f64, height as f64);

    // Round up so no corner is clipped. The slack absorbs trig error.
    let cover = |extent: f64| ((extent - 1e-9).ceil() as u32).max(1);
    (cover(w * cos + h * sin), cover(w * sin + h * cos))
}

/// Rotate by a whole number of clockwise quarter turns. Lossless.
pub fn rotate_quarter_turns(image: &RasterImage, turns: u32) -> Result<RasterImage> {
    let (w, h) = image.dimensions();
    match turns % 4 {
        0 => Ok(image.clone()),
        1 => remap(image, h, w, |x, y| (y, h - 1 - x)),
        2 => remap(image, w, h, |x, y| (w - 1 - x, h - 1 - y)),
        _ => remap(image, h, w, |x, y| (w - 1 - y, x)),
    }
}

/// Rotate the image clockwise by `degrees` around its center.
///
/// The angle is normalized into [0, 360). The canvas grows to the rotated
/// bounding box; uncovered corners are black, or transparent when the image
/// has alpha.
///
/// # Arguments
///
/// * `image` - Source image, left untouched
/// * `degrees` - Clockwise angle; negative values rotate counter-clockwise
/// * `config` - Supplies the interpolation filter and the pixel budget
///
/// # Returns
///
/// A new image. Quarter turns swap the dimensions exactly; other angles
/// return a canvas of [`compute_rotated_bounds`].
///
/// # Errors
///
/// `ResourceExhausted` when the expanded canvas exceeds `config.max_pixels`.
pub fn rotate(image: &RasterImage, degrees: f64, config: &EngineConfig) -> Result<RasterImage> {
    let angle = degrees.rem_euclid(360.0);

    if let Some(turns) = as_quarter_turns(angle) {
        debug!(turns, "rotate (lossless)");
        return rotate_quarter_turns(image, turns);
    }

    let (dst_w, dst_h) = compute_rotated_bounds(image.width(), image.height(), angle);
    check_budget(dst_w, dst_h, image.format(), config.max_pixels)?;
    debug!(
        angle,
        src_width = image.width(),
        src_height = image.height(),
        dst_width = dst_w,
        dst_height = dst_h,
        filter = ?config.interpolation,
        "rotate (resampled)"
    );

    let rad = angle.to_radians();
    let (sin, cos) = rad.sin_cos();
    let src_cx = image.width() as f64 / 2.0;
    let src_cy = image.height() as f64 / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    let channels = image.channels();
    let mut out = try_alloc::<u8>(buffer_len(dst_w, dst_h, image.format())?)?;
    let filter = config.interpolation;

    for_each_row(&mut out, dst_w as usize * channels, |y, row| {
        let dy = y as f64 + 0.5 - dst_cy;
        for (x, dst) in row.chunks_exact_mut(channels).enumerate() {
            let dx = x as f64 + 0.5 - dst_cx;

            // Continuous source position, shifted to pixel-index space.
            let sx = dx * cos + dy * sin + src_cx - 0.5;
            let sy = -dx * sin + dy * cos + src_cy - 0.5;

            let sample = match filter {
                InterpolationFilter::Bilinear => sample_bilinear(image, sx, sy),
                InterpolationFilter::Lanczos3 => sample_lanczos3(image, sx, sy),
            };
            // Outside pixels stay zeroed: black, or fully transparent.
            if let Some(px) = sample {
                for (d, v) in dst.iter_mut().zip(px) {
                    *d = v.clamp(0.0, 255.0).round() as u8;
                }
            }
        }
    });

    image.derive(dst_w, dst_h, out)
}

/// Whether `(x, y)` in pixel-index space falls on the source canvas.
#[inline]
fn covers(image: &RasterImage, x: f64, y: f64) -> bool {
    x >= -0.5 && y >= -0.5 && x <= image.width() as f64 - 0.5 && y <= image.height() as f64 - 0.5
}

/// Fetch a pixel as `[f64; 4]`, clamping coordinates to the image edge.
#[inline]
fn fetch(image: &RasterImage, x: i64, y: i64) -> [f64; 4] {
    let px = x.clamp(0, image.width() as i64 - 1) as usize;
    let py = y.clamp(0, image.height() as i64 - 1) as usize;
    let channels = image.channels();
    let idx = py * image.stride() + px * channels;
    let p = &image.pixels()[idx..idx + channels];
    let mut out = [0.0; 4];
    for (o, &v) in out.iter_mut().zip(p) {
        *o = v as f64;
    }
    out
}

/// Bilinear sample of the 4 nearest pixels, `None` off the canvas.
fn sample_bilinear(image: &RasterImage, x: f64, y: f64) -> Option<[f64; 4]> {
    if !covers(image, x, y) {
        return None;
    }
    let x = x.max(0.0);
    let y = y.max(0.0);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = fetch(image, x0, y0);
    let p10 = fetch(image, x0 + 1, y0);
    let p01 = fetch(image, x0, y0 + 1);
    let p11 = fetch(image, x0 + 1, y0 + 1);

    let mut result = [0.0; 4];
    for (i, r) in result.iter_mut().enumerate() {
        *r = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
    }
    Some(result)
}

/// Lanczos3 sample over a 6x6 neighborhood, `None` off the canvas.
fn sample_lanczos3(image: &RasterImage, x: f64, y: f64) -> Option<[f64; 4]> {
    if !covers(image, x, y) {
        return None;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;

    let mut sum = [0.0f64; 4];
    let mut weight_sum = 0.0;
    for ky in -2..=3 {
        let wy = lanczos_weight(y - (y0 + ky) as f64, 3.0);
        for kx in -2..=3 {
            let weight = lanczos_weight(x - (x0 + kx) as f64, 3.0) * wy;
            let px = fetch(image, x0 + kx, y0 + ky);
            for (s, v) in sum.iter_mut().zip(px) {
                *s += v * weight;
            }
            weight_sum += weight;
        }
    }

    if weight_sum.abs() < f64::EPSILON {
        return sample_bilinear(image, x, y);
    }
    Some(sum.map(|s| s / weight_sum))
}

/// Lanczos kernel: `sinc(x) * sinc(x / a)` for `|x| < a`, zero outside.
fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x.abs() < f64::EPSILON {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let pi_x = std::f64::consts::PI * x;
    (a * pi_x.sin() * (pi_x / a).sin()) / (pi_x * pi_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelFormat;

    /// Gradient test image; the red channel holds the pixel index.
    fn test_image(width: u32, height: u32) -> RasterImage {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(y * width + x) as u8, ((x + y) * 8) as u8, 0]);
            }
        }
        RasterImage::new(width, height, PixelFormat::Rgb8, pixels).unwrap()
    }

    fn red_at(img: &RasterImage, x: u32, y: u32) -> u8 {
        img.pixel(x, y).unwrap()[0]
    }

    #[test]
    fn test_quarter_turn_detection() {
        assert_eq!(as_quarter_turns(0.0), Some(0));
        assert_eq!(as_quarter_turns(90.0), Some(1));
        assert_eq!(as_quarter_turns(270.0005), Some(3));
        assert_eq!(as_quarter_turns(359.9999), Some(0));
        assert_eq!(as_quarter_turns(45.0), None);
    }

    #[test]
    fn test_90_degree_rotation_bounds() {
        assert_eq!(compute_rotated_bounds(100, 50, 90.0), (50, 100));
        assert_eq!(compute_rotated_bounds(100, 50, -90.0), (50, 100));
    }

    #[test]
    fn test_180_degree_rotation_bounds() {
        assert_eq!(compute_rotated_bounds(100, 50, 180.0), (100, 50));
    }

    #[test]
    fn test_45_degree_rotation_bounds() {
        let (w, h) = compute_rotated_bounds(100, 100, 45.0);
        assert!(w > 140 && w < 143, "width was {}", w);
        assert!(h > 140 && h < 143, "height was {}", h);
    }

    #[test]
    fn test_rotated_bounds_round_up() {
        // 100x50 at 30 degrees spans 111.60 x 93.30.
        assert_eq!(compute_rotated_bounds(100, 50, 30.0), (112, 94));
    }

    #[test]
    fn test_negative_rotation_bounds() {
        assert_eq!(
            compute_rotated_bounds(100, 50, 30.0),
            compute_rotated_bounds(100, 50, -30.0)
        );
    }

    #[test]
    fn test_rotate_90_clockwise_moves_top_left_to_top_right() {
        let img = test_image(3, 2);
        let out = rotate(&img, 90.0, &EngineConfig::default()).unwrap();
        assert_eq!(out.dimensions(), (2, 3));
        // Source (0,0) lands at the top-right corner.
        assert_eq!(red_at(&out, 1, 0), 0);
        // Source bottom-left (0,1) lands at the top-left corner.
        assert_eq!(red_at(&out, 0, 0), 3);
        assert_eq!(red_at(&out, 0, 2), 5);
    }

    #[test]
    fn test_rotate_270_equals_minus_90() {
        let img = test_image(4, 3);
        let config = EngineConfig::default();
        assert_eq!(
            rotate(&img, 270.0, &config).unwrap(),
            rotate(&img, -90.0, &config).unwrap()
        );
    }

    #[test]
    fn test_rotate_180() {
        let img = test_image(3, 2);
        let out = rotate(&img, 180.0, &EngineConfig::default()).unwrap();
        assert_eq!(red_at(&out, 0, 0), 5);
        assert_eq!(red_at(&out, 2, 1), 0);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let img = test_image(5, 4);
        assert_eq!(rotate(&img, 360.0, &EngineConfig::default()).unwrap(), img);
        assert_eq!(rotate(&img, 0.0001, &EngineConfig::default()).unwrap(), img);
    }

    #[test]
    fn test_arbitrary_rotation_expands_canvas() {
        let img = RasterImage::solid(40, 20, [200, 200, 200]).unwrap();
        let out = rotate(&img, 30.0, &EngineConfig::default()).unwrap();
        assert_eq!(out.dimensions(), compute_rotated_bounds(40, 20, 30.0));
        // Corners fall outside the rotated image.
        assert_eq!(out.pixel(0, 0).unwrap(), &[0, 0, 0]);
        // The center is covered.
        let (w, h) = out.dimensions();
        assert_eq!(out.pixel(w / 2, h / 2).unwrap(), &[200, 200, 200]);
    }

    #[test]
    fn test_arbitrary_rotation_transparent_corners() {
        let img = RasterImage::new(20, 20, PixelFormat::Rgba8, vec![255; 20 * 20 * 4]).unwrap();
        let out = rotate(&img, 45.0, &EngineConfig::default()).unwrap();
        assert_eq!(out.pixel(0, 0).unwrap(), &[0, 0, 0, 0]);
        let (w, h) = out.dimensions();
        assert_eq!(out.pixel(w / 2, h / 2).unwrap()[3], 255);
    }

    #[test]
    fn test_lanczos_uniform_stays_uniform() {
        let img = RasterImage::solid(30, 30, [120, 60, 30]).unwrap();
        let out = rotate(&img, 10.0, &EngineConfig::export()).unwrap();
        let (w, h) = out.dimensions();
        assert_eq!(out.pixel(w / 2, h / 2).unwrap(), &[120, 60, 30]);
    }

    #[test]
    fn test_rotation_respects_pixel_budget() {
        let img = RasterImage::solid(100, 100, [0, 0, 0]).unwrap();
        let config = EngineConfig::default().with_max_pixels(12_000);
        let err = rotate(&img, 45.0, &config).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::ResourceExhausted { .. }));
    }

    #[test]
    fn test_lanczos_weight() {
        assert!((lanczos_weight(0.0, 3.0) - 1.0).abs() < 1e-12);
        assert!(lanczos_weight(1.0, 3.0).abs() < 1e-12);
        assert_eq!(lanczos_weight(3.5, 3.0), 0.0);
    }
}
