//! Pixel-math building blocks shared by the filter engine.
//!
//! Every pass borrows its input, allocates a fresh output of the same size
//! and format, and leaves alpha untouched. Channel math runs on the encoded
//! values normalized to 0.0-1.0; results are clamped and rounded back to
//! 8 bits, never wrapped.

use tracing::trace;

use crate::curve::CurveLut;
use crate::error::Result;
use crate::parallel::for_each_row;
use crate::raster::{try_alloc, RasterImage};

/// BT.709 luma weights.
pub const LUMA_R: f32 = 0.2126;
pub const LUMA_G: f32 = 0.7152;
pub const LUMA_B: f32 = 0.0722;

/// Perceptual luma of a normalized RGB triple.
#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// Ken Perlin's smootherstep on `t` clamped to 0.0-1.0.
#[inline]
pub fn smootherstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub(crate) fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn normalize(v: u8) -> f32 {
    v as f32 / 255.0
}

/// A 3x3 matrix applied to RGB column vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [[f32; 3]; 3]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix =
        ColorMatrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// The classic sepia tone matrix.
    pub const SEPIA: ColorMatrix = ColorMatrix([
        [0.393, 0.769, 0.189],
        [0.349, 0.686, 0.168],
        [0.272, 0.534, 0.131],
    ]);

    /// Element-wise blend: `(1 - t) * self + t * other`.
    pub fn lerp(&self, other: &ColorMatrix, t: f32) -> ColorMatrix {
        let mut m = [[0.0f32; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (1.0 - t) * self.0[i][j] + t * other.0[i][j];
            }
        }
        ColorMatrix(m)
    }

    /// Sepia toning at `intensity` (0 = identity, 1 = full sepia).
    pub fn sepia(intensity: f32) -> ColorMatrix {
        Self::IDENTITY.lerp(&Self::SEPIA, intensity)
    }

    #[inline]
    pub fn transform(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        [
            m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
            m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
            m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
        ]
    }
}

/// Per-pixel pass with access to the pixel position.
pub(crate) fn map_pixels<F>(image: &RasterImage, f: F) -> Result<RasterImage>
where
    F: Fn(u32, u32, [f32; 3]) -> [f32; 3] + Sync + Send,
{
    let channels = image.channels();
    let stride = image.stride();
    let src = image.pixels();
    let mut out = try_alloc::<u8>(src.len())?;

    for_each_row(&mut out, stride, |y, row| {
        let line = &src[y * stride..(y + 1) * stride];
        for (x, (dst, px)) in row
            .chunks_exact_mut(channels)
            .zip(line.chunks_exact(channels))
            .enumerate()
        {
            let rgb = f(
                x as u32,
                y as u32,
                [normalize(px[0]), normalize(px[1]), normalize(px[2])],
            );
            dst[0] = quantize(rgb[0]);
            dst[1] = quantize(rgb[1]);
            dst[2] = quantize(rgb[2]);
            if channels == 4 {
                dst[3] = px[3];
            }
        }
    });

    image.derive(image.width(), image.height(), out)
}

/// Per-pixel color pass.
pub(crate) fn map_rgb<F>(image: &RasterImage, f: F) -> Result<RasterImage>
where
    F: Fn([f32; 3]) -> [f32; 3] + Sync + Send,
{
    map_pixels(image, |_, _, rgb| f(rgb))
}

pub(crate) fn color_matrix(image: &RasterImage, matrix: &ColorMatrix) -> Result<RasterImage> {
    trace!(?matrix, "color matrix pass");
    map_rgb(image, |rgb| matrix.transform(rgb))
}

/// Replace every channel with the pixel's luma.
pub(crate) fn desaturate(image: &RasterImage) -> Result<RasterImage> {
    trace!("desaturate pass");
    map_rgb(image, |[r, g, b]| {
        let l = luma(r, g, b);
        [l, l, l]
    })
}

/// Map R, G and B through the same lookup table.
pub(crate) fn apply_lut(image: &RasterImage, lut: &CurveLut) -> Result<RasterImage> {
    trace!("tone LUT pass");
    let channels = image.channels();
    let stride = image.stride();
    let src = image.pixels();
    let mut out = try_alloc::<u8>(src.len())?;

    for_each_row(&mut out, stride, |y, row| {
        let line = &src[y * stride..(y + 1) * stride];
        for (dst, px) in row.chunks_exact_mut(channels).zip(line.chunks_exact(channels)) {
            dst[0] = lut.map(px[0]);
            dst[1] = lut.map(px[1]);
            dst[2] = lut.map(px[2]);
            if channels == 4 {
                dst[3] = px[3];
            }
        }
    });

    image.derive(image.width(), image.height(), out)
}

/// Quantize each channel to `levels` evenly spaced values.
pub(crate) fn posterize(image: &RasterImage, levels: u32) -> Result<RasterImage> {
    trace!(levels, "posterize pass");
    let steps = levels.max(2) as f32 - 1.0;
    map_rgb(image, |rgb| rgb.map(|c| (c * steps).round() / steps))
}

/// Linear false-color remap: dark pixels take `dark`, bright pixels `light`.
pub(crate) fn false_color(image: &RasterImage, dark: [f32; 3], light: [f32; 3]) -> Result<RasterImage> {
    trace!(?dark, ?light, "false color pass");
    map_rgb(image, |[r, g, b]| {
        let t = luma(r, g, b);
        [
            dark[0] + (light[0] - dark[0]) * t,
            dark[1] + (light[1] - dark[1]) * t,
            dark[2] + (light[2] - dark[2]) * t,
        ]
    })
}

/// Normalized 1-D Gaussian kernel with half-width `ceil(3 * sigma)`,
/// capped at `max_half_width`.
pub(crate) fn gaussian_kernel(sigma: f32, max_half_width: usize) -> Vec<f32> {
    let half = ((3.0 * sigma).ceil() as usize).min(max_half_width);
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * half)
        .map(|i| {
            let d = i as f32 - half as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}

/// Below this sigma every off-center tap rounds to zero weight.
const MIN_BLUR_SIGMA: f32 = 0.01;

/// Separable Gaussian blur of the color channels with clamp-to-edge sampling.
///
/// `sigma` below [`MIN_BLUR_SIGMA`] returns an unchanged copy.
pub(crate) fn gaussian_blur(image: &RasterImage, sigma: f32) -> Result<RasterImage> {
    if sigma < MIN_BLUR_SIGMA {
        return Ok(image.clone());
    }

    let (w, h) = (image.width() as usize, image.height() as usize);
    let channels = image.channels();
    let stride = image.stride();
    let src = image.pixels();

    let kernel = gaussian_kernel(sigma, w.max(h));
    let half = (kernel.len() / 2) as isize;
    trace!(sigma, taps = kernel.len(), "gaussian blur pass");

    // Horizontal pass into an f32 scratch buffer (0-255 scale).
    let mut scratch = try_alloc::<f32>(src.len())?;
    for_each_row(&mut scratch, stride, |y, row| {
        let line = &src[y * stride..(y + 1) * stride];
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half).clamp(0, w as isize - 1) as usize;
                let px = &line[sx * channels..sx * channels + 3];
                for (a, &v) in acc.iter_mut().zip(px) {
                    *a += v as f32 * weight;
                }
            }
            row[x * channels..x * channels + 3].copy_from_slice(&acc);
        }
    });

    // Vertical pass back to 8 bits.
    let mut out = try_alloc::<u8>(src.len())?;
    let scratch = &scratch;
    for_each_row(&mut out, stride, |y, row| {
        for x in 0..w {
            let base = x * channels;
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half).clamp(0, h as isize - 1) as usize;
                let px = &scratch[sy * stride + base..sy * stride + base + 3];
                for (a, &v) in acc.iter_mut().zip(px) {
                    *a += v * weight;
                }
            }
            for (dst, v) in row[base..base + 3].iter_mut().zip(acc) {
                *dst = v.round().clamp(0.0, 255.0) as u8;
            }
            if channels == 4 {
                row[base + 3] = src[y * stride + base + 3];
            }
        }
    });

    image.derive(image.width(), image.height(), out)
}

/// Luma of every pixel, row-major.
fn luma_plane(image: &RasterImage) -> Result<Vec<f32>> {
    let channels = image.channels();
    let width = image.width() as usize;
    let stride = image.stride();
    let src = image.pixels();
    let mut plane = try_alloc::<f32>(width * image.height() as usize)?;

    for_each_row(&mut plane, width, |y, row| {
        let line = &src[y * stride..(y + 1) * stride];
        for (l, px) in row.iter_mut().zip(line.chunks_exact(channels)) {
            *l = luma(normalize(px[0]), normalize(px[1]), normalize(px[2]));
        }
    });

    Ok(plane)
}

/// Sobel gradient magnitude of the luma plane at `(x, y)`, scaled so a
/// hard black-to-white step measures 1.0.
fn sobel_at(plane: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    let at = |dx: isize, dy: isize| {
        let sx = (x as isize + dx).clamp(0, width as isize - 1) as usize;
        let sy = (y as isize + dy).clamp(0, height as isize - 1) as usize;
        plane[sy * width + sx]
    };

    let gx = (at(1, -1) + 2.0 * at(1, 0) + at(1, 1)) - (at(-1, -1) + 2.0 * at(-1, 0) + at(-1, 1));
    let gy = (at(-1, 1) + 2.0 * at(0, 1) + at(1, 1)) - (at(-1, -1) + 2.0 * at(0, -1) + at(1, -1));
    (gx * gx + gy * gy).sqrt() / 4.0
}

/// Paint black every pixel whose luma gradient magnitude is at least `threshold`.
pub(crate) fn ink_edges(image: &RasterImage, threshold: f32) -> Result<RasterImage> {
    trace!(threshold, "edge ink pass");
    let (w, h) = (image.width() as usize, image.height() as usize);
    let channels = image.channels();
    let stride = image.stride();
    let src = image.pixels();
    let plane = luma_plane(image)?;
    let plane = &plane;
    let mut out = try_alloc::<u8>(src.len())?;

    for_each_row(&mut out, stride, |y, row| {
        row.copy_from_slice(&src[y * stride..(y + 1) * stride]);
        for x in 0..w {
            if sobel_at(plane, w, h, x, y) >= threshold {
                row[x * channels..x * channels + 3].fill(0);
            }
        }
    });

    image.derive(image.width(), image.height(), out)
}

/// Edge-preserving noise reduction.
///
/// Each pixel becomes the mean of the 3x3 neighbours (itself included)
/// whose luma lies within `level` of its own.
pub(crate) fn denoise(image: &RasterImage, level: f32) -> Result<RasterImage> {
    trace!(level, "denoise pass");
    let (w, h) = (image.width() as usize, image.height() as usize);
    let channels = image.channels();
    let stride = image.stride();
    let src = image.pixels();
    let plane = luma_plane(image)?;
    let plane = &plane;
    let mut out = try_alloc::<u8>(src.len())?;

    for_each_row(&mut out, stride, |y, row| {
        for x in 0..w {
            let center = plane[y * w + x];
            let mut acc = [0u32; 3];
            let mut count = 0u32;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    if (plane[ny * w + nx] - center).abs() > level {
                        continue;
                    }
                    let px = &src[ny * stride + nx * channels..];
                    for (a, &v) in acc.iter_mut().zip(&px[..3]) {
                        *a += v as u32;
                    }
                    count += 1;
                }
            }
            let base = x * channels;
            for (dst, a) in row[base..base + 3].iter_mut().zip(acc) {
                *dst = ((a as f32) / count as f32).round() as u8;
            }
            if channels == 4 {
                row[base + 3] = src[y * stride + base + 3];
            }
        }
    });

    image.derive(image.width(), image.height(), out)
}

/// Darken toward the corners.
///
/// `d` is the distance from the image center over the half diagonal; pixels
/// inside `r0 = radius / (1 + radius)` are untouched and the falloff reaches
/// `1 - intensity` at the corners.
pub(crate) fn radial_falloff(image: &RasterImage, intensity: f32, radius: f32) -> Result<RasterImage> {
    trace!(intensity, radius, "radial falloff pass");
    let cx = image.width() as f32 / 2.0;
    let cy = image.height() as f32 / 2.0;
    let half_diagonal = (cx * cx + cy * cy).sqrt();
    let r0 = radius / (1.0 + radius);
    let span = 1.0 - r0;

    map_pixels(image, |x, y, rgb| {
        if span <= f32::EPSILON {
            return rgb;
        }
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let d = (dx * dx + dy * dy).sqrt() / half_diagonal;
        let factor = 1.0 - intensity * smootherstep((d - r0) / span);
        rgb.map(|c| c * factor)
    })
}
