//! The filter engine: executes one validated operation against an image.
//!
//! Every filter is a named composition of the passes in
//! [`crate::primitives`]. The engine is pure: the same configuration, input
//! and operation always give the same bytes.

use tracing::debug;

use crate::catalog::{
    Adjustment, Filter, Operation, OperationSpec, Transform, OLD_FILM_NOISE_LEVEL, OLD_FILM_SEPIA,
};
use crate::config::EngineConfig;
use crate::curve::{CurveLut, ToneCurve};
use crate::error::Result;
use crate::geometry;
use crate::primitives::{self, luma, ColorMatrix};
use crate::raster::{Orientation, RasterImage};

/// Contrast applied after desaturation by the noir look.
const NOIR_CONTRAST: f32 = 1.35;
/// Saturation boost applied before the comic look posterizes.
const COMIC_SATURATION: f32 = 1.4;
const COMIC_LEVELS: u32 = 6;
/// Luma gradient magnitude at which comic edges are inked.
const COMIC_EDGE_THRESHOLD: f32 = 0.25;

#[inline]
fn contrast_channel(c: f32, k: f32) -> f32 {
    (c - 0.5) * k + 0.5
}

#[inline]
fn saturate([r, g, b]: [f32; 3], k: f32) -> [f32; 3] {
    let l = luma(r, g, b);
    [l + (r - l) * k, l + (g - l) * k, l + (b - l) * k]
}

fn contrast(image: &RasterImage, k: f32) -> Result<RasterImage> {
    primitives::map_rgb(image, |rgb| rgb.map(|c| contrast_channel(c, k)))
}

fn saturation(image: &RasterImage, k: f32) -> Result<RasterImage> {
    primitives::map_rgb(image, |rgb| saturate(rgb, k))
}

/// Executes operations with a fixed [`EngineConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterEngine {
    config: EngineConfig,
}

impl FilterEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply `op` to `image`, returning a new image.
    ///
    /// Images carrying a non-`Normal` orientation tag are made upright first.
    ///
    /// # Arguments
    ///
    /// * `image` - Input image, never modified
    /// * `op` - A validated operation from the catalog
    ///
    /// # Returns
    ///
    /// A freshly allocated image. Color operations keep the input's size,
    /// format and alpha; transforms may change the dimensions.
    ///
    /// # Errors
    ///
    /// `OutOfBounds` for a crop that misses the image, `ResourceExhausted`
    /// when an output would exceed the configured pixel budget.
    pub fn apply(&self, image: &RasterImage, op: &Operation) -> Result<RasterImage> {
        let upright;
        let image = if image.orientation() == Orientation::Normal {
            image
        } else {
            upright = geometry::normalize_orientation(image)?;
            &upright
        };

        debug!(
            kind = %op.kind(),
            width = image.width(),
            height = image.height(),
            "apply operation"
        );

        match op.spec() {
            OperationSpec::Adjustment(adjustment) => self.apply_adjustment(image, adjustment),
            OperationSpec::Filter(filter) => self.apply_filter(image, filter),
            OperationSpec::Transform(transform) => self.apply_transform(image, transform),
        }
    }

    /// Fold `ops` over `image` in order.
    pub fn apply_all(&self, image: &RasterImage, ops: &[Operation]) -> Result<RasterImage> {
        let mut current = image.normalize_orientation()?;
        for op in ops {
            current = self.apply(&current, op)?;
        }
        Ok(current)
    }

    fn apply_adjustment(&self, image: &RasterImage, adjustment: &Adjustment) -> Result<RasterImage> {
        match *adjustment {
            Adjustment::Brightness(v) => primitives::map_rgb(image, |rgb| rgb.map(|c| c + v)),
            Adjustment::Contrast(k) => contrast(image, k),
            Adjustment::Saturation(k) => saturation(image, k),
        }
    }

    fn apply_filter(&self, image: &RasterImage, filter: &Filter) -> Result<RasterImage> {
        match *filter {
            Filter::Sepia { intensity } => primitives::color_matrix(image, &ColorMatrix::sepia(intensity)),
            Filter::Noir => contrast(&primitives::desaturate(image)?, NOIR_CONTRAST),
            Filter::Comic => {
                let vivid = saturation(image, COMIC_SATURATION)?;
                let flat = primitives::posterize(&vivid, COMIC_LEVELS)?;
                primitives::ink_edges(&flat, COMIC_EDGE_THRESHOLD)
            }
            Filter::OldFilm => {
                let toned = primitives::color_matrix(image, &ColorMatrix::sepia(OLD_FILM_SEPIA))?;
                primitives::denoise(&toned, OLD_FILM_NOISE_LEVEL)
            }
            Filter::Hdr { points } => {
                let lut = CurveLut::from_curve(&ToneCurve::new(&points));
                if lut.is_identity() {
                    return Ok(image.clone());
                }
                primitives::apply_lut(image, &lut)
            }
            Filter::Bokeh { radius } => primitives::gaussian_blur(image, radius),
            Filter::ColorPop { color_a, color_b } => {
                primitives::false_color(image, color_a.to_array(), color_b.to_array())
            }
            Filter::DramaticShadows { contrast: k } => contrast(image, k),
            Filter::Grayscale => primitives::desaturate(image),
            Filter::Invert => primitives::map_rgb(image, |rgb| rgb.map(|c| 1.0 - c)),
            Filter::Vignette { intensity, radius } => primitives::radial_falloff(image, intensity, radius),
        }
    }

    fn apply_transform(&self, image: &RasterImage, transform: &Transform) -> Result<RasterImage> {
        match transform {
            Transform::Rotate { degrees } => geometry::rotate(image, *degrees, &self.config),
            Transform::Crop(rect) => geometry::crop(image, rect),
            Transform::Flip(axis) => geometry::flip(image, *axis),
        }
    }
}

/// Apply `op` with the default configuration.
pub fn apply(image: &RasterImage, op: &Operation) -> Result<RasterImage> {
    FilterEngine::default().apply(image, op)
}
