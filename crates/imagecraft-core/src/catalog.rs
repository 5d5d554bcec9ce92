//! The closed catalog of edit operations.
//!
//! An [`Operation`] can only be obtained through validation, so every
//! operation the engine sees carries in-range parameters. Hosts that speak
//! in names and loose parameter bags go through [`validate`]; Rust callers
//! use the typed constructors. Both share the same checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::curve::CurvePoint;
use crate::error::{EngineError, Result};
use crate::geometry::{CropRect, FlipAxis};

/// Brightness offset range.
pub const BRIGHTNESS_RANGE: (f32, f32) = (-1.0, 1.0);
/// Contrast multiplier range.
pub const CONTRAST_RANGE: (f32, f32) = (0.0, 4.0);
/// Saturation multiplier range.
pub const SATURATION_RANGE: (f32, f32) = (0.0, 2.0);
/// Dramatic shadows contrast range.
pub const DRAMATIC_CONTRAST_RANGE: (f32, f32) = (1.0, 4.0);

pub const DEFAULT_SEPIA_INTENSITY: f32 = 1.0;
pub const DEFAULT_BOKEH_RADIUS: f32 = 10.0;
pub const DEFAULT_DRAMATIC_CONTRAST: f32 = 1.5;
pub const DEFAULT_VIGNETTE_INTENSITY: f32 = 1.0;
pub const DEFAULT_VIGNETTE_RADIUS: f32 = 1.0;

/// Sepia strength used by the old film look.
pub const OLD_FILM_SEPIA: f32 = 0.8;
/// Noise reduction level used by the old film look.
pub const OLD_FILM_NOISE_LEVEL: f32 = 0.02;

/// Default HDR tone curve: a gentle S through mid-gray.
pub const DEFAULT_HDR_POINTS: [CurvePoint; 5] = [
    CurvePoint::new(0.0, 0.0),
    CurvePoint::new(0.25, 0.15),
    CurvePoint::new(0.5, 0.5),
    CurvePoint::new(0.75, 0.85),
    CurvePoint::new(1.0, 1.0),
];

/// An RGB color with components in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const MAGENTA: Color = Color::new(1.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Broad family an operation kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationFamily {
    Adjustment,
    Filter,
    Transform,
}

/// Every operation the engine knows, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Brightness,
    Contrast,
    Saturation,
    Sepia,
    Noir,
    Comic,
    OldFilm,
    Hdr,
    Bokeh,
    ColorPop,
    DramaticShadows,
    Grayscale,
    Invert,
    Vignette,
    Rotate,
    Crop,
    Flip,
}

impl OperationKind {
    pub const ALL: [OperationKind; 17] = [
        OperationKind::Brightness,
        OperationKind::Contrast,
        OperationKind::Saturation,
        OperationKind::Sepia,
        OperationKind::Noir,
        OperationKind::Comic,
        OperationKind::OldFilm,
        OperationKind::Hdr,
        OperationKind::Bokeh,
        OperationKind::ColorPop,
        OperationKind::DramaticShadows,
        OperationKind::Grayscale,
        OperationKind::Invert,
        OperationKind::Vignette,
        OperationKind::Rotate,
        OperationKind::Crop,
        OperationKind::Flip,
    ];

    /// The camelCase name hosts use.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Brightness => "brightness",
            OperationKind::Contrast => "contrast",
            OperationKind::Saturation => "saturation",
            OperationKind::Sepia => "sepia",
            OperationKind::Noir => "noir",
            OperationKind::Comic => "comic",
            OperationKind::OldFilm => "oldFilm",
            OperationKind::Hdr => "hdr",
            OperationKind::Bokeh => "bokeh",
            OperationKind::ColorPop => "colorPop",
            OperationKind::DramaticShadows => "dramaticShadows",
            OperationKind::Grayscale => "grayscale",
            OperationKind::Invert => "invert",
            OperationKind::Vignette => "vignette",
            OperationKind::Rotate => "rotate",
            OperationKind::Crop => "crop",
            OperationKind::Flip => "flip",
        }
    }

    pub fn family(self) -> OperationFamily {
        match self {
            OperationKind::Brightness | OperationKind::Contrast | OperationKind::Saturation => {
                OperationFamily::Adjustment
            }
            OperationKind::Rotate | OperationKind::Crop | OperationKind::Flip => {
                OperationFamily::Transform
            }
            _ => OperationFamily::Filter,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| EngineError::invalid("kind", format!("unknown operation `{}`", s)))
    }
}

/// Slider identity of an operation.
///
/// Consecutive operations with the same category replace each other in the
/// edit pipeline instead of stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationCategory(OperationKind);

impl OperationCategory {
    pub fn kind(self) -> OperationKind {
        self.0
    }
}

/// Tonal adjustments driven by a single signed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Adjustment {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
}

/// Stylistic filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    Sepia { intensity: f32 },
    Noir,
    Comic,
    OldFilm,
    Hdr { points: [CurvePoint; 5] },
    Bokeh { radius: f32 },
    #[serde(rename_all = "camelCase")]
    ColorPop { color_a: Color, color_b: Color },
    DramaticShadows { contrast: f32 },
    Grayscale,
    Invert,
    Vignette { intensity: f32, radius: f32 },
}

/// Geometric transforms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Transform {
    /// Clockwise degrees.
    Rotate { degrees: f64 },
    Crop(CropRect),
    Flip(FlipAxis),
}

/// Unvalidated description of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationSpec {
    Adjustment(Adjustment),
    Filter(Filter),
    Transform(Transform),
}

impl OperationSpec {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationSpec::Adjustment(a) => match a {
                Adjustment::Brightness(_) => OperationKind::Brightness,
                Adjustment::Contrast(_) => OperationKind::Contrast,
                Adjustment::Saturation(_) => OperationKind::Saturation,
            },
            OperationSpec::Filter(f) => match f {
                Filter::Sepia { .. } => OperationKind::Sepia,
                Filter::Noir => OperationKind::Noir,
                Filter::Comic => OperationKind::Comic,
                Filter::OldFilm => OperationKind::OldFilm,
                Filter::Hdr { .. } => OperationKind::Hdr,
                Filter::Bokeh { .. } => OperationKind::Bokeh,
                Filter::ColorPop { .. } => OperationKind::ColorPop,
                Filter::DramaticShadows { .. } => OperationKind::DramaticShadows,
                Filter::Grayscale => OperationKind::Grayscale,
                Filter::Invert => OperationKind::Invert,
                Filter::Vignette { .. } => OperationKind::Vignette,
            },
            OperationSpec::Transform(t) => match t {
                Transform::Rotate { .. } => OperationKind::Rotate,
                Transform::Crop(_) => OperationKind::Crop,
                Transform::Flip(_) => OperationKind::Flip,
            },
        }
    }
}

/// A validated, immutable edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OperationSpec", into = "OperationSpec")]
pub struct Operation {
    spec: OperationSpec,
}

impl Operation {
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn kind(&self) -> OperationKind {
        self.spec.kind()
    }

    pub fn family(&self) -> OperationFamily {
        self.kind().family()
    }

    /// Slider category; `None` for transforms, which always append.
    pub fn category(&self) -> Option<OperationCategory> {
        match self.family() {
            OperationFamily::Transform => None,
            _ => Some(OperationCategory(self.kind())),
        }
    }

    pub fn brightness(value: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Adjustment(Adjustment::Brightness(value)))
    }

    pub fn contrast(value: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Adjustment(Adjustment::Contrast(value)))
    }

    pub fn saturation(value: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Adjustment(Adjustment::Saturation(value)))
    }

    pub fn sepia(intensity: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Filter(Filter::Sepia { intensity }))
    }

    pub fn noir() -> Self {
        Self { spec: OperationSpec::Filter(Filter::Noir) }
    }

    pub fn comic() -> Self {
        Self { spec: OperationSpec::Filter(Filter::Comic) }
    }

    pub fn old_film() -> Self {
        Self { spec: OperationSpec::Filter(Filter::OldFilm) }
    }

    pub fn hdr(points: [CurvePoint; 5]) -> Result<Self> {
        Self::try_from(OperationSpec::Filter(Filter::Hdr { points }))
    }

    pub fn bokeh(radius: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Filter(Filter::Bokeh { radius }))
    }

    pub fn color_pop(color_a: Color, color_b: Color) -> Result<Self> {
        Self::try_from(OperationSpec::Filter(Filter::ColorPop { color_a, color_b }))
    }

    pub fn dramatic_shadows(contrast: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Filter(Filter::DramaticShadows { contrast }))
    }

    pub fn grayscale() -> Self {
        Self { spec: OperationSpec::Filter(Filter::Grayscale) }
    }

    pub fn invert() -> Self {
        Self { spec: OperationSpec::Filter(Filter::Invert) }
    }

    pub fn vignette(intensity: f32, radius: f32) -> Result<Self> {
        Self::try_from(OperationSpec::Filter(Filter::Vignette { intensity, radius }))
    }

    /// Clockwise rotation; the angle is stored normalized into [0, 360).
    pub fn rotate(degrees: f64) -> Result<Self> {
        Self::try_from(OperationSpec::Transform(Transform::Rotate { degrees }))
    }

    pub fn crop(rect: CropRect) -> Result<Self> {
        Self::try_from(OperationSpec::Transform(Transform::Crop(rect)))
    }

    pub fn flip(axis: FlipAxis) -> Self {
        Self { spec: OperationSpec::Transform(Transform::Flip(axis)) }
    }

    /// The kind with its default parameters, or `None` for transforms that
    /// have no meaningful default (rotate, crop, flip).
    pub fn default_for(kind: OperationKind) -> Option<Self> {
        match kind.family() {
            OperationFamily::Transform => None,
            _ => validate(kind, &OperationParams::default()).ok(),
        }
    }
}

impl TryFrom<OperationSpec> for Operation {
    type Error = EngineError;

    fn try_from(spec: OperationSpec) -> Result<Self> {
        let spec = match spec {
            OperationSpec::Adjustment(adjustment) => {
                OperationSpec::Adjustment(match adjustment {
                    Adjustment::Brightness(v) => {
                        Adjustment::Brightness(in_range("value", v, BRIGHTNESS_RANGE)?)
                    }
                    Adjustment::Contrast(v) => Adjustment::Contrast(in_range("value", v, CONTRAST_RANGE)?),
                    Adjustment::Saturation(v) => {
                        Adjustment::Saturation(in_range("value", v, SATURATION_RANGE)?)
                    }
                })
            }
            OperationSpec::Filter(filter) => OperationSpec::Filter(validate_filter(filter)?),
            OperationSpec::Transform(transform) => OperationSpec::Transform(validate_transform(transform)?),
        };
        Ok(Self { spec })
    }
}

impl From<Operation> for OperationSpec {
    fn from(op: Operation) -> Self {
        op.spec
    }
}

fn validate_filter(filter: Filter) -> Result<Filter> {
    Ok(match filter {
        Filter::Sepia { intensity } => Filter::Sepia {
            intensity: in_range("intensity", intensity, (0.0, 1.0))?,
        },
        Filter::Hdr { points } => Filter::Hdr {
            points: check_curve(points)?,
        },
        Filter::Bokeh { radius } => Filter::Bokeh {
            radius: at_least("radius", radius, 0.0)?,
        },
        Filter::ColorPop { color_a, color_b } => {
            check_color("colorA", color_a)?;
            check_color("colorB", color_b)?;
            if color_a == color_b {
                return Err(EngineError::invalid("colorB", "must differ from colorA"));
            }
            Filter::ColorPop { color_a, color_b }
        }
        Filter::DramaticShadows { contrast } => Filter::DramaticShadows {
            contrast: in_range("contrast", contrast, DRAMATIC_CONTRAST_RANGE)?,
        },
        Filter::Vignette { intensity, radius } => Filter::Vignette {
            intensity: in_range("intensity", intensity, (0.0, 1.0))?,
            radius: at_least("radius", radius, 0.0)?,
        },
        Filter::Noir | Filter::Comic | Filter::OldFilm | Filter::Grayscale | Filter::Invert => filter,
    })
}

fn validate_transform(transform: Transform) -> Result<Transform> {
    Ok(match transform {
        Transform::Rotate { degrees } => {
            if !degrees.is_finite() {
                return Err(EngineError::invalid(
                    "degrees",
                    format!("must be finite, got {}", degrees),
                ));
            }
            // rem_euclid can round tiny negative angles up to exactly 360.
            let degrees = degrees.rem_euclid(360.0);
            Transform::Rotate {
                degrees: if degrees >= 360.0 { 0.0 } else { degrees },
            }
        }
        Transform::Crop(rect) => {
            if rect.width == 0 || rect.height == 0 {
                return Err(EngineError::invalid(
                    "rect",
                    format!("width and height must be > 0, got {}x{}", rect.width, rect.height),
                ));
            }
            Transform::Crop(rect)
        }
        Transform::Flip(_) => transform,
    })
}

fn finite(field: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::invalid(field, format!("must be finite, got {}", value)))
    }
}

fn in_range(field: &'static str, value: f32, (lo, hi): (f32, f32)) -> Result<f32> {
    let value = finite(field, value)?;
    if value < lo || value > hi {
        return Err(EngineError::invalid(
            field,
            format!("must be in [{}, {}], got {}", lo, hi, value),
        ));
    }
    Ok(value)
}

fn at_least(field: &'static str, value: f32, lo: f32) -> Result<f32> {
    let value = finite(field, value)?;
    if value < lo {
        return Err(EngineError::invalid(
            field,
            format!("must be >= {}, got {}", lo, value),
        ));
    }
    Ok(value)
}

fn check_color(field: &'static str, color: Color) -> Result<()> {
    for c in color.to_array() {
        in_range(field, c, (0.0, 1.0))?;
    }
    Ok(())
}

fn check_curve(points: [CurvePoint; 5]) -> Result<[CurvePoint; 5]> {
    for p in &points {
        in_range("points", p.x, (0.0, 1.0))?;
        in_range("points", p.y, (0.0, 1.0))?;
    }
    if points.windows(2).any(|w| w[1].x < w[0].x) {
        return Err(EngineError::invalid("points", "x coordinates must be non-decreasing"));
    }
    Ok(points)
}

/// Loose parameter bag as sent by a host. Fields a kind does not use are
/// ignored; missing optional fields take the kind's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationParams {
    pub value: Option<f32>,
    pub intensity: Option<f32>,
    pub radius: Option<f32>,
    pub degrees: Option<f64>,
    pub rect: Option<CropRect>,
    pub axis: Option<FlipAxis>,
    pub points: Option<Vec<CurvePoint>>,
    pub color_a: Option<Color>,
    pub color_b: Option<Color>,
    pub contrast: Option<f32>,
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| EngineError::invalid(field, "is required"))
}

/// Build a validated operation from a kind and a parameter bag.
pub fn validate(kind: OperationKind, params: &OperationParams) -> Result<Operation> {
    let spec = match kind {
        OperationKind::Brightness => {
            OperationSpec::Adjustment(Adjustment::Brightness(params.value.unwrap_or(0.0)))
        }
        OperationKind::Contrast => {
            OperationSpec::Adjustment(Adjustment::Contrast(params.value.unwrap_or(1.0)))
        }
        OperationKind::Saturation => {
            OperationSpec::Adjustment(Adjustment::Saturation(params.value.unwrap_or(1.0)))
        }
        OperationKind::Sepia => OperationSpec::Filter(Filter::Sepia {
            intensity: params.intensity.unwrap_or(DEFAULT_SEPIA_INTENSITY),
        }),
        OperationKind::Noir => OperationSpec::Filter(Filter::Noir),
        OperationKind::Comic => OperationSpec::Filter(Filter::Comic),
        OperationKind::OldFilm => OperationSpec::Filter(Filter::OldFilm),
        OperationKind::Hdr => {
            let points = match &params.points {
                None => DEFAULT_HDR_POINTS,
                Some(points) => <[CurvePoint; 5]>::try_from(points.as_slice()).map_err(|_| {
                    EngineError::invalid(
                        "points",
                        format!("expected exactly 5 control points, got {}", points.len()),
                    )
                })?,
            };
            OperationSpec::Filter(Filter::Hdr { points })
        }
        OperationKind::Bokeh => OperationSpec::Filter(Filter::Bokeh {
            radius: params.radius.unwrap_or(DEFAULT_BOKEH_RADIUS),
        }),
        OperationKind::ColorPop => OperationSpec::Filter(Filter::ColorPop {
            color_a: params.color_a.unwrap_or(Color::MAGENTA),
            color_b: params.color_b.unwrap_or(Color::YELLOW),
        }),
        OperationKind::DramaticShadows => OperationSpec::Filter(Filter::DramaticShadows {
            contrast: params.contrast.unwrap_or(DEFAULT_DRAMATIC_CONTRAST),
        }),
        OperationKind::Grayscale => OperationSpec::Filter(Filter::Grayscale),
        OperationKind::Invert => OperationSpec::Filter(Filter::Invert),
        OperationKind::Vignette => OperationSpec::Filter(Filter::Vignette {
            intensity: params.intensity.unwrap_or(DEFAULT_VIGNETTE_INTENSITY),
            radius: params.radius.unwrap_or(DEFAULT_VIGNETTE_RADIUS),
        }),
        OperationKind::Rotate => OperationSpec::Transform(Transform::Rotate {
            degrees: required("degrees", params.degrees)?,
        }),
        OperationKind::Crop => OperationSpec::Transform(Transform::Crop(required("rect", params.rect)?)),
        OperationKind::Flip => OperationSpec::Transform(Transform::Flip(required("axis", params.axis)?)),
    };
    Operation::try_from(spec)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn brightness_accepts_exactly_its_range(v in -3.0f32..3.0) {
            let ok = Operation::brightness(v).is_ok();
            prop_assert_eq!(ok, (-1.0..=1.0).contains(&v));
        }

        #[test]
        fn rotation_lands_in_full_turn(d in -10_000.0f64..10_000.0) {
            let op = Operation::rotate(d).unwrap();
            match op.spec() {
                OperationSpec::Transform(Transform::Rotate { degrees }) => {
                    prop_assert!((0.0..360.0).contains(degrees));
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
