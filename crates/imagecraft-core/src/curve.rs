//! Tone curves evaluated with monotonic cubic Hermite splines.
//!
//! Tangents follow the Fritsch-Carlson method, so a curve through
//! non-decreasing control points never overshoots or reverses (no
//! solarization). Curves are baked into a 256-entry LUT before touching
//! pixels.

use serde::{Deserialize, Serialize};

/// Tone curve control point, both coordinates in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f32,
    pub y: f32,
}

impl CurvePoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A tone curve through control points sorted by `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurve {
    points: Vec<CurvePoint>,
    tangents: Vec<f32>,
}

impl ToneCurve {
    /// Build a curve; points are expected sorted by `x`.
    pub fn new(points: &[CurvePoint]) -> Self {
        Self {
            points: points.to_vec(),
            tangents: monotonic_tangents(points),
        }
    }

    /// The straight line from (0, 0) to (1, 1).
    pub fn linear() -> Self {
        Self::new(&[CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)])
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Evaluate the curve at `x`; inputs outside the first/last point are clamped.
    pub fn evaluate(&self, x: f32) -> f32 {
        let points = &self.points;
        match points.len() {
            0 => return x,
            1 => return points[0].y,
            _ => {}
        }

        let x = x.clamp(points[0].x, points[points.len() - 1].x);
        let i = segment_index(points, x);
        let (p0, p1) = (points[i], points[i + 1]);

        let h = p1.x - p0.x;
        if h.abs() < f32::EPSILON {
            return p0.y;
        }

        let t = (x - p0.x) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        let y = h00 * p0.y + h10 * h * self.tangents[i] + h01 * p1.y + h11 * h * self.tangents[i + 1];
        y.clamp(0.0, 1.0)
    }
}

/// Pre-computed 256-entry lookup table: `lut[input] = output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveLut {
    pub lut: [u8; 256],
}

impl CurveLut {
    pub fn from_curve(curve: &ToneCurve) -> Self {
        let mut lut = [0u8; 256];
        for (i, out) in lut.iter_mut().enumerate() {
            let y = curve.evaluate(i as f32 / 255.0);
            *out = (y * 255.0).clamp(0.0, 255.0).round() as u8;
        }
        Self { lut }
    }

    pub fn identity() -> Self {
        let mut lut = [0u8; 256];
        for (i, out) in lut.iter_mut().enumerate() {
            *out = i as u8;
        }
        Self { lut }
    }

    pub fn is_identity(&self) -> bool {
        self.lut.iter().enumerate().all(|(i, &v)| v == i as u8)
    }

    #[inline]
    pub fn map(&self, value: u8) -> u8 {
        self.lut[value as usize]
    }
}

/// Fritsch-Carlson tangents for a monotone piecewise cubic.
fn monotonic_tangents(points: &[CurvePoint]) -> Vec<f32> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let widths: Vec<f32> = points.windows(2).map(|w| w[1].x - w[0].x).collect();
    let slopes: Vec<f32> = points
        .windows(2)
        .zip(&widths)
        .map(|(w, &h)| if h.abs() < f32::EPSILON { 0.0 } else { (w[1].y - w[0].y) / h })
        .collect();

    let mut m = vec![0.0f32; n];
    m[0] = slopes[0];
    m[n - 1] = slopes[n - 2];

    // Interior tangents: weighted harmonic mean of neighbouring slopes,
    // zero at local extrema and flat segments.
    for i in 1..n - 1 {
        let (d0, d1) = (slopes[i - 1], slopes[i]);
        if d0.abs() < f32::EPSILON || d1.abs() < f32::EPSILON || d0.signum() != d1.signum() {
            continue;
        }
        let w1 = 2.0 * widths[i] + widths[i - 1];
        let w2 = widths[i] + 2.0 * widths[i - 1];
        m[i] = (w1 + w2) / (w1 / d0 + w2 / d1);
    }

    // Limit tangents to 3x the secant so each segment stays monotone.
    for (i, &d) in slopes.iter().enumerate() {
        if d.abs() < f32::EPSILON {
            m[i] = 0.0;
            m[i + 1] = 0.0;
            continue;
        }
        let limit = 3.0 * d.abs();
        m[i] = m[i].clamp(-limit, limit);
        m[i + 1] = m[i + 1].clamp(-limit, limit);
    }

    m
}

/// Index of the segment `[points[i], points[i + 1]]` containing `x`.
fn segment_index(points: &[CurvePoint], x: f32) -> usize {
    let last_segment = points.len() - 2;
    // First point strictly right of x, minus one.
    let upper = points[1..].partition_point(|p| p.x <= x);
    upper.min(last_segment)
}
