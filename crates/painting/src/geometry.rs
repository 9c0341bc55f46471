//! Scalar geometry for stroke generation

use glam::Vec2;

use crate::constants::GEOMETRY_EPSILON;

/// A position in canvas pixel space, y pointing up
pub type Point = Vec2;

/// Euclidean distance between two points
#[inline]
pub fn distance(a: Point, b: Point) -> f32 {
    a.distance(b)
}

/// Point halfway between `a` and `b`
#[inline]
pub fn midpoint(a: Point, b: Point) -> Point {
    (a + b) * 0.5
}

/// Arc length of the quadratic Bezier with anchor `p0`, control `p1` and end `p2`
///
/// Closed-form integral of the derivative's magnitude. The formula divides by
/// `A = 4 |p0 - 2 p1 + p2|^2`, which vanishes when the control point sits on
/// the chord's midpoint, and its log term blows up when the curve doubles
/// back on itself along a line. In those cases the curve is a straight
/// segment and the chord length is returned instead.
///
/// The result is therefore discontinuous at exactly out-and-back curves: one
/// that doubles back along a line returns the chord (zero when `p0 == p2`),
/// while an end point nudged off that line returns the true length.
pub fn quadratic_bezier_length(p0: Point, p1: Point, p2: Point) -> f32 {
    // Evaluate in f64: the terms cancel heavily for nearly straight curves
    let (p0, p1, p2) = (p0.as_dvec2(), p1.as_dvec2(), p2.as_dvec2());
    let chord = p0.distance(p2) as f32;

    let a = p0 - 2.0 * p1 + p2;
    let b = 2.0 * (p1 - p0);

    let big_a = 4.0 * a.dot(a);
    let big_b = 4.0 * a.dot(b);
    let big_c = b.dot(b);

    let scale = big_c.max(big_a).max(1.0);
    if big_a <= GEOMETRY_EPSILON as f64 * scale {
        return chord;
    }

    let s_abc = 2.0 * (big_a + big_b + big_c).max(0.0).sqrt();
    let a_2 = big_a.sqrt();
    let a_32 = 2.0 * big_a * a_2;
    let c_2 = 2.0 * big_c.sqrt();
    let ba = big_b / a_2;

    let log_num = 2.0 * a_2 + ba + s_abc;
    let log_den = ba + c_2;
    if log_num <= 0.0 || log_den <= 0.0 {
        return chord;
    }

    let length = (a_32 * s_abc
        + a_2 * big_b * (s_abc - c_2)
        + (4.0 * big_c * big_a - big_b * big_b) * (log_num / log_den).ln())
        / (4.0 * a_32);

    let length = length as f32;
    if length.is_finite() && length >= 0.0 {
        length
    } else {
        chord
    }
}

/// A quadratic Bezier segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticBezier {
    pub anchor: Point,
    pub control: Point,
    pub end: Point,
}

impl QuadraticBezier {
    pub fn new(anchor: Point, control: Point, end: Point) -> Self {
        Self {
            anchor,
            control,
            end,
        }
    }

    /// Position at parameter `t` in [0, 1]
    #[inline]
    pub fn point_at(&self, t: f32) -> Point {
        let s = 1.0 - t;
        self.anchor * (s * s) + self.control * (2.0 * s * t) + self.end * (t * t)
    }

    /// Arc length, see [`quadratic_bezier_length`]
    pub fn length(&self) -> f32 {
        quadratic_bezier_length(self.anchor, self.control, self.end)
    }

    /// Samples at `t = 0, dt, 2 dt, ...` while `t <= 1`
    ///
    /// A non-positive or non-finite `dt` yields no samples.
    pub fn samples(&self, dt: f32) -> CurveSamples {
        CurveSamples {
            curve: *self,
            dt,
            step: Some(0),
        }
    }
}

/// One sample along a curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub t: f32,
    pub point: Point,
}

/// Iterator over fixed-step samples of a [`QuadraticBezier`]
#[derive(Debug, Clone)]
pub struct CurveSamples {
    curve: QuadraticBezier,
    dt: f32,
    /// Next step index; `None` once the index space is exhausted
    step: Option<u64>,
}

impl Iterator for CurveSamples {
    type Item = CurveSample;

    fn next(&mut self) -> Option<CurveSample> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return None;
        }
        let step = self.step?;
        // Multiply instead of accumulating so long curves don't drift
        let t = step as f64 * self.dt as f64;
        if t > 1.0 {
            return None;
        }
        let t = t as f32;
        self.step = step.checked_add(1);
        Some(CurveSample {
            t,
            point: self.curve.point_at(t),
        })
    }
}
