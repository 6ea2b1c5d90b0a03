use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ForwardConfig, G1Config, IntersectConfig, ProjectConfig};
use crate::curve::Curve;
use crate::error::{ClothoidError, ClothoidResult};
use crate::fit;
use crate::fresnel::{displacement, fresnel_cs3, Displacement};
use crate::intersect::intersect;
use crate::project::{project, Projection};

/// put angle into (-pi, pi] range
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Position, heading and curvature at one point of a curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub kappa: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64, kappa: f64) -> Self {
        Self { x, y, theta, kappa }
    }

    /// Unit tangent
    pub fn tangent(&self) -> [f64; 2] {
        [self.theta.cos(), self.theta.sin()]
    }

    /// Unit normal, pointing to the left of the direction of travel
    pub fn normal(&self) -> [f64; 2] {
        [-self.theta.sin(), self.theta.cos()]
    }
}

/// Mirror axis for [`ClothoidCurve::flip`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipAxis {
    /// mirror about the x axis, `y -> -y`
    X,
    /// mirror about the y axis, `x -> -x`
    Y,
    /// mirror about the start tangent line
    Start,
}

/// A single clothoid arc.
///
/// The curvature changes linearly with arc length:
/// `kappa(s) = kappa0 + dk * s` and
/// `theta(s) = theta0 + kappa0 * s + dk * s^2 / 2`.
/// The heading is kept as given, never wrapped.
///
/// Pose queries accept any real `s`, points outside `[0, L]` are
/// extrapolated along the same spiral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClothoidParams")]
pub struct ClothoidCurve {
    /// start point x
    x0: f64,
    /// start point y
    y0: f64,
    /// start heading
    theta0: f64,
    /// start point curvature 1/r
    kappa0: f64,
    /// curvature rate, how much curvature changes per unit length
    dk: f64,
    /// arc length, end curvature is kappa0 + dk * length
    length: f64,
}

/// Serialized form of [`ClothoidCurve`], validated on the way in.
#[derive(Deserialize)]
struct ClothoidParams {
    x0: f64,
    y0: f64,
    theta0: f64,
    kappa0: f64,
    dk: f64,
    length: f64,
}

impl TryFrom<ClothoidParams> for ClothoidCurve {
    type Error = ClothoidError;

    fn try_from(p: ClothoidParams) -> ClothoidResult<Self> {
        Self::new(p.x0, p.y0, p.theta0, p.kappa0, p.dk, p.length)
    }
}

impl ClothoidCurve {
    /// Create a curve from its defining parameters; `length` must be `>= 0`.
    pub fn new(
        x0: f64,
        y0: f64,
        theta0: f64,
        kappa0: f64,
        dk: f64,
        length: f64,
    ) -> ClothoidResult<Self> {
        // also rejects NaN
        if !(length >= 0.0) {
            return Err(ClothoidError::invalid_argument(format!(
                "negative length {length}"
            )));
        }
        Ok(Self::from_parts(x0, y0, theta0, kappa0, dk, length))
    }

    /// Unchecked constructor for parameters already known to be valid.
    pub(crate) fn from_parts(
        x0: f64,
        y0: f64,
        theta0: f64,
        kappa0: f64,
        dk: f64,
        length: f64,
    ) -> Self {
        Self {
            x0,
            y0,
            theta0,
            kappa0,
            dk,
            length,
        }
    }

    /// Curve starting at `pose` with curvature rate `dk` and the given length.
    pub(crate) fn from_pose(pose: Pose, dk: f64, length: f64) -> Self {
        Self::from_parts(pose.x, pose.y, pose.theta, pose.kappa, dk, length)
    }

    /// G1 Hermite fit with the default [`G1Config`], see [`fit::g1`].
    pub fn g1(
        x0: f64,
        y0: f64,
        theta0: f64,
        x1: f64,
        y1: f64,
        theta1: f64,
    ) -> ClothoidResult<Self> {
        fit::g1(x0, y0, theta0, x1, y1, theta1, &G1Config::default())
    }

    /// Forward fit with the default [`ForwardConfig`], see [`fit::forward`].
    pub fn forward(
        x0: f64,
        y0: f64,
        theta0: f64,
        kappa0: f64,
        x1: f64,
        y1: f64,
    ) -> ClothoidResult<Self> {
        fit::forward(x0, y0, theta0, kappa0, x1, y1, &ForwardConfig::default())
    }

    /// Overwrite every parameter. On error the curve is left unchanged.
    pub fn build(
        &mut self,
        x0: f64,
        y0: f64,
        theta0: f64,
        kappa0: f64,
        dk: f64,
        length: f64,
    ) -> ClothoidResult<()> {
        *self = Self::new(x0, y0, theta0, kappa0, dk, length)?;
        Ok(())
    }

    /// In place variant of [`ClothoidCurve::g1`].
    pub fn build_g1(
        &mut self,
        x0: f64,
        y0: f64,
        theta0: f64,
        x1: f64,
        y1: f64,
        theta1: f64,
    ) -> ClothoidResult<()> {
        *self = Self::g1(x0, y0, theta0, x1, y1, theta1)?;
        Ok(())
    }

    /// In place variant of [`ClothoidCurve::forward`].
    pub fn build_forward(
        &mut self,
        x0: f64,
        y0: f64,
        theta0: f64,
        kappa0: f64,
        x1: f64,
        y1: f64,
    ) -> ClothoidResult<()> {
        *self = Self::forward(x0, y0, theta0, kappa0, x1, y1)?;
        Ok(())
    }

    /// `[x0, y0, theta0, kappa0, dk, length]`, the same order as [`ClothoidCurve::new`]
    pub fn parameters(&self) -> [f64; 6] {
        [
            self.x0,
            self.y0,
            self.theta0,
            self.kappa0,
            self.dk,
            self.length,
        ]
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// curvature rate
    pub fn dk(&self) -> f64 {
        self.dk
    }

    pub fn kappa(&self, s: f64) -> f64 {
        self.kappa0 + self.dk * s
    }

    pub fn theta(&self, s: f64) -> f64 {
        self.theta0 + s * (self.kappa0 + 0.5 * self.dk * s)
    }

    pub fn theta_d(&self, s: f64) -> f64 {
        self.kappa(s)
    }

    pub fn theta_dd(&self, _s: f64) -> f64 {
        self.dk
    }

    pub fn theta_ddd(&self, _s: f64) -> f64 {
        0.0
    }

    /// Position at `s`.
    pub fn xy(&self, s: f64) -> [f64; 2] {
        let (f_c, f_s) = fresnel_cs3(self.dk * s * s, self.kappa0 * s, self.theta0);
        [self.x0 + s * f_c, self.y0 + s * f_s]
    }

    pub fn x(&self, s: f64) -> f64 {
        self.xy(s)[0]
    }

    pub fn y(&self, s: f64) -> f64 {
        self.xy(s)[1]
    }

    pub fn x_d(&self, s: f64) -> f64 {
        self.theta(s).cos()
    }

    pub fn y_d(&self, s: f64) -> f64 {
        self.theta(s).sin()
    }

    pub fn x_dd(&self, s: f64) -> f64 {
        -self.theta(s).sin() * self.kappa(s)
    }

    pub fn y_dd(&self, s: f64) -> f64 {
        self.theta(s).cos() * self.kappa(s)
    }

    pub fn x_ddd(&self, s: f64) -> f64 {
        let (sin_t, cos_t) = self.theta(s).sin_cos();
        let kappa = self.kappa(s);
        -cos_t * kappa * kappa - sin_t * self.dk
    }

    pub fn y_ddd(&self, s: f64) -> f64 {
        let (sin_t, cos_t) = self.theta(s).sin_cos();
        let kappa = self.kappa(s);
        -sin_t * kappa * kappa + cos_t * self.dk
    }

    /// Position, heading and their derivatives up to third order at `s` in
    /// one evaluation; `x[0]` and `y[0]` are absolute coordinates.
    pub fn eval(&self, s: f64) -> Displacement {
        let mut d = displacement(self.theta0, self.kappa0, self.dk, s);
        d.x[0] += self.x0;
        d.y[0] += self.y0;
        d
    }

    pub fn pose(&self, s: f64) -> Pose {
        let [x, y] = self.xy(s);
        Pose {
            x,
            y,
            theta: self.theta(s),
            kappa: self.kappa(s),
        }
    }

    pub fn pose_begin(&self) -> Pose {
        Pose::new(self.x0, self.y0, self.theta0, self.kappa0)
    }

    pub fn pose_end(&self) -> Pose {
        self.pose(self.length)
    }

    pub fn x_begin(&self) -> f64 {
        self.x0
    }

    pub fn y_begin(&self) -> f64 {
        self.y0
    }

    pub fn theta_begin(&self) -> f64 {
        self.theta0
    }

    pub fn kappa_begin(&self) -> f64 {
        self.kappa0
    }

    pub fn x_end(&self) -> f64 {
        self.x(self.length)
    }

    pub fn y_end(&self) -> f64 {
        self.y(self.length)
    }

    pub fn theta_end(&self) -> f64 {
        self.theta(self.length)
    }

    pub fn kappa_end(&self) -> f64 {
        self.kappa(self.length)
    }

    /// `n` evenly spaced points over `[0, L]`, both ends included
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        match n {
            0 => Vec::new(),
            1 => vec![self.xy(0.0)],
            _ => {
                let step = self.length / (n - 1) as f64;
                (0..n).map(|i| self.xy(i as f64 * step)).collect()
            }
        }
    }

    /// Total absolute turning `∫|kappa(s)| ds` between two arc lengths.
    pub fn total_turning(&self, s_begin: f64, s_end: f64) -> f64 {
        let (a, b) = if s_begin <= s_end {
            (s_begin, s_end)
        } else {
            (s_end, s_begin)
        };
        let linear_abs = |a: f64, b: f64| 0.5 * (self.kappa(a) + self.kappa(b)).abs() * (b - a);
        if self.dk != 0.0 {
            // split where the curvature changes sign
            let s_zero = -self.kappa0 / self.dk;
            if s_zero > a && s_zero < b {
                return linear_abs(a, s_zero) + linear_abs(s_zero, b);
            }
        }
        linear_abs(a, b)
    }

    // state mutating operations

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x0 += dx;
        self.y0 += dy;
    }

    /// Rotate by `angle` about `(cx, cy)`.
    pub fn rotate(&mut self, angle: f64, cx: f64, cy: f64) {
        let (sin_a, cos_a) = angle.sin_cos();
        let dx = self.x0 - cx;
        let dy = self.y0 - cy;
        self.x0 = cx + cos_a * dx - sin_a * dy;
        self.y0 = cy + sin_a * dx + cos_a * dy;
        self.theta0 += angle;
    }

    /// Uniform scaling about the origin. A negative factor also reflects the
    /// curve through the origin; the length stays non negative.
    pub fn scale(&mut self, factor: f64) -> ClothoidResult<()> {
        if factor == 0.0 || !factor.is_finite() {
            return Err(ClothoidError::invalid_argument(format!(
                "scale factor {factor}"
            )));
        }
        let abs_factor = factor.abs();
        self.x0 *= factor;
        self.y0 *= factor;
        self.length *= abs_factor;
        self.kappa0 /= abs_factor;
        self.dk /= factor * factor;
        if factor < 0.0 {
            self.theta0 += PI;
        }
        Ok(())
    }

    /// Uniform scaling about `(cx, cy)`.
    pub fn scale_about(&mut self, factor: f64, cx: f64, cy: f64) -> ClothoidResult<()> {
        let mut scaled = *self;
        scaled.translate(-cx, -cy);
        scaled.scale(factor)?;
        scaled.translate(cx, cy);
        *self = scaled;
        Ok(())
    }

    /// Swap the ends so the old end becomes `s = 0`.
    pub fn reverse(&mut self) {
        let end = self.pose_end();
        self.x0 = end.x;
        self.y0 = end.y;
        self.theta0 = end.theta + PI;
        self.kappa0 = -end.kappa;
        // d(-kappa)/d(-s) is unchanged
    }

    /// Restrict to `[s_begin, s_end]`, requires `0 <= s_begin < s_end <= L`.
    pub fn trim(&mut self, s_begin: f64, s_end: f64) -> ClothoidResult<()> {
        if !(0.0 <= s_begin && s_begin < s_end && s_end <= self.length) {
            return Err(ClothoidError::invalid_argument(format!(
                "trim range [{s_begin}, {s_end}] outside [0, {}]",
                self.length
            )));
        }
        let begin = self.pose(s_begin);
        *self = Self::from_pose(begin, self.dk, s_end - s_begin);
        Ok(())
    }

    /// Mirror the curve, the arc length parameterization is kept.
    pub fn flip(&mut self, axis: FlipAxis) {
        match axis {
            FlipAxis::X => {
                self.y0 = -self.y0;
                self.theta0 = -self.theta0;
            }
            FlipAxis::Y => {
                self.x0 = -self.x0;
                self.theta0 = PI - self.theta0;
            }
            FlipAxis::Start => {}
        }
        self.kappa0 = -self.kappa0;
        self.dk = -self.dk;
    }

    // value returning variants, the receiver is left intact

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let mut curve = *self;
        curve.translate(dx, dy);
        curve
    }

    pub fn rotated(&self, angle: f64, cx: f64, cy: f64) -> Self {
        let mut curve = *self;
        curve.rotate(angle, cx, cy);
        curve
    }

    pub fn scaled(&self, factor: f64) -> ClothoidResult<Self> {
        let mut curve = *self;
        curve.scale(factor)?;
        Ok(curve)
    }

    pub fn scaled_about(&self, factor: f64, cx: f64, cy: f64) -> ClothoidResult<Self> {
        let mut curve = *self;
        curve.scale_about(factor, cx, cy)?;
        Ok(curve)
    }

    pub fn reversed(&self) -> Self {
        let mut curve = *self;
        curve.reverse();
        curve
    }

    pub fn trimmed(&self, s_begin: f64, s_end: f64) -> ClothoidResult<Self> {
        let mut curve = *self;
        curve.trim(s_begin, s_end)?;
        Ok(curve)
    }

    pub fn flipped(&self, axis: FlipAxis) -> Self {
        let mut curve = *self;
        curve.flip(axis);
        curve
    }

    // projection helpers

    /// Closest point on the curve, see [`crate::project`].
    pub fn project(&self, qx: f64, qy: f64) -> Projection {
        project(self, qx, qy, &ProjectConfig::default())
    }

    pub fn distance(&self, qx: f64, qy: f64) -> f64 {
        self.project(qx, qy).distance
    }

    pub fn closest_point(&self, qx: f64, qy: f64) -> [f64; 2] {
        let p = self.project(qx, qy);
        [p.x, p.y]
    }

    pub fn closest_point_arc_length(&self, qx: f64, qy: f64) -> f64 {
        self.project(qx, qy).s
    }

    /// Distance to the curve offset by `offs` along the left normal.
    pub fn distance_iso(&self, qx: f64, qy: f64, offs: f64) -> f64 {
        self.offset_distance(qx, qy, offs)
    }

    /// Distance to the curve offset by `offs` along the right normal.
    pub fn distance_sae(&self, qx: f64, qy: f64, offs: f64) -> f64 {
        self.offset_distance(qx, qy, -offs)
    }

    fn offset_distance(&self, qx: f64, qy: f64, left_offs: f64) -> f64 {
        let p = self.project(qx, qy);
        let [nx, ny] = self.pose(p.s).normal();
        (qx - p.x - left_offs * nx).hypot(qy - p.y - left_offs * ny)
    }

    // intersection helpers

    /// Arc length pairs `(s_self, s_other)` where the two curves cross.
    pub fn intersect(&self, other: &ClothoidCurve) -> Vec<(f64, f64)> {
        intersect(self, other, &IntersectConfig::default())
    }

    /// Crossing points with `other`, evaluated on this curve.
    pub fn intersection_points(&self, other: &ClothoidCurve) -> Vec<[f64; 2]> {
        self.intersect(other)
            .into_iter()
            .map(|(s, _)| self.xy(s))
            .collect()
    }
}

impl Curve for ClothoidCurve {
    fn arcs(&self) -> &[ClothoidCurve] {
        std::slice::from_ref(self)
    }

    fn length(&self) -> f64 {
        self.length
    }

    fn evaluate(&self, s: f64) -> Pose {
        self.pose(s)
    }
}

impl fmt::Display for ClothoidCurve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Clothoid: x0:{} y0:{} t0:{} k0:{} kd:{} s:{}",
            self.x0, self.y0, self.theta0, self.kappa0, self.dk, self.length
        )
    }
}
