//! Single arc fitting: G1 Hermite interpolation between two oriented points and
//! the forward problem from a full start pose to a target position.
//!
//! Both work on the unit chord problem: the chord is rotated onto the x axis
//! and scaled to length one, so the start angle `phi0` and end angle `phi1`
//! are measured against the chord. With `A = dk L^2 / 2` the unit clothoid has
//! heading `phi0 + (delta - A) t + A t^2` for `t ∈ [0, 1]`, `delta = phi1 - phi0`,
//! and must end on the x axis.

use std::f64::consts::{FRAC_1_PI, PI};

use log::{debug, trace};

use crate::clothoid::{normalize_angle, ClothoidCurve};
use crate::config::{ForwardConfig, G1Config};
use crate::error::{ClothoidError, ClothoidResult};
use crate::fresnel::fresnel_moments;

/// Keeps the unknown end angle of the forward problem away from `±pi`.
const ANGLE_MARGIN: f64 = 1e-6;

/// Solution of the unit chord G1 problem.
#[derive(Clone, Copy, Debug)]
struct UnitG1 {
    a: f64,
    delta: f64,
    /// cosine moments at the solution
    c: [f64; 3],
    /// sine moments at the solution
    s: [f64; 3],
}

impl UnitG1 {
    /// Start curvature of the unit chord curve, its length is `1 / c[0]`.
    fn kappa0(&self) -> f64 {
        (self.delta - self.a) * self.c[0]
    }
}

/// Initial guess of `A` from a fitted rational function of the two angles.
fn guess_a(phi0: f64, phi1: f64) -> f64 {
    const CF: [f64; 6] = [
        2.989696028701907,
        0.716228953608281,
        -0.458969738821509,
        -0.502821153340377,
        0.261062141752652,
        -0.045854475238709,
    ];
    let x = phi0 * FRAC_1_PI;
    let y = phi1 * FRAC_1_PI;
    let xy = x * y;
    let x2 = x * x;
    let y2 = y * y;
    (phi0 + phi1)
        * (CF[0]
            + xy * (CF[1] + xy * CF[2])
            + (CF[3] + xy * CF[4]) * (x2 + y2)
            + CF[5] * (x2 * x2 + y2 * y2))
}

/// Newton on `Y_0(A) = 0`, the end point of the unit curve lying on the chord.
fn solve_unit(
    phi0: f64,
    phi1: f64,
    tolerance: f64,
    max_iterations: usize,
) -> ClothoidResult<UnitG1> {
    let delta = phi1 - phi0;
    let mut a = guess_a(phi0, phi1);
    for iter in 0..max_iterations {
        let (c, s) = fresnel_moments(3, 2.0 * a, delta - a, phi0);
        let g = s[0];
        let dg = c[2] - c[1];
        trace!("g1 iteration {iter}: A = {a}, g = {g}, g' = {dg}");
        if g.abs() <= tolerance {
            if !(c[0] > 0.0) {
                return Err(ClothoidError::convergence_failure(format!(
                    "g1 solution A = {a} has no positive length"
                )));
            }
            debug!("g1 converged after {iter} iterations, residual {g:e}");
            return Ok(UnitG1 { a, delta, c, s });
        }
        if dg == 0.0 || !dg.is_finite() {
            break;
        }
        a -= g / dg;
    }
    Err(ClothoidError::convergence_failure(format!(
        "g1 from angle {phi0} to {phi1} not within {tolerance} after {max_iterations} iterations"
    )))
}

/// Chord length and direction between two points.
fn chord(x0: f64, y0: f64, x1: f64, y1: f64) -> (f64, f64) {
    let dx = x1 - x0;
    let dy = y1 - y0;
    (dx.hypot(dy), dy.atan2(dx))
}

/// Fit the clothoid from `(x0, y0)` with heading `theta0` to `(x1, y1)` with
/// heading `theta1`.
///
/// The start heading is kept as given; the end heading matches `theta1` up to
/// a multiple of `2 pi`. The tolerance applies to the unit chord residual.
/// Coincident points give [`ClothoidError::ConvergenceFailure`], as the
/// heading change between them is undefined.
pub fn g1(
    x0: f64,
    y0: f64,
    theta0: f64,
    x1: f64,
    y1: f64,
    theta1: f64,
    config: &G1Config,
) -> ClothoidResult<ClothoidCurve> {
    let (r, phi) = chord(x0, y0, x1, y1);
    if !(r > 0.0) || !r.is_finite() {
        return Err(ClothoidError::convergence_failure(format!(
            "g1 end points ({x0}, {y0}) and ({x1}, {y1}) coincide"
        )));
    }
    let phi0 = normalize_angle(theta0 - phi);
    let phi1 = normalize_angle(theta1 - phi);
    let unit = solve_unit(phi0, phi1, config.tolerance, config.max_iterations)?;

    let length = r / unit.c[0];
    let kappa0 = (unit.delta - unit.a) / length;
    let dk = 2.0 * unit.a / (length * length);
    Ok(ClothoidCurve::from_parts(x0, y0, theta0, kappa0, dk, length))
}

/// Fit the clothoid leaving `(x0, y0)` with heading `theta0` and curvature
/// `kappa0` that ends at `(x1, y1)`; the end heading is free.
///
/// Newton on the end angle `phi1` of the unit chord problem, matching the start
/// curvature that the G1 fit for `phi1` produces against the requested one.
pub fn forward(
    x0: f64,
    y0: f64,
    theta0: f64,
    kappa0: f64,
    x1: f64,
    y1: f64,
    config: &ForwardConfig,
) -> ClothoidResult<ClothoidCurve> {
    let (r, phi) = chord(x0, y0, x1, y1);
    if !(r > 0.0) || !r.is_finite() {
        return Err(ClothoidError::invalid_argument(format!(
            "forward target ({x1}, {y1}) coincides with the start"
        )));
    }
    let phi0 = normalize_angle(theta0 - phi);
    // target start curvature on the unit chord
    let k = kappa0 * r;
    let inner_tolerance = (config.tolerance * 1e-2).max(1e-14);
    let inner_iterations = G1Config::default().max_iterations;
    let limit = PI - ANGLE_MARGIN;

    // small angle approximation of the unit problem
    let mut phi1 = (-2.0 * phi0 - 0.5 * k).clamp(-limit, limit);
    for iter in 0..config.max_iterations {
        let unit = solve_unit(phi0, phi1, inner_tolerance, inner_iterations)?;
        let f = unit.kappa0() - k;
        trace!("forward iteration {iter}: phi1 = {phi1}, f = {f}");
        if f.abs() <= config.tolerance {
            let length = r / unit.c[0];
            let dk = 2.0 * unit.a / (length * length);
            debug!("forward converged after {iter} iterations, residual {f:e}");
            return Ok(ClothoidCurve::from_parts(x0, y0, theta0, kappa0, dk, length));
        }
        let [c0, c1, c2] = unit.c;
        let [_, s1, s2] = unit.s;
        // implicit derivatives of A and X_0 with respect to phi1
        let da = -c1 / (c2 - c1);
        let dc0 = -(s2 - s1) * da - s1;
        let df = (1.0 - da) * c0 + (unit.delta - unit.a) * dc0;
        if df == 0.0 || !df.is_finite() {
            break;
        }
        let step = (f / df).clamp(-config.max_step, config.max_step);
        phi1 = (phi1 - step).clamp(-limit, limit);
    }
    Err(ClothoidError::convergence_failure(format!(
        "forward from ({x0}, {y0}) to ({x1}, {y1}) with curvature {kappa0} did not converge"
    )))
}
