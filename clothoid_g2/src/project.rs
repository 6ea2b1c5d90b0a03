//! Closest point on a curve to a query point.
//!
//! The curve is sampled densely enough that neighbouring samples are at most
//! `max_turn_per_sample` apart in heading, every local minimum of the sampled
//! squared distance (endpoints included) becomes a bracket, and each bracket is
//! refined by Newton on `(P(s) - Q) · T(s) = 0`. Brackets where Newton does not
//! settle fall back to argmin's Brent minimizer.

use argmin::core::{CostFunction, Error, Executor};
use argmin::solver::brent::BrentOpt;
use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;
use crate::curve::Curve;

/// Closest point `(x, y)`, its arc length `s` and the distance to the query point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub distance: f64,
}

struct SquaredDistance<'a, C: ?Sized> {
    curve: &'a C,
    qx: f64,
    qy: f64,
}

impl<C: Curve + ?Sized> SquaredDistance<'_, C> {
    fn at(&self, s: f64) -> f64 {
        let p = self.curve.evaluate(s);
        let dx = p.x - self.qx;
        let dy = p.y - self.qy;
        dx * dx + dy * dy
    }
}

impl<C: Curve + ?Sized> CostFunction for SquaredDistance<'_, C> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, s: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.at(*s))
    }
}

/// Project `(qx, qy)` onto `curve`. Never fails; a zero length curve projects
/// every point onto its start.
pub fn project<C>(curve: &C, qx: f64, qy: f64, config: &ProjectConfig) -> Projection
where
    C: Curve + ?Sized,
{
    let length = curve.length();
    let cost = SquaredDistance { curve, qx, qy };
    if !(length > 0.0) {
        return projection_at(&cost, 0.0);
    }

    let turning = curve.total_turning(0.0..length);
    let wanted = (turning / config.max_turn_per_sample).ceil() as usize;
    let n = wanted
        .max(config.min_samples)
        .min(config.max_samples)
        .max(2);
    let step = length / n as f64;
    let samples: Vec<(f64, f64)> = (0..=n)
        .map(|i| {
            let s = if i == n { length } else { i as f64 * step };
            (s, cost.at(s))
        })
        .collect();

    let mut best = (samples[0].0, samples[0].1);
    for (i, &(s, d)) in samples.iter().enumerate() {
        let left = if i > 0 { samples[i - 1].1 } else { f64::INFINITY };
        let right = samples.get(i + 1).map_or(f64::INFINITY, |&(_, d)| d);
        if d > left || d > right {
            continue;
        }
        let lo = samples[i.saturating_sub(1)].0;
        let hi = samples[(i + 1).min(n)].0;
        let (s_min, d_min) = refine(&cost, lo, hi, s, d, length, config);
        if d_min < best.1 {
            best = (s_min, d_min);
        }
    }
    projection_at(&cost, best.0)
}

fn projection_at<C: Curve + ?Sized>(cost: &SquaredDistance<C>, s: f64) -> Projection {
    let p = cost.curve.evaluate(s);
    Projection {
        x: p.x,
        y: p.y,
        s,
        distance: (p.x - cost.qx).hypot(p.y - cost.qy),
    }
}

/// Minimize the squared distance inside `[lo, hi]` starting from the sample
/// `(s, d)`. Returns the better of the refined point and the sample.
fn refine<C: Curve + ?Sized>(
    cost: &SquaredDistance<C>,
    lo: f64,
    hi: f64,
    s: f64,
    d: f64,
    length: f64,
    config: &ProjectConfig,
) -> (f64, f64) {
    let refined = newton(cost, lo, hi, s, length, config).or_else(|| brent(cost, lo, hi, config));
    match refined {
        Some(s_new) => {
            let d_new = cost.at(s_new);
            if d_new < d {
                (s_new, d_new)
            } else {
                (s, d)
            }
        }
        None => (s, d),
    }
}

/// Newton on g(s) = (P - Q)·T with g'(s) = 1 + kappa (P - Q)·N, clamped to the bracket.
fn newton<C: Curve + ?Sized>(
    cost: &SquaredDistance<C>,
    lo: f64,
    hi: f64,
    mut s: f64,
    length: f64,
    config: &ProjectConfig,
) -> Option<f64> {
    for iter in 0..config.max_iterations {
        let pose = cost.curve.evaluate(s);
        let [tx, ty] = pose.tangent();
        let [nx, ny] = pose.normal();
        let dx = pose.x - cost.qx;
        let dy = pose.y - cost.qy;
        let g = dx * tx + dy * ty;
        let dg = 1.0 + pose.kappa * (dx * nx + dy * ny);
        if !(dg > 0.0) {
            // not locally convex, leave it to the bracketing minimizer
            trace!("projection newton: g' = {dg} at s = {s}");
            return None;
        }
        let s_new = (s - g / dg).clamp(lo, hi);
        if (s_new - s).abs() <= config.tolerance * (1.0 + length) {
            trace!("projection newton: converged in {} iterations", iter + 1);
            return Some(s_new);
        }
        s = s_new;
    }
    None
}

fn brent<C>(cost: &SquaredDistance<C>, lo: f64, hi: f64, config: &ProjectConfig) -> Option<f64>
where
    C: Curve + ?Sized,
{
    let problem = SquaredDistance {
        curve: cost.curve,
        qx: cost.qx,
        qy: cost.qy,
    };
    let solver = BrentOpt::new(lo, hi)
        .set_tolerance(f64::EPSILON.sqrt(), config.tolerance * (1.0 + hi - lo));
    let res = Executor::new(problem, solver)
        .configure(|state| state.max_iters(config.max_iterations as u64))
        .run();
    match res {
        Ok(res) => res.state.best_param.map(|s| s.clamp(lo, hi)),
        Err(err) => {
            warn!("projection brent fallback on [{lo}, {hi}] failed: {err}");
            None
        }
    }
}
