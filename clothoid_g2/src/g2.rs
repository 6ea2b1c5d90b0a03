//! Three arc G2 Hermite interpolation.
//!
//! The problem is solved on the unit chord: start at `(0, 0)`, end at `(1, 0)`,
//! headings measured against the chord and curvatures multiplied by the chord
//! length. The outer arc lengths `s0` and `s1` are fixed from a heuristic seed;
//! the middle arc length `sm` and the heading `thm` at the middle of the middle
//! arc are the unknowns. For given unknowns the two junction curvatures follow
//! from a linear system (total heading change and heading at the middle), and
//! the residual is the end point mismatch. Damped Newton with a finite
//! difference Jacobian drives it to zero.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use finitediff::FiniteDiff;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::clothoid::{normalize_angle, ClothoidCurve, Pose};
use crate::config::{G1Config, G2Config};
use crate::curve::Curve;
use crate::error::{ClothoidError, ClothoidResult};
use crate::fit;
use crate::fresnel::fresnel_cs3;

/// Factors applied to the outer arc seeds, tried in order.
const SEED_SCALES: [f64; 3] = [1.0, 0.5, 0.25];

/// Allowed gap between consecutive arcs of a chain, relative to its size.
const JUNCTION_TOLERANCE: f64 = 1e-8;

/// Three clothoid arcs joined end to start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChainArcs")]
pub struct ClothoidChain {
    arcs: [ClothoidCurve; 3],
}

/// Serialized form of [`ClothoidChain`], checked for contiguity on the way in.
#[derive(Deserialize)]
struct ChainArcs {
    arcs: [ClothoidCurve; 3],
}

impl TryFrom<ChainArcs> for ClothoidChain {
    type Error = ClothoidError;

    fn try_from(raw: ChainArcs) -> ClothoidResult<Self> {
        Self::new(raw.arcs)
    }
}

impl ClothoidChain {
    /// Chain three arcs; each must start where the previous one ends.
    pub fn new(arcs: [ClothoidCurve; 3]) -> ClothoidResult<Self> {
        for (i, pair) in arcs.windows(2).enumerate() {
            let end = pair[0].pose_end();
            let begin = pair[1].pose_begin();
            let gap = (end.x - begin.x).hypot(end.y - begin.y);
            let size = 1.0 + pair[0].length() + end.x.abs() + end.y.abs();
            if !(gap <= JUNCTION_TOLERANCE * size) {
                return Err(ClothoidError::invalid_argument(format!(
                    "arc {} starts {gap} away from the end of arc {i}",
                    i + 1
                )));
            }
        }
        Ok(Self { arcs })
    }

    pub fn arc0(&self) -> &ClothoidCurve {
        &self.arcs[0]
    }

    pub fn arc_middle(&self) -> &ClothoidCurve {
        &self.arcs[1]
    }

    pub fn arc1(&self) -> &ClothoidCurve {
        &self.arcs[2]
    }

    /// length of the first arc
    pub fn s0(&self) -> f64 {
        self.arcs[0].length()
    }

    /// length of the middle arc
    pub fn sm(&self) -> f64 {
        self.arcs[1].length()
    }

    /// length of the last arc
    pub fn s1(&self) -> f64 {
        self.arcs[2].length()
    }

    pub fn total_length(&self) -> f64 {
        self.s0() + self.sm() + self.s1()
    }
}

impl Curve for ClothoidChain {
    fn arcs(&self) -> &[ClothoidCurve] {
        &self.arcs
    }
}

/// End point offset of an arc from its start.
fn arc_offset(length: f64, theta: f64, kappa_begin: f64, kappa_end: f64) -> [f64; 2] {
    let (c, s) = fresnel_cs3((kappa_end - kappa_begin) * length, kappa_begin * length, theta);
    [length * c, length * s]
}

#[derive(Clone, Copy, Debug)]
struct Junctions {
    ka: f64,
    kb: f64,
    tha: f64,
    thb: f64,
}

/// Boundary data on the unit chord.
#[derive(Clone, Copy, Debug)]
struct UnitProblem {
    th0: f64,
    th1: f64,
    k0: f64,
    k1: f64,
}

impl UnitProblem {
    /// Junction curvatures and headings for the given arc lengths and middle
    /// heading. The system matrix has a negative determinant for positive
    /// `s0` and `s1`.
    fn junctions(&self, s0: f64, s1: f64, sm: f64, thm: f64) -> Junctions {
        let a11 = 0.5 * (s0 + sm);
        let a12 = 0.5 * (sm + s1);
        let a21 = 0.5 * s0 + 0.375 * sm;
        let a22 = 0.125 * sm;
        let r1 = self.th1 - self.th0 - 0.5 * (s0 * self.k0 + s1 * self.k1);
        let r2 = thm - self.th0 - 0.5 * s0 * self.k0;
        let det = a11 * a22 - a12 * a21;
        let ka = (r1 * a22 - a12 * r2) / det;
        let kb = (a11 * r2 - a21 * r1) / det;
        let tha = self.th0 + 0.5 * s0 * (self.k0 + ka);
        let thb = tha + 0.5 * sm * (ka + kb);
        Junctions { ka, kb, tha, thb }
    }

    /// End point mismatch for unknowns `p = [sm, thm]`.
    fn residual(&self, s0: f64, s1: f64, p: &[f64]) -> [f64; 2] {
        let (sm, thm) = (p[0], p[1]);
        let j = self.junctions(s0, s1, sm, thm);
        let [x0, y0] = arc_offset(s0, self.th0, self.k0, j.ka);
        let [xm, ym] = arc_offset(sm, j.tha, j.ka, j.kb);
        let [x1, y1] = arc_offset(s1, j.thb, j.kb, self.k1);
        [x0 + xm + x1 - 1.0, y0 + ym + y1]
    }

    /// Damped Newton from `guess`, returns the unknowns and the iteration count.
    fn solve(
        &self,
        s0: f64,
        s1: f64,
        guess: [f64; 2],
        config: &G2Config,
    ) -> Option<([f64; 2], usize)> {
        let mut p = vec![guess[0], guess[1]];
        let mut f = self.residual(s0, s1, &p);
        for iter in 0..=config.max_iterations {
            let norm = f[0].hypot(f[1]);
            trace!("g2 iteration {iter}: sm = {}, thm = {}, |f| = {norm:e}", p[0], p[1]);
            if norm <= config.tolerance {
                return Some(([p[0], p[1]], iter));
            }
            if iter == config.max_iterations || !norm.is_finite() {
                break;
            }
            let gx = p.central_diff(&|q: &Vec<f64>| self.residual(s0, s1, q)[0]);
            let gy = p.central_diff(&|q: &Vec<f64>| self.residual(s0, s1, q)[1]);
            let det = gx[0] * gy[1] - gx[1] * gy[0];
            if det == 0.0 || !det.is_finite() {
                debug!("g2 singular jacobian at sm = {}, thm = {}", p[0], p[1]);
                break;
            }
            let d_sm = (gx[1] * f[1] - f[0] * gy[1]) / det;
            let d_thm = (gy[0] * f[0] - gx[0] * f[1]) / det;

            // halve the step until the residual decreases enough and sm stays positive
            let mut tau = 1.0;
            loop {
                let trial = vec![p[0] + tau * d_sm, p[1] + tau * d_thm];
                if trial[0] > 0.0 {
                    let f_trial = self.residual(s0, s1, &trial);
                    if f_trial[0].hypot(f_trial[1]) < (1.0 - 0.5 * tau) * norm {
                        p = trial;
                        f = f_trial;
                        break;
                    }
                }
                tau *= 0.5;
                if tau < config.min_damping {
                    debug!("g2 damping below {} at iteration {iter}", config.min_damping);
                    return None;
                }
            }
        }
        None
    }
}

/// Solver for the three arc G2 problem; holds the last successful solution.
#[derive(Clone, Debug, Default)]
pub struct G2Solve3Arc {
    config: G2Config,
    chain: Option<ClothoidChain>,
}

impl G2Solve3Arc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: G2Config) -> Self {
        Self {
            config,
            chain: None,
        }
    }

    pub fn config(&self) -> &G2Config {
        &self.config
    }

    /// Build three arcs from `start` to `end`, continuous in position, heading
    /// and curvature. Returns the number of Newton iterations used.
    ///
    /// `d_max` bounds the heading change along each outer arc (`<= 0` means
    /// `pi`, larger values are clamped to `pi`), `dd_max` bounds how far the
    /// outer arcs may turn away from the G1 guess (`<= 0` means `pi / 8`,
    /// clamped to `pi / 4`). Both only shape the seed.
    ///
    /// A failed build clears the previous solution.
    pub fn build(
        &mut self,
        start: Pose,
        end: Pose,
        d_max: f64,
        dd_max: f64,
    ) -> ClothoidResult<usize> {
        self.chain = None;
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let d = dx.hypot(dy);
        if !(d > 0.0) || !d.is_finite() {
            return Err(ClothoidError::invalid_argument(format!(
                "g2 end points ({}, {}) and ({}, {}) coincide",
                start.x, start.y, end.x, end.y
            )));
        }
        let phi = dy.atan2(dx);
        let d_max = if d_max > 0.0 { d_max.min(PI) } else { PI };
        let dd_max = if dd_max > 0.0 { dd_max.min(FRAC_PI_4) } else { PI / 8.0 };

        let problem = UnitProblem {
            th0: normalize_angle(start.theta - phi),
            th1: normalize_angle(end.theta - phi),
            k0: start.kappa * d,
            k1: end.kappa * d,
        };
        let guess = fit::g1(
            0.0,
            0.0,
            problem.th0,
            1.0,
            0.0,
            problem.th1,
            &G1Config::default().with_tolerance(self.config.tolerance),
        )?;
        let (s0, s1) = outer_seeds(&problem, &guess, d_max, dd_max);

        for factor in SEED_SCALES {
            let (s0, s1) = (s0 * factor, s1 * factor);
            let sm = guess.length() - s0 - s1;
            let thm = guess.theta(s0 + 0.5 * sm);
            if let Some(([sm, thm], iterations)) = problem.solve(s0, s1, [sm, thm], &self.config) {
                let chain = problem.chain(start, end, d, [s0, sm, s1], thm)?;
                debug!(
                    "g2 converged after {iterations} iterations, lengths {} {} {}",
                    chain.s0(),
                    chain.sm(),
                    chain.s1()
                );
                self.chain = Some(chain);
                return Ok(iterations);
            }
            debug!("g2 seed s0 = {s0}, s1 = {s1} did not converge");
        }
        Err(ClothoidError::convergence_failure(format!(
            "g2 from {start:?} to {end:?} after {} seeds",
            SEED_SCALES.len()
        )))
    }

    fn solution(&self) -> ClothoidResult<&ClothoidChain> {
        self.chain
            .as_ref()
            .ok_or_else(|| ClothoidError::invalid_state("no g2 solution, build has not succeeded"))
    }

    pub fn chain(&self) -> ClothoidResult<&ClothoidChain> {
        self.solution()
    }

    pub fn arc0(&self) -> ClothoidResult<&ClothoidCurve> {
        Ok(self.solution()?.arc0())
    }

    pub fn arc_middle(&self) -> ClothoidResult<&ClothoidCurve> {
        Ok(self.solution()?.arc_middle())
    }

    pub fn arc1(&self) -> ClothoidResult<&ClothoidCurve> {
        Ok(self.solution()?.arc1())
    }

    pub fn total_length(&self) -> ClothoidResult<f64> {
        Ok(self.solution()?.total_length())
    }

    pub fn s0(&self) -> ClothoidResult<f64> {
        Ok(self.solution()?.s0())
    }

    pub fn s1(&self) -> ClothoidResult<f64> {
        Ok(self.solution()?.s1())
    }

    pub fn sm(&self) -> ClothoidResult<f64> {
        Ok(self.solution()?.sm())
    }
}

/// Seed lengths of the outer arcs on the unit chord, from the G1 curve `guess`.
///
/// Each starts at a third of the G1 length and is shortened so the curvature
/// jump to the G1 curve turns the arc by at most `dd_max` and the arc itself
/// turns by at most `d_max`.
fn outer_seeds(
    problem: &UnitProblem,
    guess: &ClothoidCurve,
    d_max: f64,
    dd_max: f64,
) -> (f64, f64) {
    let l3 = guess.length() / 3.0;
    let dk = guess.dk().abs();
    let seed = |k: f64, k_guess: f64| {
        let mut s = l3;
        let tmp = 0.5 * (k - k_guess).abs() / dd_max;
        if tmp * s > 1.0 {
            s = 1.0 / tmp;
        }
        let tmp = 0.5 * ((k + k_guess).abs() + s * dk);
        if tmp * s > d_max {
            s = d_max / tmp;
        }
        s
    };
    // shorter outer arcs when the end headings differ a lot
    let ratio = (problem.th0 - problem.th1).abs() / TAU;
    let factor = (ratio.powi(4) * FRAC_PI_2).cos().powi(3).max(0.1);
    (
        factor * seed(problem.k0, guess.kappa_begin()),
        factor * seed(problem.k1, guess.kappa_end()),
    )
}

impl UnitProblem {
    /// Scale the unit solution back onto the chord of length `d` starting at `start`.
    fn chain(
        &self,
        start: Pose,
        end: Pose,
        d: f64,
        lengths: [f64; 3],
        thm: f64,
    ) -> ClothoidResult<ClothoidChain> {
        let [s0, sm, s1] = lengths;
        let j = self.junctions(s0, s1, sm, thm);
        let (len0, len_m, len1) = (s0 * d, sm * d, s1 * d);
        let (ka, kb) = (j.ka / d, j.kb / d);

        let arc0 = ClothoidCurve::from_pose(start, (ka - start.kappa) / len0, len0);
        let mut begin = arc0.pose_end();
        begin.kappa = ka;
        let arc_m = ClothoidCurve::from_pose(begin, (kb - ka) / len_m, len_m);
        let mut begin = arc_m.pose_end();
        begin.kappa = kb;
        let arc1 = ClothoidCurve::from_pose(begin, (end.kappa - kb) / len1, len1);
        ClothoidChain::new([arc0, arc_m, arc1])
    }
}
