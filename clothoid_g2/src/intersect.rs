//! Curve-curve intersection by bounding disk subdivision and Newton refinement.
//!
//! A piece `[lo, hi]` of a curve lies inside the disk centred at its midpoint
//! with radius `(hi - lo) / 2`, since no point is further along the curve than
//! half the piece length. Pairs of pieces whose disks are apart are dropped and
//! pieces that still turn more than `flat_angle` are halved.
//!
//! A pair of flat pieces is refined with Newton on `P_a(s_a) - P_b(s_b) = 0`
//! only once their heading cones are disjoint modulo `pi`: two such pieces
//! cross at most once. Pairs whose cones overlap are either the same curve
//! traced twice, which reports nothing, or are halved again.

use std::f64::consts::PI;
use std::ops::Range;

use log::{debug, trace};

use crate::config::IntersectConfig;
use crate::curve::Curve;

/// Parameter pairs `(s_a, s_b)` where `a` and `b` cross, in discovery order.
///
/// Parameters are global arc lengths in `[0, length()]`. When both operands
/// have identical arcs the call is a self-intersection query: only pairs with
/// `s_a < s_b` enclosing more than `pi` of turning are reported, so the trivial
/// matches `s_a == s_b` never appear. Overlapping stretches, where both curves
/// trace the same path, are not reported.
pub fn intersect<A, B>(a: &A, b: &B, config: &IntersectConfig) -> Vec<(f64, f64)>
where
    A: Curve + ?Sized,
    B: Curve + ?Sized,
{
    let len_a = a.length();
    let len_b = b.length();
    let self_mode = a.arcs() == b.arcs();
    let extent = 1.0 + len_a.max(len_b);
    let tolerance = config.tolerance * extent;

    if !(len_a > 0.0) || !(len_b > 0.0) {
        if self_mode {
            return Vec::new();
        }
        return point_intersection(a, b, tolerance);
    }

    let mut search = Search {
        a,
        b,
        config,
        tolerance,
        resolution: config.merge_distance * extent,
        self_mode,
        found: Vec::new(),
    };
    search.visit(0.0..len_a, 0.0..len_b, 0);
    debug!(
        "intersect: {} crossings{}",
        search.found.len(),
        if self_mode { " (self)" } else { "" }
    );
    search.found
}

/// At least one operand is a single point.
fn point_intersection<A, B>(a: &A, b: &B, tolerance: f64) -> Vec<(f64, f64)>
where
    A: Curve + ?Sized,
    B: Curve + ?Sized,
{
    if !(a.length() > 0.0) {
        let p = a.evaluate(0.0);
        let q = b.project(p.x, p.y);
        if q.distance <= tolerance {
            return vec![(0.0, q.s)];
        }
    } else {
        let q = b.evaluate(0.0);
        let p = a.project(q.x, q.y);
        if p.distance <= tolerance {
            return vec![(p.s, 0.0)];
        }
    }
    Vec::new()
}

fn mid(range: &Range<f64>) -> f64 {
    0.5 * (range.start + range.end)
}

fn halves(range: &Range<f64>) -> [Range<f64>; 2] {
    let m = mid(range);
    [range.start..m, m..range.end]
}

fn width(range: &Range<f64>) -> f64 {
    range.end - range.start
}

/// Heading at the middle of `range` and the largest deviation from it.
fn heading_cone<C: Curve + ?Sized>(curve: &C, range: &Range<f64>) -> (f64, f64) {
    let m = mid(range);
    let spread = curve
        .total_turning(range.start..m)
        .max(curve.total_turning(m..range.end));
    (curve.evaluate(m).theta, spread)
}

/// Angle difference reduced to `[-pi/2, pi/2]`; lines are undirected here.
fn undirected(angle: f64) -> f64 {
    angle - PI * (angle / PI).round()
}

/// Outcome of one Newton run.
enum Refined {
    Root(f64, f64),
    /// converged to a crossing of the extended curves
    Outside,
    /// no convergence, or a singular Jacobian on the way
    Failed,
}

struct Search<'a, A: ?Sized, B: ?Sized> {
    a: &'a A,
    b: &'a B,
    config: &'a IntersectConfig,
    tolerance: f64,
    /// pieces shorter than this are not split any further
    resolution: f64,
    self_mode: bool,
    found: Vec<(f64, f64)>,
}

impl<A, B> Search<'_, A, B>
where
    A: Curve + ?Sized,
    B: Curve + ?Sized,
{
    fn visit(&mut self, ra: Range<f64>, rb: Range<f64>, depth: usize) {
        if self.self_mode {
            // only s_a < s_b is searched
            if ra.start >= rb.end {
                return;
            }
            // a loop closing inside the span must turn by more than pi
            let span = ra.start.min(rb.start)..ra.end.max(rb.end);
            if self.a.total_turning(span) <= PI {
                return;
            }
        }
        let (ma, mb) = (mid(&ra), mid(&rb));
        let pa = self.a.evaluate(ma);
        let pb = self.b.evaluate(mb);
        let gap = (pa.x - pb.x).hypot(pa.y - pb.y);
        if gap > 0.5 * width(&ra) + 0.5 * width(&rb) + self.tolerance {
            return;
        }

        let flat_a = self.a.total_turning(ra.clone()) <= self.config.flat_angle;
        let flat_b = self.b.total_turning(rb.clone()) <= self.config.flat_angle;
        let last = depth >= self.config.max_depth;
        if !(flat_a && flat_b) && !last {
            self.split(ra, rb, depth, flat_a, flat_b);
            return;
        }

        let (theta_a, spread_a) = heading_cone(self.a, &ra);
        let (theta_b, spread_b) = heading_cone(self.b, &rb);
        let single = undirected(theta_a - theta_b).abs() > spread_a + spread_b;
        let small = width(&ra).max(width(&rb)) <= self.resolution;
        if !(single || small || last) {
            if self.coincident(&ra, mb) {
                trace!("intersect: overlap at ({ma}, {mb})");
                return;
            }
            self.split(ra, rb, depth, false, false);
            return;
        }

        let (sa, sb) = self.chord_guess(&ra, &rb);
        match self.refine(sa, sb) {
            Refined::Root(sa, sb) => self.record(sa, sb),
            Refined::Outside => {}
            Refined::Failed if !(small || last) => self.split(ra, rb, depth, false, false),
            // tangential contact resolved down to the grid
            Refined::Failed if gap <= self.tolerance => self.record(ma, mb),
            Refined::Failed => {}
        }
    }

    fn split(
        &mut self,
        ra: Range<f64>,
        rb: Range<f64>,
        depth: usize,
        flat_a: bool,
        flat_b: bool,
    ) {
        match (flat_a, flat_b) {
            (true, false) => {
                for rb in halves(&rb) {
                    self.visit(ra.clone(), rb, depth + 1);
                }
            }
            (false, true) => {
                for ra in halves(&ra) {
                    self.visit(ra, rb.clone(), depth + 1);
                }
            }
            _ => {
                for ra in halves(&ra) {
                    for rb in halves(&rb) {
                        self.visit(ra.clone(), rb, depth + 1);
                    }
                }
            }
        }
    }

    /// Parameters where the two chords cross, clamped to the pieces; the
    /// midpoints for parallel chords.
    fn chord_guess(&self, ra: &Range<f64>, rb: &Range<f64>) -> (f64, f64) {
        let (a0, a1) = (self.a.evaluate(ra.start), self.a.evaluate(ra.end));
        let (b0, b1) = (self.b.evaluate(rb.start), self.b.evaluate(rb.end));
        let (dax, day) = (a1.x - a0.x, a1.y - a0.y);
        let (dbx, dby) = (b1.x - b0.x, b1.y - b0.y);
        let den = dax * dby - day * dbx;
        if den.abs() <= f64::MIN_POSITIVE {
            return (mid(ra), mid(rb));
        }
        let (ex, ey) = (b0.x - a0.x, b0.y - a0.y);
        let t = ((ex * dby - ey * dbx) / den).clamp(0.0, 1.0);
        let u = ((ex * day - ey * dax) / den).clamp(0.0, 1.0);
        (ra.start + t * width(ra), rb.start + u * width(rb))
    }

    /// Newton on `P_a(s_a) - P_b(s_b)` with Jacobian `[T_a, -T_b]`.
    fn refine(&self, mut sa: f64, mut sb: f64) -> Refined {
        let len_a = self.a.length();
        let len_b = self.b.length();
        let slack = self.config.merge_distance;
        for iter in 0..=self.config.max_iterations {
            let pa = self.a.evaluate(sa);
            let pb = self.b.evaluate(sb);
            let fx = pa.x - pb.x;
            let fy = pa.y - pb.y;
            if fx.hypot(fy) <= self.tolerance {
                trace!("intersect: root ({sa}, {sb}) after {iter} iterations");
                let inside = (-slack..=len_a + slack).contains(&sa)
                    && (-slack..=len_b + slack).contains(&sb);
                return if inside {
                    Refined::Root(sa.clamp(0.0, len_a), sb.clamp(0.0, len_b))
                } else {
                    Refined::Outside
                };
            }
            if iter == self.config.max_iterations {
                break;
            }
            let [ta_x, ta_y] = pa.tangent();
            let [tb_x, tb_y] = pb.tangent();
            // sin of the crossing angle
            let det = tb_x * ta_y - ta_x * tb_y;
            if det.abs() < 1e-14 {
                return Refined::Failed;
            }
            sa += (fx * tb_y - fy * tb_x) / det;
            sb += (fx * ta_y - fy * ta_x) / det;
            if !sa.is_finite() || !sb.is_finite() {
                return Refined::Failed;
            }
        }
        Refined::Failed
    }

    /// Whether `b` near `sb` is the same clothoid as `a` on `ra`, possibly
    /// traced in the opposite direction.
    fn coincident(&self, ra: &Range<f64>, sb: f64) -> bool {
        let pb = self.b.evaluate(sb);
        // foot of pb on the piece of a
        let mut sa = mid(ra);
        for _ in 0..self.config.max_iterations {
            let pa = self.a.evaluate(sa);
            let [tx, ty] = pa.tangent();
            let (dx, dy) = (pa.x - pb.x, pa.y - pb.y);
            let g = dx * tx + dy * ty;
            let dg = 1.0 + pa.kappa * (dy * tx - dx * ty);
            if !(dg > 0.0) {
                return false;
            }
            let next = (sa - g / dg).clamp(ra.start, ra.end);
            let step = (next - sa).abs();
            sa = next;
            if step <= self.tolerance {
                break;
            }
        }
        let pa = self.a.evaluate(sa);
        if (pa.x - pb.x).hypot(pa.y - pb.y) > self.tolerance {
            return false;
        }
        let turn = pa.theta - pb.theta;
        if turn.sin().abs() > 1e-8 {
            return false;
        }
        let sign = turn.cos().signum();
        let dk_a = self.sharpness_a(sa);
        let dk_b = self.sharpness_b(sb);
        (pa.kappa - sign * pb.kappa).abs() <= 1e-8 * (1.0 + pa.kappa.abs())
            && (dk_a - dk_b).abs() <= 1e-8 * (1.0 + dk_a.abs())
    }

    fn sharpness_a(&self, s: f64) -> f64 {
        let (i, _) = self.a.locate(s);
        self.a.arcs().get(i).map_or(0.0, |arc| arc.dk())
    }

    fn sharpness_b(&self, s: f64) -> f64 {
        let (i, _) = self.b.locate(s);
        self.b.arcs().get(i).map_or(0.0, |arc| arc.dk())
    }

    fn record(&mut self, mut sa: f64, mut sb: f64) {
        let merge = self.config.merge_distance;
        if self.self_mode {
            if sa > sb {
                std::mem::swap(&mut sa, &mut sb);
            }
            if sb - sa <= merge || self.a.total_turning(sa..sb) <= PI {
                return;
            }
        }
        // the same crossing reached from neighbouring pieces
        let duplicate = self.found.iter().any(|&(fa, fb)| {
            if (fa - sa).abs() <= merge && (fb - sb).abs() <= merge {
                return true;
            }
            let pa = self.a.evaluate(0.5 * (fa + sa));
            let pb = self.b.evaluate(0.5 * (fb + sb));
            (pa.x - pb.x).hypot(pa.y - pb.y) <= self.tolerance
        });
        if !duplicate {
            self.found.push((sa, sb));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clothoid::ClothoidCurve;
    use crate::g2::ClothoidChain;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn assert_crossings<A: Curve, B: Curve>(a: &A, b: &B, found: &[(f64, f64)]) {
        for &(sa, sb) in found {
            let pa = a.evaluate(sa);
            let pb = b.evaluate(sb);
            assert_abs_diff_eq!(pa.x, pb.x, epsilon = 1e-8);
            assert_abs_diff_eq!(pa.y, pb.y, epsilon = 1e-8);
            assert!((0.0..=a.length()).contains(&sa));
            assert!((0.0..=b.length()).contains(&sb));
        }
    }

    #[test]
    fn crossing_lines() {
        init();
        let a = ClothoidCurve::new(0.0, 0.0, 0.0, 0.0, 0.0, 4.0).unwrap();
        let b = ClothoidCurve::new(1.0, -1.0, FRAC_PI_2, 0.0, 0.0, 3.0).unwrap();
        let found = intersect(&a, &b, &IntersectConfig::default());
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].0, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(found[0].1, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn circle_and_line_cross_twice() {
        init();
        // full circle of radius 1 around (0, 1)
        let circle = ClothoidCurve::new(0.0, 0.0, 0.0, 1.0, 0.0, 2.0 * PI).unwrap();
        let line = ClothoidCurve::new(-2.0, 1.0, 0.0, 0.0, 0.0, 4.0).unwrap();
        let found = intersect(&circle, &line, &IntersectConfig::default());
        assert_eq!(found.len(), 2);
        assert_crossings(&circle, &line, &found);
        let mut sb: Vec<f64> = found.iter().map(|&(_, sb)| sb).collect();
        sb.sort_by(f64::total_cmp);
        assert_abs_diff_eq!(sb[0], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(sb[1], 3.0, epsilon = 1e-8);
    }

    #[test]
    fn shallow_double_crossing() {
        init();
        // flat arc bottoming out at s = 5, line just above its lowest point
        let arc = ClothoidCurve::new(0.0, 0.0, -0.05, 0.01, 0.0, 10.0).unwrap();
        let apex = arc.pose(5.0);
        let line = ClothoidCurve::new(-1.0, apex.y + 0.02, 0.0, 0.0, 0.0, 12.0).unwrap();
        let mut found = intersect(&arc, &line, &IntersectConfig::default());
        assert_eq!(found.len(), 2);
        assert_crossings(&arc, &line, &found);
        found.sort_by(|p, q| p.0.total_cmp(&q.0));
        assert_abs_diff_eq!(found[0].0, 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(found[1].0, 7.0, epsilon = 1e-3);
    }

    #[test]
    fn tangent_touch_once() {
        init();
        let arc = ClothoidCurve::new(0.0, 0.0, -0.05, 0.01, 0.0, 10.0).unwrap();
        let apex = arc.pose(5.0);
        let line = ClothoidCurve::new(-1.0, apex.y, 0.0, 0.0, 0.0, 12.0).unwrap();
        let found = intersect(&arc, &line, &IntersectConfig::default());
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].0, 5.0, epsilon = 1e-3);
        assert_abs_diff_eq!(found[0].1, apex.x + 1.0, epsilon = 1e-3);
    }

    #[test]
    fn overlapping_paths_have_no_crossing() {
        init();
        let a = ClothoidCurve::new(0.0, 0.0, 0.3, 0.0, 0.0, 10.0).unwrap();
        let b = ClothoidCurve::new(2.0 * 0.3f64.cos(), 2.0 * 0.3f64.sin(), 0.3, 0.0, 0.0, 10.0)
            .unwrap();
        assert!(intersect(&a, &b, &IntersectConfig::default()).is_empty());

        // the same circle entered at another point
        let circle = ClothoidCurve::new(0.0, 0.0, 0.0, 0.5, 0.0, 6.0).unwrap();
        let start = circle.pose(2.0);
        let shifted = ClothoidCurve::new(start.x, start.y, start.theta, 0.5, 0.0, 6.0).unwrap();
        assert!(intersect(&circle, &shifted, &IntersectConfig::default()).is_empty());
    }

    #[test]
    fn apart_curves() {
        let a = ClothoidCurve::new(0.0, 0.0, 0.0, 0.3, 0.1, 5.0).unwrap();
        let b = a.translated(0.0, 100.0);
        assert!(intersect(&a, &b, &IntersectConfig::default()).is_empty());
    }

    #[test]
    fn touching_ends() {
        init();
        let a = ClothoidCurve::new(0.0, 0.0, 0.0, 0.0, 0.0, 2.0).unwrap();
        let b = ClothoidCurve::new(2.0, 0.0, 1.0, 0.5, 0.0, 2.0).unwrap();
        let found = intersect(&a, &b, &IntersectConfig::default());
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].0, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(found[0].1, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_length_operand() {
        let line = ClothoidCurve::new(0.0, 0.0, 0.0, 0.0, 0.0, 4.0).unwrap();
        let on = ClothoidCurve::new(1.5, 0.0, 2.0, 0.0, 0.0, 0.0).unwrap();
        let off = ClothoidCurve::new(1.5, 0.5, 2.0, 0.0, 0.0, 0.0).unwrap();
        let found = intersect(&on, &line, &IntersectConfig::default());
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].1, 1.5, epsilon = 1e-9);
        let found = intersect(&line, &on, &IntersectConfig::default());
        assert_abs_diff_eq!(found[0].0, 1.5, epsilon = 1e-9);
        assert!(intersect(&off, &line, &IntersectConfig::default()).is_empty());
        assert!(intersect(&on, &on, &IntersectConfig::default()).is_empty());
    }

    #[test]
    fn spiral_does_not_cross_itself() {
        init();
        // monotonic curvature, nested osculating circles
        let spiral = ClothoidCurve::new(0.0, 0.0, 0.0, 0.0, 1.0, 12.0).unwrap();
        assert!(intersect(&spiral, &spiral, &IntersectConfig::default()).is_empty());
    }

    #[test]
    fn loop_crosses_itself_once() {
        init();
        let lead = ClothoidCurve::new(0.0, 0.0, 0.0, 0.0, 0.0, 5.0).unwrap();
        let turn = ClothoidCurve::new(5.0, 0.0, 0.0, 1.0, 0.0, 1.5 * PI).unwrap();
        let mut begin = turn.pose_end();
        begin.kappa = 0.0;
        let tail = ClothoidCurve::new(begin.x, begin.y, begin.theta, 0.0, 0.0, 3.0).unwrap();
        let chain = ClothoidChain::new([lead, turn, tail]).unwrap();

        let found = intersect(&chain, &chain, &IntersectConfig::default());
        assert_eq!(found.len(), 1);
        let (sa, sb) = found[0];
        assert_abs_diff_eq!(sa, 4.0, epsilon = 1e-8);
        assert_abs_diff_eq!(sb, 5.0 + 1.5 * PI + 1.0, epsilon = 1e-8);
        assert_crossings(&chain, &chain, &found);
    }
}
