//! Capability set shared by a single clothoid and a chain of clothoids.

use std::ops::Range;

use crate::clothoid::{ClothoidCurve, Pose};
use crate::config::{IntersectConfig, ProjectConfig};
use crate::intersect::intersect;
use crate::project::{project, Projection};

/// A curve made of consecutive clothoid arcs, parameterized by the global arc
/// length `s ∈ [0, length()]`.
///
/// Implementors only provide [`Curve::arcs`], which must not be empty; the
/// projector and the intersection finder are written once against this trait.
pub trait Curve {
    /// The arcs in order, each starting where the previous one ends.
    fn arcs(&self) -> &[ClothoidCurve];

    fn length(&self) -> f64 {
        self.arcs().iter().map(|arc| arc.length()).sum()
    }

    /// Index of the arc holding global parameter `s` and the local parameter on
    /// it. Parameters outside `[0, length()]` extrapolate the first or last arc.
    fn locate(&self, s: f64) -> (usize, f64) {
        let arcs = self.arcs();
        let mut start = 0.0;
        for (i, arc) in arcs.iter().enumerate() {
            let end = start + arc.length();
            if s < end || i + 1 == arcs.len() {
                return (i, s - start);
            }
            start = end;
        }
        (0, s)
    }

    fn evaluate(&self, s: f64) -> Pose {
        let (i, local) = self.locate(s);
        self.arcs()
            .get(i)
            .map(|arc| arc.pose(local))
            .unwrap_or_default()
    }

    /// `∫|kappa| ds` over the part of `range` inside the curve.
    fn total_turning(&self, range: Range<f64>) -> f64 {
        let mut start = 0.0;
        let mut turning = 0.0;
        for arc in self.arcs() {
            let end = start + arc.length();
            let lo = range.start.max(start);
            let hi = range.end.min(end);
            if hi > lo {
                turning += arc.total_turning(lo - start, hi - start);
            }
            start = end;
        }
        turning
    }

    fn project(&self, qx: f64, qy: f64) -> Projection {
        project(self, qx, qy, &ProjectConfig::default())
    }

    /// Global parameter pairs `(s_self, s_other)` where the curves cross.
    fn intersect(&self, other: &dyn Curve) -> Vec<(f64, f64)> {
        intersect(self, other, &IntersectConfig::default())
    }
}
