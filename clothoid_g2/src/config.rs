//! Tuning parameters for the iterative solvers and geometric searches.
//!
//! Every struct has a `Default` matching the documented values and
//! builder-style `with_*` setters.

use std::f64::consts::{FRAC_PI_4, PI};

/// Default convergence tolerance for the fitting solvers.
///
/// Written as a literal: `1e-10`, not a power of some base.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Configuration for the G1 Hermite solver.
#[derive(Clone, Debug, PartialEq)]
pub struct G1Config {
    /// Convergence tolerance on the residual of the unit-chord problem.
    /// Default: 1e-10
    pub tolerance: f64,

    /// Maximum number of Newton iterations.
    /// Default: 20
    pub max_iterations: usize,
}

impl Default for G1Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: 20,
        }
    }
}

impl G1Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }
}

/// Configuration for the forward solver.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardConfig {
    /// Tolerance on the start curvature residual (unit-chord units). Also
    /// used for the inner G1 solves.
    /// Default: 1e-10
    pub tolerance: f64,

    /// Maximum number of outer Newton iterations.
    /// Default: 50
    pub max_iterations: usize,

    /// Largest change of the unknown end angle in one Newton step (radians).
    /// Default: π/4
    pub max_step: f64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: 50,
            max_step: FRAC_PI_4,
        }
    }
}

impl ForwardConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder-style setter for the step limit.
    pub fn with_max_step(mut self, radians: f64) -> Self {
        self.max_step = radians;
        self
    }
}

/// Configuration for the three arc G2 solver.
#[derive(Clone, Debug, PartialEq)]
pub struct G2Config {
    /// Tolerance on the end point residual of the unit-chord problem.
    /// Default: 1e-10
    pub tolerance: f64,

    /// Maximum number of damped Newton iterations per seed.
    /// Default: 100
    pub max_iterations: usize,

    /// Smallest step fraction the damping may shrink to before giving up.
    /// Default: 1e-4
    pub min_damping: f64,
}

impl Default for G2Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: 100,
            min_damping: 1e-4,
        }
    }
}

impl G2Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder-style setter for the minimum damping factor.
    pub fn with_min_damping(mut self, factor: f64) -> Self {
        self.min_damping = factor;
        self
    }
}

/// Configuration for curve-curve intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectConfig {
    /// Distance below which two points count as coincident, relative to the
    /// size of the curves (scaled by `1 + extent`).
    /// Default: 1e-10
    pub tolerance: f64,

    /// Maximum subdivision depth.
    /// Default: 40
    pub max_depth: usize,

    /// Maximum Newton iterations when refining a candidate pair.
    /// Default: 20
    pub max_iterations: usize,

    /// Pieces turning less than this (radians) are refined instead of split.
    /// Default: 0.1
    pub flat_angle: f64,

    /// Parameter pairs closer than this on both curves are merged.
    /// Default: 1e-7
    pub merge_distance: f64,
}

impl Default for IntersectConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_depth: 40,
            max_iterations: 20,
            flat_angle: 0.1,
            merge_distance: 1e-7,
        }
    }
}

impl IntersectConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder-style setter for the subdivision depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder-style setter for maximum refinement iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder-style setter for the flatness threshold.
    pub fn with_flat_angle(mut self, radians: f64) -> Self {
        self.flat_angle = radians;
        self
    }

    /// Builder-style setter for the duplicate merge distance.
    pub fn with_merge_distance(mut self, distance: f64) -> Self {
        self.merge_distance = distance;
        self
    }
}

/// Configuration for point projection.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectConfig {
    /// Minimum number of coarse samples over the curve.
    /// Default: 16
    pub min_samples: usize,

    /// Upper bound on the number of coarse samples.
    /// Default: 4096
    pub max_samples: usize,

    /// Target heading change between neighbouring samples (radians).
    /// Default: π/16
    pub max_turn_per_sample: f64,

    /// Newton stops once the parameter update is below this, relative to
    /// `1 + L`.
    /// Default: 1e-12
    pub tolerance: f64,

    /// Maximum Newton (and fallback Brent) iterations per bracket.
    /// Default: 30
    pub max_iterations: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            min_samples: 16,
            max_samples: 4096,
            max_turn_per_sample: PI / 16.0,
            tolerance: 1e-12,
            max_iterations: 30,
        }
    }
}

impl ProjectConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the minimum sample count.
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples;
        self
    }

    /// Builder-style setter for the maximum sample count.
    pub fn with_max_samples(mut self, samples: usize) -> Self {
        self.max_samples = samples;
        self
    }

    /// Builder-style setter for the heading change between samples.
    pub fn with_max_turn_per_sample(mut self, radians: f64) -> Self {
        self.max_turn_per_sample = radians;
        self
    }

    /// Builder-style setter for the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }
}
