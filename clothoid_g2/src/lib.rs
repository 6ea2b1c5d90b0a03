//! Clothoid (Euler spiral) curves for path planning.
//!
//! - [`ClothoidCurve`]: a single arc with curvature linear in arc length,
//!   evaluated through generalized Fresnel integrals ([`fresnel`]).
//! - [`fit`]: G1 Hermite fitting between two oriented points and the forward
//!   fit from a start pose with curvature to a target point.
//! - [`G2Solve3Arc`]: three arcs joined with continuous curvature between two
//!   poses with curvature.
//! - [`Curve`]: capability set shared by single arcs and [`ClothoidChain`],
//!   with point projection ([`project`]) and intersection ([`intersect`]).
//!
//! ```
//! use clothoid_g2::ClothoidCurve;
//!
//! let a = ClothoidCurve::g1(0.0, 0.0, 0.0, 4.0, 2.0, 0.5).unwrap();
//! let p = a.project(1.0, 2.0);
//! assert!(p.distance > 0.0);
//! let b = ClothoidCurve::new(2.0, -1.0, 1.5, 0.0, 0.0, 5.0).unwrap();
//! assert_eq!(a.intersect(&b).len(), 1);
//! ```

pub mod clothoid;
pub mod config;
pub mod curve;
pub mod error;
pub mod fit;
pub mod fresnel;
pub mod g2;
pub mod intersect;
pub mod project;

pub use clothoid::{normalize_angle, ClothoidCurve, FlipAxis, Pose};
pub use config::{
    ForwardConfig, G1Config, G2Config, IntersectConfig, ProjectConfig, DEFAULT_TOLERANCE,
};
pub use curve::Curve;
pub use error::{ClothoidError, ClothoidResult};
pub use g2::{ClothoidChain, G2Solve3Arc};
pub use project::Projection;
