use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6, PI};

use approx::assert_abs_diff_eq;
use clothoid_g2::{
    fit, normalize_angle, ClothoidCurve, ClothoidError, Curve, FlipAxis, G1Config, G2Solve3Arc,
    Pose,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn standard_params() {
    let cases = [
        (0.0, 0.0, 0.0, 0.0, 0.0, 1.0),
        (1.0, 2.0, FRAC_PI_4, 0.0, 0.0, 2.0),
        (0.0, 0.0, 0.0, 0.1, 0.01, 5.0),
        (-1.0, -1.0, FRAC_PI_2, -0.1, 0.02, 3.0),
    ];
    for (x0, y0, t0, k0, kd, sf) in cases {
        let curve = ClothoidCurve::new(x0, y0, t0, k0, kd, sf).unwrap();
        assert_eq!(curve.x_begin(), x0);
        assert_eq!(curve.y_begin(), y0);
        assert_eq!(curve.theta_begin(), t0);
        assert_eq!(curve.kappa_begin(), k0);
        assert_eq!(curve.dk(), kd);
        assert_eq!(curve.length(), sf);
        assert_eq!(curve.parameters(), [x0, y0, t0, k0, kd, sf]);
        assert_abs_diff_eq!(curve.kappa_end(), k0 + kd * sf, epsilon = 1e-15);
    }
}

#[test]
fn g1_hermite() {
    init();
    let cases = [
        (0.0, 0.0, FRAC_PI_4, 1.0, 1.0, FRAC_PI_4),
        (1.0, 2.0, FRAC_PI_4, 0.0, 0.0, 0.0),
        (0.0, 0.0, 0.0, 0.1, 0.01, 5.0),
        (-1.0, -1.0, FRAC_PI_2, -0.1, 0.02, 1.0),
    ];
    for (x0, y0, t0, x1, y1, t1) in cases {
        let mut curve = ClothoidCurve::default();
        curve.build_g1(x0, y0, t0, x1, y1, t1).unwrap();
        assert_eq!(curve.x_begin(), x0);
        assert_eq!(curve.y_begin(), y0);
        assert_abs_diff_eq!(normalize_angle(curve.theta_begin() - t0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.x_end(), x1, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.y_end(), y1, epsilon = 1e-9);
        assert_abs_diff_eq!(normalize_angle(curve.theta_end() - t1), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn g1_tolerance_is_configurable() {
    init();
    let loose = G1Config::new().with_tolerance(1e-4);
    let tight = G1Config::new().with_tolerance(1e-13);
    let loose = fit::g1(0.0, 0.0, 0.0, 3.0, 1.0, 1.0, &loose).unwrap();
    let tight = fit::g1(0.0, 0.0, 0.0, 3.0, 1.0, 1.0, &tight).unwrap();
    assert_abs_diff_eq!(loose.length(), tight.length(), epsilon = 1e-2);
    assert_abs_diff_eq!(tight.y_end(), 1.0, epsilon = 1e-11);
}

#[test]
fn forward_build() {
    init();
    let mut curve = ClothoidCurve::default();
    curve.build_forward(0.0, 0.0, 0.0, 0.2, 5.0, 2.0).unwrap();
    assert_abs_diff_eq!(curve.x_end(), 5.0, epsilon = 1e-8);
    assert_abs_diff_eq!(curve.y_end(), 2.0, epsilon = 1e-8);
    assert_eq!(curve.kappa_begin(), 0.2);

    let before = curve;
    let err = curve.build_forward(5.0, 2.0, 0.0, 0.2, 5.0, 2.0).unwrap_err();
    assert!(matches!(err, ClothoidError::InvalidArgument(_)));
    assert_eq!(curve, before);
}

#[test]
fn serde_round_trip() {
    let curve = ClothoidCurve::new(1.0, 2.0, FRAC_PI_4, 0.1, 0.01, 5.0).unwrap();
    let json = serde_json::to_string(&curve).unwrap();
    let back: ClothoidCurve = serde_json::from_str(&json).unwrap();
    assert_eq!(back.parameters(), curve.parameters());
}

#[test]
fn translation() {
    let curve = ClothoidCurve::new(1.0, 2.0, 0.0, 0.0, 0.0, 1.0).unwrap();
    for (xoff, yoff) in [(0.0, 0.0), (1.0, 1.0), (-1.0, -1.0), (100.0, -50.0)] {
        let moved = curve.translated(xoff, yoff);
        assert_eq!(moved.x_begin(), 1.0 + xoff);
        assert_eq!(moved.y_begin(), 2.0 + yoff);
        assert_eq!(moved.theta_begin(), 0.0);
        assert_eq!(moved.length(), 1.0);
    }
}

#[test]
fn rotation() {
    let curve = ClothoidCurve::new(1.0, 2.0, 0.0, 0.0, 0.0, 1.0).unwrap();
    for (angle, x, y) in [
        (0.0, 1.0, 2.0),
        (FRAC_PI_2, -2.0, 1.0),
        (-FRAC_PI_2, 2.0, -1.0),
        (PI, -1.0, -2.0),
    ] {
        let rotated = curve.rotated(angle, 0.0, 0.0);
        assert_abs_diff_eq!(rotated.x_begin(), x, epsilon = 1e-12);
        assert_abs_diff_eq!(rotated.y_begin(), y, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(rotated.theta_begin() - angle), 0.0, epsilon = 1e-12);
        assert_eq!(rotated.length(), 1.0);
    }
}

#[test]
fn flip() {
    let curve = ClothoidCurve::new(1.0, 2.0, FRAC_PI_4, 0.0, 0.0, 1.0).unwrap();
    for (axis, x, y, theta) in [
        (FlipAxis::X, 1.0, -2.0, -FRAC_PI_4),
        (FlipAxis::Y, -1.0, 2.0, PI - FRAC_PI_4),
        (FlipAxis::Start, 1.0, 2.0, FRAC_PI_4),
    ] {
        let flipped = curve.flipped(axis);
        assert_eq!(flipped.x_begin(), x);
        assert_eq!(flipped.y_begin(), y);
        assert_abs_diff_eq!(normalize_angle(flipped.theta_begin() - theta), 0.0, epsilon = 1e-12);
        assert_eq!(flipped.kappa_begin(), -curve.kappa_begin());
        assert_eq!(flipped.dk(), -curve.dk());
        assert_eq!(flipped.length(), curve.length());
    }
}

#[test]
fn scaling() {
    let curve = ClothoidCurve::new(1.0, 2.0, 0.0, 0.3, 0.1, 1.0).unwrap();
    for factor in [0.5, 2.0, -1.0] {
        let scaled = curve.scaled_about(factor, 0.0, 0.0).unwrap();
        assert_abs_diff_eq!(scaled.x_begin(), curve.x_begin() * factor, epsilon = 1e-15);
        assert_abs_diff_eq!(scaled.y_begin(), curve.y_begin() * factor, epsilon = 1e-15);
        // a negative factor reflects the curve, the length stays positive
        assert_abs_diff_eq!(scaled.length(), curve.length() * factor.abs(), epsilon = 1e-15);
        let kappa = curve.kappa_begin() / factor.abs();
        assert_abs_diff_eq!(scaled.kappa_begin(), kappa, epsilon = 1e-15);
        assert_abs_diff_eq!(scaled.dk(), curve.dk() / (factor * factor), epsilon = 1e-15);
    }
    assert!(curve.scaled(0.0).is_err());
}

#[test]
fn trim() {
    let curve = ClothoidCurve::new(1.0, 2.0, 0.0, 0.2, 0.4, 1.0).unwrap();
    for (a, b) in [(0.0, 0.5), (0.25, 0.75), (0.0, 1.0)] {
        let trimmed = curve.trimmed(a, b).unwrap();
        assert_abs_diff_eq!(trimmed.length(), b - a, epsilon = 1e-15);
        assert_abs_diff_eq!(trimmed.x_begin(), curve.x(a), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.y_begin(), curve.y(a), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.kappa_begin(), curve.theta_d(a), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.theta_begin(), curve.theta(a), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.x_end(), curve.x(b), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.y_end(), curve.y(b), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.kappa_end(), curve.theta_d(b), epsilon = 1e-12);
        assert_abs_diff_eq!(trimmed.theta_end(), curve.theta(b), epsilon = 1e-12);
        assert_eq!(trimmed.dk(), curve.dk());
    }
}

#[test]
fn projection() {
    init();
    let curve = ClothoidCurve::new(0.0, 0.0, 0.0, 0.1, 0.01, 5.0).unwrap();
    for (x, y) in [(1.0, 2.0), (0.5, 0.5), (-1.0, -2.0)] {
        let p = curve.project(x, y);
        assert!((0.0..=curve.length()).contains(&p.s));
        assert!(p.distance >= 0.0);
        assert_eq!(curve.closest_point(x, y), [p.x, p.y]);
        assert_eq!(curve.closest_point_arc_length(x, y), p.s);
        assert_eq!(curve.distance(x, y), p.distance);
        // no sample of the curve is closer
        for [u, v] in curve.sample_points(200) {
            assert!((u - x).hypot(v - y) >= p.distance - 1e-12);
        }
    }
    // (-1, -2) is behind the start
    assert_eq!(curve.closest_point_arc_length(-1.0, -2.0), 0.0);
}

type Hermite = (f64, f64, f64, f64, f64, f64);

fn g1_pair(a: Hermite, b: Hermite) -> (ClothoidCurve, ClothoidCurve) {
    let first = ClothoidCurve::g1(a.0, a.1, a.2, a.3, a.4, a.5).unwrap();
    let second = ClothoidCurve::g1(b.0, b.1, b.2, b.3, b.4, b.5).unwrap();
    (first, second)
}

#[test]
fn intersections() {
    init();
    let a = (0.0, 0.0, FRAC_PI_4, 1.0, 1.0, 0.0);
    let cases = [
        ((0.0, 0.0, PI, 1.0, 0.95, -FRAC_PI_4), 2),
        ((1.0, 0.0, PI, 1.0, 2.0, -FRAC_PI_4), 1),
        ((1.0, 0.0, PI, 0.5, 0.5, -FRAC_PI_4), 0),
    ];
    for (b, expected) in cases {
        let (first, second) = g1_pair(a, b);
        let pairs = first.intersect(&second);
        assert_eq!(pairs.len(), expected, "{first} x {second}");
        for &(sa, sb) in &pairs {
            assert_abs_diff_eq!(first.x(sa), second.x(sb), epsilon = 1e-8);
            assert_abs_diff_eq!(first.y(sa), second.y(sb), epsilon = 1e-8);
        }
        let points = first.intersection_points(&second);
        assert_eq!(points.len(), expected);
        for [x, y] in points {
            assert_abs_diff_eq!(second.distance(x, y), 0.0, epsilon = 1e-8);
        }
    }
}

#[test]
fn solve_g2() {
    init();
    let cases = [
        (Pose::new(0.0, 0.0, 0.0, 0.0), Pose::new(1.0, 1.0, FRAC_PI_4, 0.1)),
        (
            Pose::new(1.0, 2.0, FRAC_PI_6, 0.2),
            Pose::new(-1.0, -2.0, -FRAC_PI_6, -0.2),
        ),
    ];
    for (start, end) in cases {
        let mut solver = G2Solve3Arc::new();
        assert!(matches!(solver.chain(), Err(ClothoidError::InvalidState(_))));
        solver.build(start, end, 0.0, 0.0).unwrap();
        let chain = solver.chain().unwrap();
        assert_eq!(chain.arcs().len(), 3);
        assert_abs_diff_eq!(
            solver.total_length().unwrap(),
            solver.s0().unwrap() + solver.sm().unwrap() + solver.s1().unwrap(),
            epsilon = 1e-12
        );
        assert_eq!(solver.arc0().unwrap(), chain.arc0());
        let last = solver.arc1().unwrap().pose_end();
        assert_abs_diff_eq!(last.x, end.x, epsilon = 1e-8);
        assert_abs_diff_eq!(last.y, end.y, epsilon = 1e-8);
        assert_abs_diff_eq!(last.kappa, end.kappa, epsilon = 1e-8);

        // the chain is a curve on its own
        let middle = Curve::evaluate(chain, chain.s0() + 0.5 * chain.sm());
        let expected = solver.arc_middle().unwrap().pose(0.5 * chain.sm());
        assert_abs_diff_eq!(middle.x, expected.x, epsilon = 1e-12);
        assert_abs_diff_eq!(middle.y, expected.y, epsilon = 1e-12);
        assert_abs_diff_eq!(middle.kappa, expected.kappa, epsilon = 1e-12);
        let p = Curve::project(chain, end.x, end.y);
        assert_abs_diff_eq!(p.distance, 0.0, epsilon = 1e-8);
    }
}
