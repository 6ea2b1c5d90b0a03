//! Fresnel integrals and the generalized Fresnel moments used to turn arc length,
//! curvature and curvature rate into cartesian coordinates.
//!
//! The kernels use `libm` so results are reproducible across platforms.

use libm::{cos, floor, sin, sqrt};
use std::f64::consts::{FRAC_1_PI, FRAC_2_SQRT_PI, FRAC_PI_2, PI};

/// Below this |a| the moments come from a Taylor series in `a`.
const A_THRESHOLD: f64 = 0.01;
/// Number of terms of that series.
const A_SERIES_SIZE: usize = 3;
/// Moments needed by the small `a` series for up to three output moments.
const NKK_MAX: usize = 3 + 4 * A_SERIES_SIZE + 2;

/*
Rational approximation coefficients for the auxiliary functions f and g of the
Fresnel integrals, from:

Atlas for computing mathematical functions : an illustrated guide for
practitioners, with programs in C and Mathematica / William J. Thompson.
New York : Wiley, c1997.
*/
#[allow(clippy::excessive_precision)]
const FRN: [f64; 11] = [
    0.49999988085884732562,
    1.3511177791210715095,
    1.3175407836168659241,
    1.1861149300293854992,
    0.7709627298888346769,
    0.4173874338787963957,
    0.19044202705272903923,
    0.06655998896627697537,
    0.022789258616785717418,
    0.0040116689358507943804,
    0.0012192036851249883877,
];

#[allow(clippy::excessive_precision)]
const FRD: [f64; 12] = [
    1.0,
    2.7022305772400260215,
    4.2059268151438492767,
    4.5221882840107715516,
    3.7240352281630359588,
    2.4589286254678152943,
    1.3125491629443702962,
    0.5997685720120932908,
    0.20907680750378849485,
    0.07159621634657901433,
    0.012602969513793714191,
    0.0038302423512931250065,
];

#[allow(clippy::excessive_precision)]
const GN: [f64; 11] = [
    0.50000014392706344801,
    0.032346434925349128728,
    0.17619325157863254363,
    0.038606273170706486252,
    0.023693692309257725361,
    0.007092018516845033662,
    0.0012492123212412087428,
    0.00044023040894778468486,
    -8.80266827476172521e-6,
    -1.4033554916580018648e-8,
    2.3509221782155474353e-10,
];

#[allow(clippy::excessive_precision)]
const GD: [f64; 12] = [
    1.0,
    2.0646987497019598937,
    2.9109311766948031235,
    2.6561936751333032911,
    2.0195563983177268073,
    1.1167891129189363902,
    0.57267874755973172715,
    0.19408481169593070798,
    0.07634808341431248904,
    0.011573247407207865977,
    0.0044099273693067311209,
    -0.00009070958410429993314,
];

/// Fresnel integrals `C(y) = ∫₀ʸ cos(π/2·t²) dt` and `S(y) = ∫₀ʸ sin(π/2·t²) dt`.
///
/// | y   | C(y)       | S(y)       |
/// | :-: | :--------: | :--------: |
/// | 0.0 | 0.00000000 | 0.00000000 |
/// | 0.5 | 0.49234423 | 0.06473243 |
/// | 1.0 | 0.77989340 | 0.43825915 |
/// | 1.5 | 0.44526118 | 0.69750496 |
/// | 2.0 | 0.48825341 | 0.34341568 |
/// | 2.5 | 0.45741301 | 0.61918176 |
pub fn fresnel_cs(y: f64) -> (f64, f64) {
    let eps = 1E-15;
    let x = y.abs();

    let mut c_value: f64;
    let mut s_value: f64;

    if x < 1.0 {
        let s = FRAC_PI_2 * (x * x);
        let t = -s * s;

        // Cosine integral series
        {
            let mut twofn = 0.0;
            let mut fact = 1.0;
            let mut denterm = 1.0;
            let mut numterm = 1.0;
            let mut sum: f64 = 1.0;
            loop {
                twofn += 2.0;
                fact *= twofn * (twofn - 1.0);
                denterm += 4.0;
                numterm *= t;
                let term = numterm / (fact * denterm);
                sum += term;
                if term.abs() <= eps * sum.abs() {
                    break;
                }
            }
            c_value = x * sum;
        }

        // Sine integral series
        {
            let mut twofn = 1.0;
            let mut fact = 1.0;
            let mut denterm = 3.0;
            let mut numterm = 1.0;
            let mut sum: f64 = numterm / denterm;
            loop {
                twofn += 2.0;
                fact *= twofn * (twofn - 1.0);
                denterm += 4.0;
                numterm *= t;
                let term = numterm / (fact * denterm);
                sum += term;
                if term.abs() <= eps * sum.abs() {
                    break;
                }
            }
            s_value = FRAC_PI_2 * sum * (x * x * x);
        }
    } else if x < 6.0 {
        // Rational approximation for f
        let f = {
            let mut sumn = 0.0;
            let mut sumd = FRD[11];
            for k in (0..=10).rev() {
                sumn = FRN[k] + x * sumn;
                sumd = FRD[k] + x * sumd;
            }
            sumn / sumd
        };

        // Rational approximation for g
        let g = {
            let mut sumn = 0.0;
            let mut sumd = GD[11];
            for k in (0..=10).rev() {
                sumn = GN[k] + x * sumn;
                sumd = GD[k] + x * sumd;
            }
            sumn / sumd
        };

        let u_value = FRAC_PI_2 * (x * x);
        let sin_u = sin(u_value);
        let cos_u = cos(u_value);
        c_value = 0.5 + f * sin_u - g * cos_u;
        s_value = 0.5 - f * cos_u - g * sin_u;
    } else {
        // x >= 6; asymptotic expansions for f and g
        let s = PI * x * x;
        let t = -1.0 / (s * s);
        let eps10 = 0.1 * eps;

        // Expansion for f
        let mut numterm = -1.0;
        let mut term = 1.0;
        let mut sum = 1.0;
        loop {
            numterm += 4.0;
            term *= numterm * (numterm - 2.0) * t;
            sum += term;
            if term.abs() <= eps10 * sum.abs() {
                break;
            }
        }
        let f = sum / (PI * x);

        // Expansion for g
        numterm = -1.0;
        term = 1.0;
        sum = 1.0;
        loop {
            numterm += 4.0;
            term *= numterm * (numterm + 2.0) * t;
            sum += term;
            if term.abs() <= eps10 * sum.abs() {
                break;
            }
        }
        let g0 = PI * x;
        let g = sum / (g0 * g0 * x);

        let u_value = FRAC_PI_2 * (x * x);
        let sin_u = sin(u_value);
        let cos_u = cos(u_value);
        c_value = 0.5 + f * sin_u - g * cos_u;
        s_value = 0.5 - f * cos_u - g * sin_u;
    }
    if y < 0.0 {
        c_value = -c_value;
        s_value = -s_value;
    }

    (c_value, s_value)
}

/// Fresnel integrals together with the moments `∫₀ᵗ u^k cos(π/2·u²) du`
/// (and the sine counterpart) for `k < nk`, `nk <= 3`.
fn fresnel_cs_moments(nk: usize, t: f64) -> ([f64; 3], [f64; 3]) {
    let mut c = [0.0; 3];
    let mut s = [0.0; 3];
    (c[0], s[0]) = fresnel_cs(t);
    if nk > 1 {
        let tt = FRAC_PI_2 * (t * t);
        let ss = sin(tt);
        let cc = cos(tt);
        c[1] = ss * FRAC_1_PI;
        s[1] = (1.0 - cc) * FRAC_1_PI;
        if nk > 2 {
            c[2] = (t * ss - s[0]) * FRAC_1_PI;
            s[2] = (c[0] - t * cc) * FRAC_1_PI;
        }
    }
    (c, s)
}

fn lommel_reduced(mu: f64, nu: f64, b: f64) -> f64 {
    let mut tmp = 1.0 / ((mu + nu + 1.0) * (mu - nu + 1.0));
    let mut res = tmp;
    for n in 1..=100 {
        let nf = n as f64;
        tmp *= (-b / (2.0 * nf + mu - nu + 1.0)) * (b / (2.0 * nf + mu + nu + 1.0));
        res += tmp;
        if tmp.abs() < res.abs() * 1e-50 {
            break;
        }
    }
    res
}

/// Moments for `a == 0`: `∫₀¹ t^k cos(b·t) dt` and `∫₀¹ t^k sin(b·t) dt`, `k < nk`.
fn eval_xy_a_zero(nk: usize, b: f64) -> ([f64; NKK_MAX], [f64; NKK_MAX]) {
    debug_assert!((1..=NKK_MAX).contains(&nk));
    let mut x = [0.0; NKK_MAX];
    let mut y = [0.0; NKK_MAX];
    let sb = sin(b);
    let cb = cos(b);
    let b2 = b * b;
    if b.abs() < 1e-3 {
        x[0] = 1.0 - (b2 / 6.0) * (1.0 - (b2 / 20.0) * (1.0 - (b2 / 42.0)));
        y[0] = (b / 2.0) * (1.0 - (b2 / 12.0) * (1.0 - (b2 / 30.0)));
    } else {
        x[0] = sb / b;
        y[0] = (1.0 - cb) / b;
    }
    // use recurrence in the stable part
    let mut m = floor(2.0 * b) as usize;
    if m >= nk {
        m = nk - 1;
    }
    if m < 1 {
        m = 1;
    }
    for k in 1..m {
        let kf = k as f64;
        x[k] = (sb - kf * y[k - 1]) / b;
        y[k] = (kf * x[k - 1] - cb) / b;
    }
    // use Lommel for the unstable part
    if m < nk {
        let aa = b * sb;
        let dd = sb - b * cb;
        let bb = b * dd;
        let cc = -b2 * sb;
        let m_offset = m as f64 + 0.5;
        let mut r_la = lommel_reduced(m_offset, 1.5, b);
        let mut r_ld = lommel_reduced(m_offset, 0.5, b);
        for k in m..nk {
            let kf = k as f64;
            let r_lb = lommel_reduced(kf + 1.5, 0.5, b);
            let r_lc = lommel_reduced(kf + 1.5, 1.5, b);
            x[k] = (kf * aa * r_la + bb * r_lb + cb) / (1.0 + kf);
            y[k] = (cc * r_lc + sb) / (2.0 + kf) + dd * r_ld;
            r_la = r_lc;
            r_ld = r_lb;
        }
    }
    (x, y)
}

fn eval_xy_a_small(nk: usize, a: f64, b: f64, p: usize) -> ([f64; 3], [f64; 3]) {
    let nkk = nk + 4 * p + 2;
    let (x0, y0) = eval_xy_a_zero(nkk, b);

    let mut x = [0.0; 3];
    let mut y = [0.0; 3];
    for j in 0..nk {
        x[j] = x0[j] - (a / 2.0) * y0[j + 2];
        y[j] = y0[j] + (a / 2.0) * x0[j + 2];
    }

    let mut t = 1.0;
    let aa = -a * a / 4.0;
    for n in 1..=p {
        t *= aa / ((2 * n * (2 * n - 1)) as f64);
        let bf = a / ((4 * n + 2) as f64);
        for j in 0..nk {
            let jj = 4 * n + j;
            x[j] += t * (x0[jj] - bf * y0[jj + 2]);
            y[j] += t * (y0[jj] + bf * x0[jj + 2]);
        }
    }
    (x, y)
}

fn eval_xy_a_large(nk: usize, a: f64, b: f64) -> ([f64; 3], [f64; 3]) {
    let s = a.signum();
    let absa = a.abs();
    let m_1_sqrt_pi = FRAC_2_SQRT_PI * 0.5;
    let z = m_1_sqrt_pi * sqrt(absa);
    let ell = s * b * m_1_sqrt_pi / sqrt(absa);
    let g = -0.5 * s * (b * b) / absa;
    let mut cg = cos(g) / z;
    let mut sg = sin(g) / z;

    let (cl, sl) = fresnel_cs_moments(nk, ell);
    let (cz, sz) = fresnel_cs_moments(nk, ell + z);

    let d_c0 = cz[0] - cl[0];
    let d_s0 = sz[0] - sl[0];

    let mut x = [0.0; 3];
    let mut y = [0.0; 3];
    x[0] = cg * d_c0 - s * sg * d_s0;
    y[0] = sg * d_c0 + s * cg * d_s0;
    if nk > 1 {
        cg /= z;
        sg /= z;
        let d_c1 = cz[1] - cl[1];
        let d_s1 = sz[1] - sl[1];
        let dc = d_c1 - ell * d_c0;
        let ds = d_s1 - ell * d_s0;
        x[1] = cg * dc - s * sg * ds;
        y[1] = sg * dc + s * cg * ds;
        if nk > 2 {
            let d_c2 = cz[2] - cl[2];
            let d_s2 = sz[2] - sl[2];
            let dc = d_c2 + ell * (ell * d_c0 - 2.0 * d_c1);
            let ds = d_s2 + ell * (ell * d_s0 - 2.0 * d_s1);
            cg /= z;
            sg /= z;
            x[2] = cg * dc - s * sg * ds;
            y[2] = sg * dc + s * cg * ds;
        }
    }
    (x, y)
}

/// Generalized Fresnel moments
///
/// `X_k = ∫₀¹ t^k cos(a/2·t² + b·t + c) dt` and
/// `Y_k = ∫₀¹ t^k sin(a/2·t² + b·t + c) dt` for `k < nk`; entries past `nk`
/// are zero. `nk` must be in `1..=3`.
pub fn fresnel_moments(nk: usize, a: f64, b: f64, c: f64) -> ([f64; 3], [f64; 3]) {
    debug_assert!((1..=3).contains(&nk), "nk = {nk} must be in 1..=3");
    let nk = nk.clamp(1, 3);
    let (mut int_c, mut int_s) = if a.abs() < A_THRESHOLD {
        eval_xy_a_small(nk, a, b, A_SERIES_SIZE)
    } else {
        eval_xy_a_large(nk, a, b)
    };

    let cosc = cos(c);
    let sinc = sin(c);
    for k in 0..nk {
        let xx = int_c[k];
        let yy = int_s[k];
        int_c[k] = xx * cosc - yy * sinc;
        int_s[k] = xx * sinc + yy * cosc;
    }
    (int_c, int_s)
}

/// First generalized Fresnel moment pair, `(X_0, Y_0)` of [`fresnel_moments`].
///
/// A clothoid with start heading `theta0`, curvature `kappa0` and curvature
/// rate `dk` reaches `s * fresnel_cs3(dk * s * s, kappa0 * s, theta0)` from its
/// start point after arc length `s`.
pub fn fresnel_cs3(a: f64, b: f64, c: f64) -> (f64, f64) {
    let (int_c, int_s) = fresnel_moments(1, a, b, c);
    (int_c[0], int_s[0])
}

/// Offset of a clothoid from its start point and the heading along it, each
/// with its first three derivatives in arc length.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Displacement {
    /// `[X, X', X'', X''']`
    pub x: [f64; 4],
    /// `[Y, Y', Y'', Y''']`
    pub y: [f64; 4],
    /// `[θ, θ', θ'', θ''']`
    pub theta: [f64; 4],
}

/// Evaluate [`Displacement`] at arc length `s` for a clothoid starting with
/// heading `theta0`, curvature `kappa0` and curvature rate `dk`.
///
/// Defined for every real `s`; `dk == 0` (arcs and lines) goes through the
/// series branch, never through a division by `dk`.
pub fn displacement(theta0: f64, kappa0: f64, dk: f64, s: f64) -> Displacement {
    let (int_c, int_s) = fresnel_cs3(dk * s * s, kappa0 * s, theta0);
    let kappa = kappa0 + dk * s;
    let theta = theta0 + s * (kappa0 + 0.5 * dk * s);
    let sin_t = sin(theta);
    let cos_t = cos(theta);
    Displacement {
        x: [
            s * int_c,
            cos_t,
            -sin_t * kappa,
            -cos_t * kappa * kappa - sin_t * dk,
        ],
        y: [
            s * int_s,
            sin_t,
            cos_t * kappa,
            -sin_t * kappa * kappa + cos_t * dk,
        ],
        theta: [theta, kappa, dk, 0.0],
    }
}
