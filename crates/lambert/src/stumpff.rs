//! Stumpff-derived auxiliary functions for the universal-variable iteration.
//!
//! The time-of-flight residual needs two combinations of the classical
//! Stumpff functions C(z), S(z):
//!
//! ```text
//! term(z)  = (z·S(z) − 1) / √C(z)   = −√2·cos(√z / 2)      (z ≥ 0)
//!                                     −√2·cosh(√−z / 2)    (z < 0)
//! ratio(z) = S(z) / C(z)^(3/2)
//! ```
//!
//! Evaluating `ratio` from C and S directly is unstable near z = 0: both
//! tend to zero through near-equal floating subtractions. The kernel splits
//! into three regimes:
//!
//! * `|z| >= 0.1`: closed-form half-angle expressions, stable because the
//!   half-angle magnitude is bounded away from zero;
//! * `0 < |z| < 0.1`: fixed 5th-degree Taylor polynomials of the
//!   normalized quantities, Horner-evaluated;
//! * `z = 0` exactly: the constants `(-sqrt(2), sqrt(2)/3)`, bypassing both
//!   paths for bit-exact reproducibility.

use std::f64::consts::SQRT_2;

/// Seam between the Taylor-series band and the closed-form branches.
pub const SERIES_BOUND: f64 = 0.1;

/// `term(0) = −√2`.
pub const TERM_AT_ZERO: f64 = -SQRT_2;

/// `ratio(0) = S(0)/C(0)^(3/2) = √2/3`.
pub const RATIO_AT_ZERO: f64 = SQRT_2 / 3.0;

/// Taylor coefficients of `ratio(z) / (√2/3)` about z = 0.
const RATIO_SERIES: [f64; 6] = [
    1.0,
    3.0 / 40.0,
    17.0 / 4_480.0,
    29.0 / 179_200.0,
    1_181.0 / 189_235_200.0,
    1_393_481.0 / 6_199_345_152_000.0,
];

/// Taylor coefficients of `term(z) / (−√2)` about z = 0, i.e. of cos(√z/2).
const TERM_SERIES: [f64; 6] = [
    1.0,
    -1.0 / 8.0,
    1.0 / 384.0,
    -1.0 / 46_080.0,
    1.0 / 10_321_920.0,
    -1.0 / 3_715_891_200.0,
];

#[inline]
fn horner(coefficients: &[f64; 6], z: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * z + c)
}

/// Evaluate `(term(z), ratio(z))` for one universal-variable guess.
pub fn term_ratio(z: f64) -> (f64, f64) {
    if z == 0.0 {
        return (TERM_AT_ZERO, RATIO_AT_ZERO);
    }
    if z.abs() < SERIES_BOUND {
        return (
            -SQRT_2 * horner(&TERM_SERIES, z),
            RATIO_AT_ZERO * horner(&RATIO_SERIES, z),
        );
    }
    if z > 0.0 {
        let sz = z.sqrt();
        let (sa, ca) = (sz * 0.5).sin_cos();
        let term = -SQRT_2 * ca;
        let ratio = (sz - 2.0 * sa * ca) / (2.0 * SQRT_2 * sa * sa * sa);
        (term, ratio)
    } else {
        let sz = (-z).sqrt();
        let half = sz * 0.5;
        let (sa, ca) = (half.sinh(), half.cosh());
        let term = -SQRT_2 * ca;
        let ratio = (2.0 * sa * ca - sz) / (2.0 * SQRT_2 * sa * sa * sa);
        (term, ratio)
    }
}

/// Element-wise batch form of [`term_ratio`].
pub fn term_ratio_batch(z: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut terms = Vec::with_capacity(z.len());
    let mut ratios = Vec::with_capacity(z.len());
    for &zi in z {
        let (term, ratio) = term_ratio(zi);
        terms.push(term);
        ratios.push(ratio);
    }
    (terms, ratios)
}
