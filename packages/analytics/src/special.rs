//! Special functions for the discrete power law and the lognormal.
//!
//! The Hurwitz zeta function normalizes the discrete power law; the
//! complementary error function gives normal tail probabilities for the
//! lognormal alternative and the likelihood-ratio p-value. Tail
//! probabilities are computed in log space so that far-tail observations
//! do not underflow to zero.

use std::f64::consts::SQRT_2;

/// `ln(sqrt(2 * pi))`.
pub const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

const MACHEP: f64 = 1.110_223_024_625_156_5e-16;

/// `(2j)! / B_2j` for the Euler-Maclaurin tail of the zeta sum.
const EULER_MACLAURIN: [f64; 12] = [
    12.0,
    -720.0,
    30_240.0,
    -1_209_600.0,
    47_900_160.0,
    -1.892_437_580_318_379_2e9,
    7.472_424_96e10,
    -2.950_130_727_918_164_2e12,
    1.164_678_281_435_006_7e14,
    -4.597_978_722_407_472_6e15,
    1.815_210_540_194_354_7e17,
    -7.166_165_256_175_667e18,
];

/// Hurwitz zeta function `zeta(s, q) = sum_{k >= 0} (q + k)^-s`.
///
/// Defined here for `s > 1` and `q > 0`; returns NaN elsewhere.
#[must_use]
pub fn hurwitz_zeta(s: f64, q: f64) -> f64 {
    if !(s > 1.0 && q > 0.0 && s.is_finite() && q.is_finite()) {
        return f64::NAN;
    }

    // Direct summation of the first terms, then Euler-Maclaurin.
    let mut sum = q.powf(-s);
    let mut a = q;
    let mut b = 0.0;
    let mut i = 0;
    while i < 9 || a <= 9.0 {
        i += 1;
        a += 1.0;
        b = a.powf(-s);
        sum += b;
        if (b / sum).abs() < MACHEP {
            return sum;
        }
    }

    let w = a;
    sum += b * w / (s - 1.0);
    sum -= 0.5 * b;

    let mut factor = 1.0;
    let mut k = 0.0;
    for coefficient in EULER_MACLAURIN {
        factor *= s + k;
        b /= w;
        let term = factor * b / coefficient;
        sum += term;
        if (term / sum).abs() < MACHEP {
            break;
        }
        k += 1.0;
        factor *= s + k;
        b /= w;
        k += 1.0;
    }

    sum
}

/// Chebyshev fit exponent shared by [`erfc`] and [`ln_erfc`]
/// (fractional error below 1.2e-7 everywhere).
fn erfc_exponent(z: f64, t: f64) -> f64 {
    -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))))
}

/// Complementary error function.
#[must_use]
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let ans = t * erfc_exponent(z, t).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Natural log of [`erfc`], finite for large positive arguments.
#[must_use]
pub fn ln_erfc(x: f64) -> f64 {
    if x >= 0.0 {
        let t = 1.0 / (1.0 + 0.5 * x);
        t.ln() + erfc_exponent(x, t)
    } else {
        erfc(x).ln()
    }
}

/// `ln P(Z > z)` for a standard normal `Z`.
#[must_use]
pub fn ln_normal_sf(z: f64) -> f64 {
    -std::f64::consts::LN_2 + ln_erfc(z / SQRT_2)
}

/// `ln phi(z)`, the log density of a standard normal.
#[must_use]
pub fn ln_normal_pdf(z: f64) -> f64 {
    -0.5 * z * z - LN_SQRT_2PI
}

/// `ln P(lo < Z <= hi)` for a standard normal `Z`, with `lo < hi`.
///
/// Differences are taken on whichever tail keeps both terms small, so the
/// result stays accurate when both bounds are far from zero.
#[must_use]
pub fn ln_normal_mass(lo: f64, hi: f64) -> f64 {
    if lo >= 0.0 {
        ln_diff_exp(ln_normal_sf(lo), ln_normal_sf(hi))
    } else if hi <= 0.0 {
        ln_diff_exp(ln_normal_sf(-hi), ln_normal_sf(-lo))
    } else {
        (1.0 - ln_normal_sf(-lo).exp() - ln_normal_sf(hi).exp()).ln()
    }
}

/// `ln(e^a - e^b)` for `a >= b`.
fn ln_diff_exp(a: f64, b: f64) -> f64 {
    if b == f64::NEG_INFINITY {
        a
    } else {
        a + (-(b - a).exp_m1()).ln()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn close(a: f64, b: f64, rel: f64) -> bool {
        (a - b).abs() <= rel * b.abs().max(1e-300)
    }

    #[test]
    fn riemann_zeta_values() {
        assert!(close(hurwitz_zeta(2.0, 1.0), PI * PI / 6.0, 1e-12));
        assert!(close(hurwitz_zeta(4.0, 1.0), PI.powi(4) / 90.0, 1e-12));
        assert!(close(hurwitz_zeta(3.0, 1.0), 1.202_056_903_159_594_2, 1e-12));
    }

    #[test]
    fn zeta_shift_identity() {
        for &(s, q) in &[(1.5, 1.0), (2.5, 10.0), (3.1, 7.0), (1.2, 1000.0), (2.0, 123_456.0)] {
            let lhs = hurwitz_zeta(s, q) - hurwitz_zeta(s, q + 1.0);
            let rhs = q.powf(-s);
            assert!(close(lhs, rhs, 1e-8), "s={s} q={q}: {lhs} vs {rhs}");
        }
    }

    #[test]
    fn zeta_large_q_matches_integral_approximation() {
        // zeta(s, q) ~ q^(1-s) / (s - 1) + q^-s / 2 for large q.
        let (s, q) = (2.5_f64, 1.0e6_f64);
        let approx = q.powf(1.0 - s) / (s - 1.0) + 0.5 * q.powf(-s);
        assert!(close(hurwitz_zeta(s, q), approx, 1e-9));
    }

    #[test]
    fn zeta_outside_domain_is_nan() {
        assert!(hurwitz_zeta(1.0, 1.0).is_nan());
        assert!(hurwitz_zeta(2.0, 0.0).is_nan());
        assert!(hurwitz_zeta(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn erfc_reference_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-7);
        assert!((erfc(1.0) - 0.157_299_207_050_285_13).abs() < 1e-7);
        assert!((erfc(-1.0) - 1.842_700_792_949_715).abs() < 1e-7);
        assert!(close(erfc(3.0), 2.209_049_699_858_544e-5, 1e-6));
    }

    #[test]
    fn ln_erfc_stays_finite_in_far_tail() {
        let v = ln_erfc(40.0);
        assert!(v.is_finite());
        // erfc(x) ~ exp(-x^2) / (x sqrt(pi))
        let asymptotic = -1600.0 - (40.0 * PI.sqrt()).ln();
        assert!((v - asymptotic).abs() < 1e-3);
    }

    #[test]
    fn normal_mass_matches_cdf_differences() {
        // P(-1 < Z <= 1) = 0.682689...
        assert!((ln_normal_mass(-1.0, 1.0).exp() - 0.682_689_492_137_086).abs() < 1e-6);
        // P(1 < Z <= 2) = 0.135905...
        assert!((ln_normal_mass(1.0, 2.0).exp() - 0.135_905_121_983_278_3).abs() < 1e-6);
        // Symmetric on the lower side.
        assert!((ln_normal_mass(-2.0, -1.0) - ln_normal_mass(1.0, 2.0)).abs() < 1e-6);
    }

    #[test]
    fn normal_mass_in_far_tail() {
        let mass = ln_normal_mass(30.0, 30.5);
        assert!(mass.is_finite());
        assert!(mass < ln_normal_sf(30.0));
    }

    #[test]
    fn normal_pdf_at_zero() {
        assert!((ln_normal_pdf(0.0).exp() - 1.0 / (2.0 * PI).sqrt()).abs() < 1e-15);
    }
}
