//! This module contains code from <https://github.com/statrs-dev/statrs>
//!
//! The statrs crate contains way more functionality than needed here,
//! so this module only carries the logic necessary to evaluate the
//! Poisson probability mass function for real-valued (non-integer)
//! observations, as required by the genotype likelihood ratio.
#![allow(clippy::excessive_precision)]
#![allow(clippy::unreadable_literal)]

/// Auxiliary variable when evaluating the `gamma_ln` function
const GAMMA_R: f64 = 10.900_511;

/// Polynomial coefficients for approximating the `gamma_ln` function
const GAMMA_DK: &[f64] = &[
    2.48574089138753565546e-5,
    1.05142378581721974210,
    -3.45687097222016235469,
    4.51227709466894823700,
    -2.98285225323576655721,
    1.05639711577126713077,
    -1.95428773191645869583e-1,
    1.70970543404441224307e-2,
    -5.71926117404305781283e-4,
    4.63399473359905636708e-6,
    -2.71994908488607703910e-9,
];

const LN_2_SQRT_E_OVER_PI: f64 = 0.6207822376352452223455184457816472122518527279025978;

/// Constant value for `ln(pi)`
const LN_PI: f64 = 1.1447298858494001741434273513530587116472948129153;

/// Computes the logarithm of the gamma function
/// with an accuracy of 16 floating point digits.
/// The implementation is derived from
/// "An Analysis of the Lanczos Gamma Approximation",
/// Glendon Ralph Pugh, 2004 p. 116
fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let s = GAMMA_DK
            .iter()
            .enumerate()
            .skip(1)
            .fold(GAMMA_DK[0], |s, t| s + t.1 / (t.0 as f64 - x));

        LN_PI
            - (std::f64::consts::PI * x).sin().ln()
            - s.ln()
            - LN_2_SQRT_E_OVER_PI
            - (0.5 - x) * ((0.5 - x + GAMMA_R) / std::f64::consts::E).ln()
    } else {
        let s = GAMMA_DK
            .iter()
            .enumerate()
            .skip(1)
            .fold(GAMMA_DK[0], |s, t| s + t.1 / (x + t.0 as f64 - 1.0));

        s.ln() + LN_2_SQRT_E_OVER_PI + (x - 0.5) * ((x - 0.5 + GAMMA_R) / std::f64::consts::E).ln()
    }
}

/// A Poisson distribution evaluated continuously
///
/// The pmf is extended from integer counts to non-negative reals by
/// replacing the factorial with the gamma function:
///
/// ```text
/// ln pmf(x) = x·ln(λ) - λ - ln Γ(x + 1)
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Poisson {
    lambda: f64,
}

impl Poisson {
    /// Constructs a new Poisson distribution with rate `lambda`
    ///
    /// # Errors
    ///
    /// If `lambda` is not a positive, finite number
    pub fn new(lambda: f64) -> Result<Poisson, String> {
        if lambda <= 0.0 || !lambda.is_finite() {
            Err("Invalid params".to_string())
        } else {
            Ok(Poisson { lambda })
        }
    }

    /// Calculates the log of the continuous probability mass function
    /// at `x`
    ///
    /// `x` must be non-negative; the result is always finite for finite
    /// `x`.
    pub fn ln_pmf(&self, x: f64) -> f64 {
        x * self.lambda.ln() - self.lambda - ln_gamma(x + 1.0)
    }

    /// Calculates the continuous probability mass function at `x`
    pub fn pmf(&self, x: f64) -> f64 {
        self.ln_pmf(x).exp()
    }
}
