//! Goodness-of-fit statistics.
//!
//! `R² = 1 - SSE/SST` with `SSE = Σ(y - ŷ)²` and `SST = Σ(y - ȳ)²`.
//! A constant observed response has `SST = 0`; R² is then reported as
//! `GoodnessOfFit::Undefined` instead of ±Inf/NaN.

use crate::domain::GoodnessOfFit;

pub fn mean(y: &[f64]) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    y.iter().sum::<f64>() / y.len() as f64
}

/// Sum of squared errors between observed and predicted values.
pub fn sse(y: &[f64], y_hat: &[f64]) -> f64 {
    y.iter()
        .zip(y_hat.iter())
        .map(|(a, b)| {
            let r = a - b;
            r * r
        })
        .sum()
}

/// Total sum of squares around the mean.
pub fn sst(y: &[f64]) -> f64 {
    let m = mean(y);
    y.iter().map(|v| (v - m) * (v - m)).sum()
}

/// True when the response carries no variance beyond rounding.
///
/// `[0.1, 0.1, 0.1]` has a mean that is not exactly `0.1` in binary, so an
/// exact `SST == 0` test is not enough.
pub fn is_constant(y: &[f64]) -> bool {
    let scale = y.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tol = 4.0 * f64::EPSILON * scale;
    sst(y) <= y.len() as f64 * tol * tol
}

/// Coefficient of determination.
pub fn r_squared(y: &[f64], y_hat: &[f64]) -> GoodnessOfFit {
    if y.is_empty() || is_constant(y) {
        return GoodnessOfFit::Undefined;
    }
    GoodnessOfFit::Defined {
        r_squared: 1.0 - sse(y, y_hat) / sst(y),
    }
}

pub fn rmse(sse: f64, n: usize) -> f64 {
    (sse / n.max(1) as f64).sqrt()
}

/// Bayesian information criterion for a Gaussian least-squares fit.
///
/// `BIC = n ln(SSE/n) + k ln(n)`. An exact fit (SSE = 0) is floored so the
/// value stays finite and still ranks first.
pub fn bic(sse: f64, n: usize, k: usize) -> f64 {
    let n_f = n.max(1) as f64;
    let sse = sse.max(f64::MIN_POSITIVE);
    n_f * (sse / n_f).ln() + k as f64 * n_f.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn perfect_prediction_gives_exactly_one() {
        let y = [3.0, 1.5, 0.75, 0.2];
        assert_eq!(r_squared(&y, &y), GoodnessOfFit::Defined { r_squared: 1.0 });
    }

    #[test]
    fn mean_prediction_gives_zero() {
        let y = [1.0, 2.0, 3.0];
        let y_hat = [2.0, 2.0, 2.0];
        assert_eq!(r_squared(&y, &y_hat).value(), Some(0.0));
    }

    #[test]
    fn constant_response_is_undefined() {
        let y = [5.0, 5.0, 5.0, 5.0];
        assert!(r_squared(&y, &[4.0, 5.0, 6.0, 5.0]).is_undefined());
        assert!(is_constant(&[0.1, 0.1, 0.1]));
        assert!(!is_constant(&[0.1, 0.1, 0.1000001]));
    }

    #[test]
    fn bic_penalizes_parameters() {
        assert!(bic(1.0, 20, 2) < bic(1.0, 20, 4));
        assert!(bic(0.0, 20, 2).is_finite());
    }

    proptest! {
        #[test]
        fn r_squared_never_exceeds_one(
            y in proptest::collection::vec(-1e3f64..1e3, 2..40),
            noise in proptest::collection::vec(-10.0f64..10.0, 40),
        ) {
            let y_hat: Vec<f64> = y.iter().zip(noise.iter()).map(|(a, e)| a + e).collect();
            if let Some(r2) = r_squared(&y, &y_hat).value() {
                prop_assert!(r2 <= 1.0);
            }
        }

        #[test]
        fn exact_curve_scores_one(y in proptest::collection::vec(0.1f64..1e4, 2..40)) {
            match r_squared(&y, &y) {
                GoodnessOfFit::Defined { r_squared } => prop_assert_eq!(r_squared, 1.0),
                GoodnessOfFit::Undefined => prop_assert!(is_constant(&y)),
            }
        }
    }
}
