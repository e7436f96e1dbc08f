//! Numerically stable kernels shared by the viscosity models.
//!
//! - `asinh_ratio(z) = asinh(z) / z` (Powell-Eyring), with the analytic limit
//!   `1` at `z → 0`
//! - `carreau_factor(z, a, n) = (1 + z^a)^((n - 1) / a)` (Carreau-Yasuda)
//! - `cross_factor(z, a) = 1 / (1 + z^a)` (Cross / Ellis)
//!
//! Numerical notes:
//! - For small `z`, `asinh(z) / z` is a 0/0 form; we switch to a series.
//! - `(1 + u)^e` is evaluated as `exp(e * ln_1p(u))` so tiny `u` keeps precision.
//! - Negative `z` with fractional `a` yields NaN. That is left to the solver,
//!   which treats non-finite residuals as a rejected step.

/// Threshold below which `asinh_ratio` uses its Taylor series.
const SMALL_Z: f64 = 1e-4;

/// Compute `asinh(z) / z` in a numerically stable way.
pub fn asinh_ratio(z: f64) -> f64 {
    if z.abs() < SMALL_Z {
        // Series: asinh(z)/z ≈ 1 - z^2/6 + 3 z^4/40
        let z2 = z * z;
        return 1.0 - z2 / 6.0 + 3.0 * z2 * z2 / 40.0;
    }
    z.asinh() / z
}

/// Compute `(1 + z^a)^((n - 1) / a)`.
pub fn carreau_factor(z: f64, a: f64, n: f64) -> f64 {
    let u = z.powf(a);
    (((n - 1.0) / a) * u.ln_1p()).exp()
}

/// Compute `1 / (1 + z^a)`.
pub fn cross_factor(z: f64, a: f64) -> f64 {
    1.0 / (1.0 + z.powf(a))
}
