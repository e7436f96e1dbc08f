//! Model evaluation for every GNF equation.
//!
//! The fitter relies on one primitive: predict the response at a shear rate
//! for a parameter vector in the model's declared order. Predictions may be
//! NaN/Inf for pathological parameters; callers decide what that means.

use crate::domain::ModelKind;
use crate::math::{asinh_ratio, carreau_factor, cross_factor};

/// Predict the response (viscosity or stress) at shear rate `x`.
///
/// # Panics
/// Panics if `p` is shorter than `model.param_count()`.
pub fn predict(model: ModelKind, x: f64, p: &[f64]) -> f64 {
    match model {
        ModelKind::CarreauYasuda | ModelKind::CarreauYasudaSse => {
            // η = η∞ + (η0 - η∞)(1 + (λx)^a)^((n-1)/a)
            p[1] + (p[0] - p[1]) * carreau_factor(p[2] * x, p[3], p[4])
        }
        ModelKind::Cross | ModelKind::Ellis => {
            // η = η∞ + (η0 - η∞) / (1 + (λx)^a)
            p[1] + (p[0] - p[1]) * cross_factor(p[2] * x, p[3])
        }
        // η = η∞ + λ(x^n - 1)
        ModelKind::Sisko => p[0] + p[1] * (x.powf(p[2]) - 1.0),
        // η = η0 / (1 + (λx)^n)
        ModelKind::Williamson => p[0] * cross_factor(p[1] * x, p[2]),
        // η = K x^(n-1)
        ModelKind::PowerLaw => p[0] * x.powf(p[1] - 1.0),
        ModelKind::PowellEyring => {
            // η = η∞ + (η0 - η∞) asinh(λx)/(λx)
            p[1] + (p[0] - p[1]) * asinh_ratio(p[2] * x)
        }
        // τ = τ0 + K x
        ModelKind::Bingham => p[0] + p[1] * x,
        ModelKind::Casson => {
            // √τ = √τ0 + √(K x)
            let root = p[0].sqrt() + (p[1] * x).sqrt();
            root * root
        }
        // τ = τ0 + K x^n
        ModelKind::HerschelBulkley => p[0] + p[1] * x.powf(p[2]),
    }
}

/// Predict the response at every shear rate in `xs`.
pub fn predict_curve(model: ModelKind, xs: &[f64], p: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| predict(model, x, p)).collect()
}

/// Residuals `y - ŷ`.
pub fn residuals(model: ModelKind, xs: &[f64], ys: &[f64], p: &[f64]) -> Vec<f64> {
    xs.iter()
        .zip(ys.iter())
        .map(|(&x, &y)| y - predict(model, x, p))
        .collect()
}
