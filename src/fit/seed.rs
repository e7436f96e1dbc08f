//! Data-derived starting points.
//!
//! Local solvers are sensitive to where they start, so every model gets a
//! seed computed from the observations:
//!
//! - Power-Law: straight line through `(ln x, ln y)`
//! - Casson: straight line through `(√x, √y)`
//! - everything else: grid search over the nonlinear parameters with the
//!   linear ones solved exactly at each node (see `fit::grid`)
//!
//! The fixed fallback vector is used only when none of this produces a
//! finite candidate. A single fit runs on the calling thread; only
//! `compare_models` fans out across models.

use crate::domain::{Bounds, ModelKind, Observations};
use crate::fit::grid::{nonlinear_grid, nonlinear_params};
use crate::math::{line_fit, solve_columns, sse};
use crate::models::{bounds, fallback_guess, linear_params, param_specs, predict_curve};

/// Default starting point for `model` on `obs`, projected onto the model's bounds.
pub fn default_guess(model: ModelKind, obs: &Observations) -> Vec<f64> {
    let b = bounds(model, obs);

    let transformed = match model {
        ModelKind::PowerLaw => log_log_seed(obs),
        ModelKind::Casson => sqrt_seed(obs),
        _ => None,
    };

    let mut guess = transformed
        .or_else(|| separable_seed(model, obs, &b))
        .unwrap_or_else(|| fallback_guess(model));
    b.project(&mut guess);
    guess
}

/// `ln η = ln K + (n - 1) ln x`.
fn log_log_seed(obs: &Observations) -> Option<Vec<f64>> {
    if obs.x().iter().chain(obs.y()).any(|v| *v <= 0.0) {
        return None;
    }
    let lx: Vec<f64> = obs.x().iter().map(|v| v.ln()).collect();
    let ly: Vec<f64> = obs.y().iter().map(|v| v.ln()).collect();
    let (intercept, slope) = line_fit(&lx, &ly)?;
    let guess = vec![intercept.exp(), slope + 1.0];
    guess.iter().all(|v| v.is_finite()).then_some(guess)
}

/// `√τ = √τ0 + √K · √x`.
fn sqrt_seed(obs: &Observations) -> Option<Vec<f64>> {
    if obs.x().iter().chain(obs.y()).any(|v| *v < 0.0) {
        return None;
    }
    let sx: Vec<f64> = obs.x().iter().map(|v| v.sqrt()).collect();
    let sy: Vec<f64> = obs.y().iter().map(|v| v.sqrt()).collect();
    let (intercept, slope) = line_fit(&sx, &sy)?;
    let guess = vec![intercept.max(0.0).powi(2), slope.max(0.0).powi(2)];
    guess.iter().all(|v| v.is_finite()).then_some(guess)
}

fn separable_seed(model: ModelKind, obs: &Observations, b: &Bounds) -> Option<Vec<f64>> {
    let lin = linear_params(model);
    if lin.is_empty() {
        return None;
    }
    let nonlin = nonlinear_params(model);
    let grid = nonlinear_grid(model, obs);

    // Minimum SSE wins; on ties the earliest grid node is kept.
    let mut best: Option<(Vec<f64>, f64)> = None;
    for node in &grid {
        let Some((params, sse)) = evaluate_node(model, obs, b, lin, &nonlin, node) else {
            continue;
        };
        if best.as_ref().is_none_or(|(_, cur)| sse < *cur) {
            best = Some((params, sse));
        }
    }
    best.map(|(params, _)| params)
}

/// Solve the linear parameters for one grid node and score the result.
fn evaluate_node(
    model: ModelKind,
    obs: &Observations,
    b: &Bounds,
    lin: &[usize],
    nonlin: &[usize],
    node: &[f64],
) -> Option<(Vec<f64>, f64)> {
    let k = param_specs(model).len();
    let mut params = vec![0.0; k];
    for (&i, &v) in nonlin.iter().zip(node) {
        params[i] = v;
    }

    // Column j is the prediction with linear parameter j at one and the others at zero.
    let columns: Vec<Vec<f64>> = lin
        .iter()
        .map(|&j| {
            let mut unit = params.clone();
            unit[j] = 1.0;
            predict_curve(model, obs.x(), &unit)
        })
        .collect();

    let beta = solve_columns(&columns, obs.y())?;
    for (&j, v) in lin.iter().zip(beta) {
        params[j] = v;
    }
    b.project(&mut params);

    let y_hat = predict_curve(model, obs.x(), &params);
    let sse = sse(obs.y(), &y_hat);
    sse.is_finite().then_some((params, sse))
}
