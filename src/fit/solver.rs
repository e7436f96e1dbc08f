//! Pieces shared by the two local solvers.

use nalgebra::DMatrix;

use crate::domain::{Bounds, ModelKind, Observations, SolverTrace, Termination};
use crate::error::DivergenceReason;
use crate::models::{predict_curve, residuals};

/// Cube root of machine epsilon: the usual central-difference step factor.
const FD_STEP: f64 = 6.055_454_452_393_343e-6;

/// Cost below `ZERO_COST * Σy²` means the residuals vanished to rounding level.
const ZERO_COST: f64 = 1e-24;

/// Cost below `TINY_COST * Σy²` is accepted when a solver can make no further progress.
const TINY_COST: f64 = 1e-16;

/// A single fitting problem: one model, one observation set, one box.
#[derive(Debug, Clone)]
pub struct Problem<'a> {
    pub model: ModelKind,
    pub obs: &'a Observations,
    pub bounds: &'a Bounds,
    /// Typical magnitude of each parameter, taken from the starting point.
    scale: Vec<f64>,
    y_norm_sq: f64,
}

impl<'a> Problem<'a> {
    pub fn new(model: ModelKind, obs: &'a Observations, bounds: &'a Bounds, p0: &[f64]) -> Self {
        let scale = p0
            .iter()
            .map(|v| if *v != 0.0 && v.is_finite() { v.abs() } else { 1.0 })
            .collect();
        let y_norm_sq = obs.y().iter().map(|v| v * v).sum::<f64>().min(f64::MAX);
        Self {
            model,
            obs,
            bounds,
            scale,
            y_norm_sq,
        }
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn y_norm(&self) -> f64 {
        self.y_norm_sq.sqrt()
    }

    pub fn residuals(&self, p: &[f64]) -> Vec<f64> {
        residuals(self.model, self.obs.x(), self.obs.y(), p)
    }

    /// Sum of squared residuals; NaN/Inf when the prediction is.
    pub fn cost(&self, p: &[f64]) -> f64 {
        sum_sq(&self.residuals(p))
    }

    pub fn zero_cost(&self) -> f64 {
        (ZERO_COST * self.y_norm_sq).max(f64::MIN_POSITIVE)
    }

    pub fn tiny_cost(&self) -> f64 {
        (TINY_COST * self.y_norm_sq).max(f64::MIN_POSITIVE)
    }

    /// Evaluation coordinates `(lo, hi)` for differentiating along parameter `j`.
    ///
    /// Central where the box allows it, one-sided at a bound, `None` when
    /// the box is degenerate in this coordinate.
    pub fn fd_points(&self, p: &[f64], j: usize) -> Option<(f64, f64)> {
        let v = p[j];
        let h = FD_STEP * v.abs().max(self.scale[j]);
        let (lower, upper) = (self.bounds.lower[j], self.bounds.upper[j]);

        let (mut lo, mut hi) = (v - h, v + h);
        if hi > upper {
            hi = v;
            lo = v - h;
        }
        if lo < lower {
            lo = v;
            hi = (v + h).min(upper);
        }
        (hi > lo).then_some((lo, hi))
    }

    /// Jacobian of the prediction, `∂ŷ_i / ∂p_j`. Non-finite entries are zeroed.
    pub fn jacobian(&self, p: &[f64]) -> DMatrix<f64> {
        let m = self.obs.len();
        let k = p.len();
        let mut jac = DMatrix::zeros(m, k);
        let mut shifted = p.to_vec();

        for j in 0..k {
            let Some((lo, hi)) = self.fd_points(p, j) else {
                continue;
            };
            shifted[j] = hi;
            let up = predict_curve(self.model, self.obs.x(), &shifted);
            shifted[j] = lo;
            let down = predict_curve(self.model, self.obs.x(), &shifted);
            shifted[j] = p[j];

            let h = hi - lo;
            for i in 0..m {
                let d = (up[i] - down[i]) / h;
                jac[(i, j)] = if d.is_finite() { d } else { 0.0 };
            }
        }

        jac
    }

    /// Gradient of `cost` with respect to each parameter.
    pub fn gradient(&self, p: &[f64]) -> Vec<f64> {
        let mut shifted = p.to_vec();
        (0..p.len())
            .map(|j| {
                let Some((lo, hi)) = self.fd_points(p, j) else {
                    return 0.0;
                };
                shifted[j] = hi;
                let up = self.cost(&shifted);
                shifted[j] = lo;
                let down = self.cost(&shifted);
                shifted[j] = p[j];
                let d = (up - down) / (hi - lo);
                if d.is_finite() { d } else { 0.0 }
            })
            .collect()
    }

    /// Whether every parameter sits on one of its bounds.
    pub fn all_pinned(&self, p: &[f64]) -> bool {
        p.iter()
            .enumerate()
            .all(|(j, v)| self.bounds.at_lower(j, *v) || self.bounds.at_upper(j, *v))
    }
}

/// A converged solve.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub params: Vec<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
    pub trace: SolverTrace,
}

/// A solve that gave up, with whatever it held at the time.
#[derive(Debug, Clone)]
pub struct SolveFailure {
    pub reason: DivergenceReason,
    pub last_params: Vec<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    pub trace: SolverTrace,
}

/// Package a finished solve, rejecting non-finite parameters.
pub fn finish(
    params: Vec<f64>,
    iterations: usize,
    evaluations: usize,
    termination: Termination,
    trace: SolverTrace,
) -> Result<SolveOutcome, SolveFailure> {
    if params.iter().all(|v| v.is_finite()) {
        Ok(SolveOutcome {
            params,
            iterations,
            evaluations,
            termination,
            trace,
        })
    } else {
        Err(SolveFailure {
            reason: DivergenceReason::NonFiniteSolution,
            last_params: params,
            iterations,
            evaluations,
            trace,
        })
    }
}

pub fn sum_sq(v: &[f64]) -> f64 {
    v.iter().map(|r| r * r).sum()
}

pub fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
