//! Bounded quasi-Newton minimizer for the sum-of-squares objective.
//!
//! Projected BFGS in coordinates scaled by the starting point (`u_j = p_j / s_j`),
//! so parameters that differ by orders of magnitude move on a common scale.
//! The line search is Armijo backtracking along the projected path.

use nalgebra::{DMatrix, DVector};

use crate::domain::{SolverOptions, SolverTrace, Termination, TraceStep};
use crate::error::DivergenceReason;
use crate::fit::solver::{Problem, SolveFailure, SolveOutcome, finish, norm_inf};

/// Armijo sufficient-decrease constant.
const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACK: usize = 60;
/// Length (scaled units) of a steepest-descent step after a Hessian reset.
const RESET_STEP: f64 = 0.1;
const STALL_GRADIENT: f64 = 1e-4;

/// Minimize `Σ (y - ŷ(p))²` over the box, starting from `p0`.
pub fn projected_bfgs(
    problem: &Problem<'_>,
    p0: &[f64],
    options: &SolverOptions,
) -> Result<SolveOutcome, SolveFailure> {
    let k = p0.len();
    let bounds = problem.bounds;
    let s = problem.scale().to_vec();

    let mut p = p0.to_vec();
    bounds.project(&mut p);
    let mut f = problem.cost(&p);
    let mut evaluations = 1;
    let mut trace = SolverTrace::new();

    if !f.is_finite() {
        return Err(SolveFailure {
            reason: DivergenceReason::NonFiniteStart,
            last_params: p,
            iterations: 0,
            evaluations,
            trace,
        });
    }

    let mut g = scaled_gradient(problem, &p, &s);
    evaluations += 2 * k;
    let mut h = DMatrix::<f64>::identity(k, k);
    let mut fresh = true;

    for iteration in 1..=options.max_iter {
        let done = iteration - 1;
        if f <= problem.zero_cost() {
            return finish(p, done, evaluations, Termination::ZeroResidual, trace);
        }

        // The minimizing direction is -g; freeze coordinates it would push out of the box.
        let free: Vec<usize> = (0..k)
            .filter(|&j| {
                !(bounds.at_lower(j, p[j]) && g[j] >= 0.0) && !(bounds.at_upper(j, p[j]) && g[j] <= 0.0)
            })
            .collect();
        if free.is_empty() {
            return finish(p, done, evaluations, Termination::GradientTolerance, trace);
        }

        let projected: Vec<f64> = free.iter().map(|&j| g[j]).collect();
        let pg = norm_inf(&projected);
        let g_scale = (2.0 * f.sqrt() * problem.y_norm()).max(f64::MIN_POSITIVE);
        if pg <= options.g_tol * g_scale {
            return finish(p, done, evaluations, Termination::GradientTolerance, trace);
        }

        let mut d = direction(&h, &g, &free, fresh, pg);
        let slope: f64 = d.iter().zip(&g).map(|(a, b)| a * b).sum();
        if slope.is_nan() || slope >= 0.0 {
            h = DMatrix::identity(k, k);
            fresh = true;
            d = direction(&h, &g, &free, fresh, pg);
        }

        let mut t = 1.0;
        let mut accepted: Option<(Vec<f64>, f64)> = None;
        for _ in 0..MAX_BACKTRACK {
            let mut trial: Vec<f64> = (0..k).map(|j| (p[j] / s[j] + t * d[j]) * s[j]).collect();
            bounds.project(&mut trial);
            let trial_f = problem.cost(&trial);
            evaluations += 1;

            let decrease: f64 = (0..k).map(|j| g[j] * (trial[j] - p[j]) / s[j]).sum();
            if trial_f.is_finite() && trial_f < f && trial_f <= f + ARMIJO * decrease {
                accepted = Some((trial, trial_f));
                break;
            }
            t *= 0.5;
        }

        let Some((trial, trial_f)) = accepted else {
            trace.push(TraceStep {
                iteration,
                cost: f,
                control: 0.0,
                accepted: false,
            });
            if !fresh {
                h = DMatrix::identity(k, k);
                fresh = true;
                continue;
            }
            if pg <= STALL_GRADIENT * g_scale || f <= problem.tiny_cost() {
                return finish(p, iteration, evaluations, Termination::NoFurtherReduction, trace);
            }
            let reason = if problem.all_pinned(&p) {
                DivergenceReason::PinnedAtBounds
            } else {
                DivergenceReason::Stalled
            };
            return Err(SolveFailure {
                reason,
                last_params: p,
                iterations: iteration,
                evaluations,
                trace,
            });
        };

        trace.push(TraceStep {
            iteration,
            cost: trial_f,
            control: t,
            accepted: true,
        });

        let step: Vec<f64> = (0..k).map(|j| (trial[j] - p[j]) / s[j]).collect();
        let u_size = norm_inf(&(0..k).map(|j| p[j] / s[j]).collect::<Vec<_>>());
        let reduction = (f - trial_f) / f;
        let full_step = t == 1.0;

        let g_new = scaled_gradient(problem, &trial, &s);
        evaluations += 2 * k;
        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();

        p = trial;
        f = trial_f;
        g = g_new;

        if f <= problem.zero_cost() {
            return finish(p, iteration, evaluations, Termination::ZeroResidual, trace);
        }
        if full_step && reduction <= options.f_tol {
            return finish(p, iteration, evaluations, Termination::FunctionTolerance, trace);
        }
        if full_step && norm_inf(&step) <= options.x_tol * (1.0 + u_size) {
            return finish(p, iteration, evaluations, Termination::StepTolerance, trace);
        }

        if bfgs_update(&mut h, &step, &y, fresh) {
            fresh = false;
        }
    }

    Err(SolveFailure {
        reason: DivergenceReason::IterationLimit,
        last_params: p,
        iterations: options.max_iter,
        evaluations,
        trace,
    })
}

/// Gradient of the cost with respect to the scaled coordinates.
fn scaled_gradient(problem: &Problem<'_>, p: &[f64], s: &[f64]) -> Vec<f64> {
    problem
        .gradient(p)
        .into_iter()
        .zip(s)
        .map(|(g, s)| g * s)
        .collect()
}

/// Quasi-Newton direction on the free coordinates, zero elsewhere.
fn direction(h: &DMatrix<f64>, g: &[f64], free: &[usize], fresh: bool, pg: f64) -> Vec<f64> {
    let mut d = vec![0.0; g.len()];
    if fresh {
        for &j in free {
            d[j] = -g[j] * RESET_STEP / pg;
        }
        return d;
    }
    for &i in free {
        d[i] = -free.iter().map(|&j| h[(i, j)] * g[j]).sum::<f64>();
    }
    d
}

/// Inverse-Hessian BFGS update. Returns `false` when the curvature condition fails.
fn bfgs_update(h: &mut DMatrix<f64>, s: &[f64], y: &[f64], fresh: bool) -> bool {
    let s = DVector::from_column_slice(s);
    let y = DVector::from_column_slice(y);
    let sy = s.dot(&y);
    let yy = y.dot(&y);
    if !sy.is_finite() || sy <= 1e-12 * s.norm() * y.norm() || yy == 0.0 {
        return false;
    }

    let k = s.len();
    if fresh {
        *h = DMatrix::identity(k, k) * (sy / yy);
    }

    let rho = 1.0 / sy;
    let eye = DMatrix::<f64>::identity(k, k);
    let left = &eye - (&s * y.transpose()) * rho;
    let right = &eye - (&y * s.transpose()) * rho;
    *h = &left * &*h * &right + (&s * s.transpose()) * rho;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bounds, ModelKind, Observations};
    use crate::fit::grid::log_space;
    use crate::models::{bounds, predict_curve};

    #[test]
    fn power_law_converges_from_a_rough_start() {
        let x = vec![1.0, 2.0, 4.0, 8.0, 16.0];
        let y = predict_curve(ModelKind::PowerLaw, &x, &[10.0, 0.6]);
        let obs = Observations::new(x, y).unwrap();
        let b = Bounds::unbounded(2);
        let p0 = [7.0, 0.8];
        let problem = Problem::new(ModelKind::PowerLaw, &obs, &b, &p0);

        let out = projected_bfgs(&problem, &p0, &SolverOptions::default()).unwrap();
        assert!((out.params[0] - 10.0).abs() < 1e-4, "{:?}", out.params);
        assert!((out.params[1] - 0.6).abs() < 1e-5, "{:?}", out.params);
        assert!(out.trace.iter().any(|s| s.accepted));
    }

    #[test]
    fn carreau_yasuda_objective_is_reduced_to_rounding() {
        let x = log_space(1e-3, 1e4, 29).unwrap();
        let truth = [1000.0, 5.0, 1.0, 1.5, 0.3];
        let y = predict_curve(ModelKind::CarreauYasudaSse, &x, &truth);
        let obs = Observations::new(x, y).unwrap();
        let b = bounds(ModelKind::CarreauYasudaSse, &obs);
        let p0 = [950.0, 4.0, 1.1, 1.4, 0.32];
        let problem = Problem::new(ModelKind::CarreauYasudaSse, &obs, &b, &p0);

        let start = problem.cost(&p0);
        let out = projected_bfgs(&problem, &p0, &SolverOptions::default()).unwrap();
        assert!(problem.cost(&out.params) < 1e-8 * start, "{:?}", out.params);
    }

    #[test]
    fn respects_lower_bounds() {
        // Unconstrained optimum has a negative intercept.
        let obs = Observations::new(vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 5.0, 8.0, 11.0]).unwrap();
        let b = Bounds {
            lower: vec![0.0, f64::NEG_INFINITY],
            upper: vec![f64::INFINITY, f64::INFINITY],
        };
        let p0 = [1.0, 1.0];
        let problem = Problem::new(ModelKind::Bingham, &obs, &b, &p0);
        let out = projected_bfgs(&problem, &p0, &SolverOptions::default()).unwrap();
        assert_eq!(out.params[0], 0.0);
        assert!((out.params[1] - 80.0 / 30.0).abs() < 1e-5, "{:?}", out.params);
    }

    #[test]
    fn non_finite_start_is_reported() {
        let obs = Observations::new(vec![0.0, 1.0], vec![1.0, 2.0]).unwrap();
        let b = Bounds::unbounded(2);
        let problem = Problem::new(ModelKind::PowerLaw, &obs, &b, &[1.0, 0.5]);
        let err = projected_bfgs(&problem, &[1.0, 0.5], &SolverOptions::default()).unwrap_err();
        assert_eq!(err.reason, DivergenceReason::NonFiniteStart);
    }
}
