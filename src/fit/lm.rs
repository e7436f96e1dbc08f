//! Bounded Levenberg–Marquardt.
//!
//! Each iteration solves the damped linearization
//!
//! ```text
//! [ J      ] δ = [ r ]
//! [ √μ · D ]     [ 0 ]
//! ```
//!
//! by SVD, where `J = ∂ŷ/∂p`, `r = y - ŷ` and `D` holds the running maximum
//! of the column norms of `J` (Marquardt scaling). Trial points are projected
//! onto the box. Parameters sitting on a bound whose descent direction points
//! out of the box are frozen for that iteration.

use nalgebra::{DMatrix, DVector};

use crate::domain::{SolverOptions, SolverTrace, Termination, TraceStep};
use crate::error::DivergenceReason;
use crate::fit::solver::{Problem, SolveFailure, SolveOutcome, finish, sum_sq};
use crate::math::solve_least_squares;

const MU_INIT: f64 = 1e-3;
const MU_UP: f64 = 10.0;
const MU_DOWN: f64 = 0.3;
const MU_MIN: f64 = 1e-15;
/// Damping beyond this means no step along the gradient reduces the cost.
const MU_MAX: f64 = 1e16;
/// Scaled-gradient cosine under which a stalled point still counts as stationary.
const STALL_COSINE: f64 = 1e-4;

/// Minimize `Σ (y - ŷ(p))²` over the box, starting from `p0`.
pub fn levenberg_marquardt(
    problem: &Problem<'_>,
    p0: &[f64],
    options: &SolverOptions,
) -> Result<SolveOutcome, SolveFailure> {
    let k = p0.len();
    let bounds = problem.bounds;

    let mut p = p0.to_vec();
    bounds.project(&mut p);
    let mut r = problem.residuals(&p);
    let mut evaluations = 1;
    let mut trace = SolverTrace::new();

    if r.iter().any(|v| !v.is_finite()) {
        return Err(SolveFailure {
            reason: DivergenceReason::NonFiniteStart,
            last_params: p,
            iterations: 0,
            evaluations,
            trace,
        });
    }

    let mut cost = sum_sq(&r);
    let mut mu = MU_INIT;
    let mut diag = vec![0.0_f64; k];
    let mut jac = problem.jacobian(&p);
    evaluations += 2 * k;

    for iteration in 1..=options.max_iter {
        let done = iteration - 1;
        if cost <= problem.zero_cost() {
            return finish(p, done, evaluations, Termination::ZeroResidual, trace);
        }

        if jac.iter().all(|v| *v == 0.0) {
            return Err(SolveFailure {
                reason: DivergenceReason::SingularJacobian,
                last_params: p,
                iterations: done,
                evaluations,
                trace,
            });
        }

        let r_vec = DVector::from_column_slice(&r);
        let descent: Vec<f64> = (0..k).map(|j| jac.column(j).dot(&r_vec)).collect();
        for (j, d) in diag.iter_mut().enumerate() {
            *d = d.max(column_norm(&jac, j));
        }

        let free: Vec<usize> = (0..k)
            .filter(|&j| {
                !(bounds.at_lower(j, p[j]) && descent[j] <= 0.0)
                    && !(bounds.at_upper(j, p[j]) && descent[j] >= 0.0)
            })
            .collect();
        if free.is_empty() {
            // Every parameter is held at a bound by its own gradient.
            return finish(p, done, evaluations, Termination::GradientTolerance, trace);
        }

        let cosine = gradient_cosine(&jac, &descent, &free, cost.sqrt());
        if cosine <= options.g_tol {
            return finish(p, done, evaluations, Termination::GradientTolerance, trace);
        }

        let step = damped_step(&jac, &r, &diag, &free, mu);
        let mut trial = p.clone();
        if let Some(delta) = &step {
            for (col, &j) in free.iter().enumerate() {
                trial[j] += delta[col];
            }
        }
        bounds.project(&mut trial);

        let trial_r = problem.residuals(&trial);
        evaluations += 1;
        let trial_cost = sum_sq(&trial_r);

        if step.is_some() && trial_cost.is_finite() && trial_cost < cost {
            let reduction = (cost - trial_cost) / cost;
            let moved = step_norm(&p, &trial);
            let near_gauss_newton = mu < 1.0;

            trace.push(TraceStep {
                iteration,
                cost: trial_cost,
                control: mu,
                accepted: true,
            });

            let small_step = moved <= options.x_tol * (norm(&p) + options.x_tol);
            p = trial;
            r = trial_r;
            cost = trial_cost;
            mu = (mu * MU_DOWN).max(MU_MIN);

            if cost <= problem.zero_cost() {
                return finish(p, iteration, evaluations, Termination::ZeroResidual, trace);
            }
            if near_gauss_newton && reduction <= options.f_tol {
                return finish(p, iteration, evaluations, Termination::FunctionTolerance, trace);
            }
            if near_gauss_newton && small_step {
                return finish(p, iteration, evaluations, Termination::StepTolerance, trace);
            }

            jac = problem.jacobian(&p);
            evaluations += 2 * k;
        } else {
            trace.push(TraceStep {
                iteration,
                cost,
                control: mu,
                accepted: false,
            });

            mu *= MU_UP;
            if mu > MU_MAX {
                if cosine <= STALL_COSINE || cost <= problem.tiny_cost() {
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
            }
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

/// Solve the augmented system restricted to the free columns.
///
/// Works in scaled coordinates `z = D·δ`, where `D` holds the running column
/// norms: `[J·D⁻¹; √μ·I] z = [r; 0]`. Every entry of that matrix stays
/// bounded however large the shear rates are.
fn damped_step(
    jac: &DMatrix<f64>,
    r: &[f64],
    diag: &[f64],
    free: &[usize],
    mu: f64,
) -> Option<DVector<f64>> {
    let m = r.len();
    let kf = free.len();
    let scale: Vec<f64> = free
        .iter()
        .map(|&j| if diag[j] > 0.0 && diag[j].is_finite() { diag[j] } else { 1.0 })
        .collect();
    let damping = mu.sqrt();

    let a = DMatrix::from_fn(m + kf, kf, |row, col| {
        if row < m {
            jac[(row, free[col])] / scale[col]
        } else if row - m == col {
            damping
        } else {
            0.0
        }
    });
    let b = DVector::from_fn(m + kf, |row, _| if row < m { r[row] } else { 0.0 });

    let z = solve_least_squares(&a, &b)?;
    Some(DVector::from_fn(kf, |col, _| z[col] / scale[col]))
}

/// Euclidean norm of a Jacobian column that cannot overflow.
fn column_norm(jac: &DMatrix<f64>, j: usize) -> f64 {
    let col = jac.column(j);
    let big = col.amax();
    if big == 0.0 || !big.is_finite() {
        return big;
    }
    big * col.iter().map(|v| (v / big) * (v / big)).sum::<f64>().sqrt()
}

/// Largest cosine between a free Jacobian column and the residual vector.
fn gradient_cosine(jac: &DMatrix<f64>, descent: &[f64], free: &[usize], r_norm: f64) -> f64 {
    if r_norm == 0.0 {
        return 0.0;
    }
    free.iter()
        .map(|&j| {
            let col_norm = column_norm(jac, j);
            if col_norm == 0.0 {
                0.0
            } else {
                descent[j].abs() / (col_norm * r_norm)
            }
        })
        .fold(0.0, f64::max)
}

fn step_norm(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn norm(v: &[f64]) -> f64 {
    sum_sq(v).sqrt()
}
