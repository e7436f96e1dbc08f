//! Linear least squares solver.
//!
//! Two places need small linear regressions:
//!
//! - seeding: for a fixed choice of a model's nonlinear parameters, the
//!   remaining parameters enter linearly and are solved directly
//! - the Levenberg–Marquardt step, which solves the augmented system
//!   `[J; √μ·D] δ = [r; 0]` instead of forming the normal equations
//!
//! Implementation choices:
//! - We use SVD so tall (more rows than columns) and rank-deficient systems
//!   are handled; small singular values are truncated (minimum-norm solution).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Parameter dimensions are tiny (≤ 5 columns), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Columns and the right-hand side are scaled to unit max-norm first, so
/// shear rates spanning hundreds of decades neither overflow inside the
/// decomposition nor get truncated away against a much larger column.
///
/// Returns `None` for non-finite input, or if no tolerance produces a
/// finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let col_scale: Vec<f64> = x
        .column_iter()
        .map(|c| match c.amax() {
            s if s > 0.0 => s,
            _ => 1.0,
        })
        .collect();
    let y_scale = match y.amax() {
        s if s > 0.0 => s,
        _ => 1.0,
    };
    let design = DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] / col_scale[j]);
    let rhs = y / y_scale;

    let svd = design.try_svd(true, true, f64::EPSILON, 1000)?;

    // Singular values below `tol` are treated as zero. Start strict and relax.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        let cutoff = tol * svd.singular_values.max().max(f64::MIN_POSITIVE);
        if let Ok(beta) = svd.solve(&rhs, cutoff) {
            let beta = DVector::from_fn(beta.len(), |j, _| beta[j] * (y_scale / col_scale[j]));
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `y ≈ Σ_j β_j · columns[j]` for β.
///
/// All columns must have the same length as `y`.
pub fn solve_columns(columns: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let m = y.len();
    let k = columns.len();
    if k == 0 || m == 0 || columns.iter().any(|c| c.len() != m) {
        return None;
    }
    let design = DMatrix::from_fn(m, k, |i, j| columns[j][i]);
    let rhs = DVector::from_column_slice(y);
    solve_least_squares(&design, &rhs).map(|beta| beta.iter().copied().collect())
}

/// Ordinary straight-line fit `y ≈ intercept + slope · x`.
pub fn line_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let ones = vec![1.0; x.len()];
    let beta = solve_columns(&[ones, x.to_vec()], y)?;
    Some((beta[0], beta[1]))
}
