//! Seed grids over the nonlinear parameters of each model.
//!
//! Seeding uses a deterministic grid search: for every node the linear
//! parameters are solved exactly, so only the nonlinear ones need a grid.
//!
//! - It keeps the local solvers away from poor basins.
//! - It is deterministic given the same data.
//! - With at most three nonlinear parameters, a modest grid is cheap.

use crate::domain::{ModelKind, Observations};
use crate::models::{linear_params, param_specs};

/// Grid points per decade for time-constant parameters.
const LAMBDA_PER_DECADE: i32 = 4;

/// Decade range used when the data carries no positive shear rate.
const LAMBDA_DEFAULT_DECADES: (i32, i32) = (-3, 3);

/// Hard limit on the decades spanned by the λ grid.
const LAMBDA_MAX_DECADE: i32 = 12;

const CY_A: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 2.5];
const CY_N: [f64; 5] = [-0.25, 0.0, 0.25, 0.5, 0.75];
const CROSS_A: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];
const ELLIS_A: [f64; 6] = [0.25, 0.5, 0.75, 1.0, 1.5, 2.0];
const WILLIAMSON_N: [f64; 5] = [0.25, 0.5, 0.75, 1.0, 1.25];

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Option<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) || steps < 2 {
        return None;
    }

    let ln_min = min.ln();
    let step = (max.ln() - ln_min) / (steps as f64 - 1.0);
    Some((0..steps).map(|i| (ln_min + step * i as f64).exp()).collect())
}

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Option<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && max > min) || steps < 2 {
        return None;
    }

    let step = (max - min) / (steps as f64 - 1.0);
    Some((0..steps).map(|i| min + step * i as f64).collect())
}

/// Candidate time constants, anchored at powers of ten.
///
/// The span covers `0.1 / x_max` to `10 / x_min`, so the transition `λx ≈ 1`
/// can fall anywhere inside (or just outside) the measured shear range.
pub fn lambda_grid(obs: &Observations) -> Vec<f64> {
    let (lo, hi) = match obs.x_min_positive() {
        Some(x_min) => {
            // Nudge so exact decades do not round to the neighbouring one.
            let lo = ((0.1 / obs.x_max()).log10() + 1e-9).floor() as i32;
            let hi = ((10.0 / x_min).log10() - 1e-9).ceil() as i32;
            (
                lo.clamp(-LAMBDA_MAX_DECADE, LAMBDA_MAX_DECADE),
                hi.clamp(-LAMBDA_MAX_DECADE, LAMBDA_MAX_DECADE),
            )
        }
        None => LAMBDA_DEFAULT_DECADES,
    };

    (lo * LAMBDA_PER_DECADE..=hi * LAMBDA_PER_DECADE)
        .map(|k| 10f64.powf(k as f64 / LAMBDA_PER_DECADE as f64))
        .collect()
}

/// Indices of the parameters that are searched on a grid.
pub fn nonlinear_params(model: ModelKind) -> Vec<usize> {
    let lin = linear_params(model);
    (0..param_specs(model).len()).filter(|i| !lin.contains(i)).collect()
}

/// Cartesian grid over the nonlinear parameters, in `nonlinear_params` order.
///
/// Models without nonlinear parameters get a single empty node.
pub fn nonlinear_grid(model: ModelKind, obs: &Observations) -> Vec<Vec<f64>> {
    let axes: Vec<Vec<f64>> = match model {
        ModelKind::CarreauYasuda | ModelKind::CarreauYasudaSse => {
            vec![lambda_grid(obs), CY_A.to_vec(), CY_N.to_vec()]
        }
        ModelKind::Cross => vec![lambda_grid(obs), CROSS_A.to_vec()],
        ModelKind::Ellis => vec![lambda_grid(obs), ELLIS_A.to_vec()],
        ModelKind::Williamson => vec![lambda_grid(obs), WILLIAMSON_N.to_vec()],
        ModelKind::PowellEyring => vec![lambda_grid(obs)],
        ModelKind::Sisko => vec![lin_space(-1.5, 2.0, 15).unwrap_or_default()],
        ModelKind::HerschelBulkley => vec![lin_space(0.1, 2.0, 20).unwrap_or_default()],
        ModelKind::PowerLaw => vec![lin_space(-1.0, 2.0, 13).unwrap_or_default()],
        ModelKind::Bingham | ModelKind::Casson => vec![],
    };
    cartesian(&axes)
}

fn cartesian(axes: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut out: Vec<Vec<f64>> = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(out.len() * axis.len());
        for prefix in &out {
            for &v in axis {
                let mut node = prefix.clone();
                node.push(v);
                next.push(node);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-12);
        assert!(log_space(0.0, 1.0, 5).is_none());
    }

    #[test]
    fn lin_space_steps_evenly() {
        let v = lin_space(0.1, 2.0, 20).unwrap();
        assert_eq!(v.len(), 20);
        assert!((v[1] - 0.2).abs() < 1e-12);
        assert!((v[19] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn lambda_grid_spans_the_shear_range() {
        let obs = Observations::new(vec![1e-3, 1.0, 1e4], vec![3.0, 2.0, 1.0]).unwrap();
        let grid = lambda_grid(&obs);
        // 1e-5 ..= 1e4 at four points per decade.
        assert_eq!(grid.len(), 37);
        assert!((grid[0] - 1e-5).abs() < 1e-18);
        assert!(grid.iter().any(|&l| (l - 1.0).abs() < 1e-12));
    }

    #[test]
    fn lambda_grid_falls_back_without_positive_shear() {
        let obs = Observations::new(vec![0.0, 0.0], vec![3.0, 2.0]).unwrap();
        assert_eq!(lambda_grid(&obs).len(), 25);
    }

    #[test]
    fn grid_nodes_match_nonlinear_arity() {
        let obs = Observations::new(vec![0.1, 1.0, 10.0], vec![3.0, 2.0, 1.0]).unwrap();
        for model in ModelKind::ALL {
            if model == ModelKind::Casson {
                continue;
            }
            let arity = nonlinear_params(model).len();
            let grid = nonlinear_grid(model, &obs);
            assert!(!grid.is_empty(), "{model}");
            assert!(grid.iter().all(|node| node.len() == arity), "{model}");
        }
        assert_eq!(nonlinear_grid(ModelKind::Bingham, &obs), vec![Vec::<f64>::new()]);
    }
}
