//! Reporting utilities: result assembly, residuals and formatted output.

pub mod format;

use crate::domain::{
    FitQuality, FitResult, FittedParam, ModelKind, Observations, SolverSummary, SolverTrace,
};
use crate::math::{bic, r_squared, rmse, sse};
use crate::models::{param_specs, predict_curve};

/// Per-point comparison of observation and fitted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointResidual {
    pub x: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}

/// Bundle fitted parameters, the fitted curve at the observed shear rates
/// and the quality figures into one result value.
pub fn assemble_result(
    model: ModelKind,
    obs: &Observations,
    params: &[f64],
    solver: SolverSummary,
    trace: SolverTrace,
) -> FitResult {
    let y_fit = predict_curve(model, obs.x(), params);
    let n = obs.len();
    let sse = sse(obs.y(), &y_fit);

    let params = param_specs(model)
        .iter()
        .zip(params)
        .map(|(spec, &value)| FittedParam {
            name: spec.name.to_string(),
            symbol: spec.symbol.to_string(),
            value,
        })
        .collect::<Vec<_>>();
    let k = params.len();

    FitResult {
        model,
        display_name: model.display_name().to_string(),
        params,
        x: obs.x().to_vec(),
        y_obs: obs.y().to_vec(),
        r_squared: r_squared(obs.y(), &y_fit),
        y_fit,
        quality: FitQuality {
            sse,
            rmse: rmse(sse, n),
            bic: bic(sse, n, k),
            n,
        },
        solver,
        trace,
    }
}

/// Observed vs fitted value at each input point.
pub fn compute_residuals(fit: &FitResult) -> Vec<PointResidual> {
    fit.x
        .iter()
        .zip(&fit.y_obs)
        .zip(&fit.y_fit)
        .map(|((&x, &y_obs), &y_fit)| PointResidual {
            x,
            y_obs,
            y_fit,
            residual: y_obs - y_fit,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Bounds, GoodnessOfFit, GuessSource, Strategy, Termination};

    pub(crate) fn summary(k: usize) -> SolverSummary {
        SolverSummary {
            strategy: Strategy::LeastSquares,
            guess_source: GuessSource::Default,
            initial_guess: vec![1.0; k],
            bounds: Bounds::unbounded(k),
            iterations: 3,
            evaluations: 17,
            termination: Termination::ZeroResidual,
        }
    }

    #[test]
    fn exact_curve_has_unit_r_squared() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = predict_curve(ModelKind::Bingham, &x, &[2.0, 3.0]);
        let obs = Observations::new(x, y).unwrap();
        let r = assemble_result(ModelKind::Bingham, &obs, &[2.0, 3.0], summary(2), Vec::new());

        assert_eq!(r.r_squared, GoodnessOfFit::Defined { r_squared: 1.0 });
        assert_eq!(r.quality.sse, 0.0);
        assert_eq!(r.params[0].symbol, "τ0");
        assert_eq!(r.param("K"), Some(3.0));
        assert_eq!(r.display_name, "Bingham");
    }

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let obs = Observations::new(vec![1.0, 2.0], vec![100.0, 101.0]).unwrap();
        let r = assemble_result(ModelKind::Bingham, &obs, &[100.0, 0.0], summary(2), Vec::new());
        let res = compute_residuals(&r);
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].residual, 0.0);
        assert_eq!(res[1].residual, 1.0);
        assert_eq!(res[1].y_fit, 100.0);
    }
}
