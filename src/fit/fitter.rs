//! Fit runner for a single model.
//!
//! Given a model, an observation set and an optional caller guess, we:
//!
//! - check the data against the model's requirements
//! - resolve the starting point (caller vector or data-derived default)
//! - run the model's solver inside its box bounds
//! - hand the parameters to the result assembler
//!
//! Nothing here keeps state between calls.

use crate::domain::{
    Axis, FitRequest, FitResult, GuessSource, ModelKind, Observations, SolverOptions, SolverSummary,
    Strategy,
};
use crate::error::{DataError, FitError};
use crate::fit::lm::levenberg_marquardt;
use crate::fit::minimize::projected_bfgs;
use crate::fit::seed::default_guess;
use crate::fit::solver::Problem;
use crate::math::is_constant;
use crate::models::{bounds, param_specs};
use crate::report::assemble_result;

/// Fit `model` to `(x, y)` with default solver options.
pub fn fit(
    model: ModelKind,
    x: &[f64],
    y: &[f64],
    initial_guess: Option<&[f64]>,
) -> Result<FitResult, FitError> {
    let obs = Observations::new(x.to_vec(), y.to_vec())?;
    fit_observations(model, &obs, initial_guess, &SolverOptions::default())
}

pub fn fit_request(request: &FitRequest, options: &SolverOptions) -> Result<FitResult, FitError> {
    fit_observations(
        request.model,
        &request.observations,
        request.initial_guess.as_deref(),
        options,
    )
}

/// Fit `model` to an already validated observation set.
pub fn fit_observations(
    model: ModelKind,
    obs: &Observations,
    initial_guess: Option<&[f64]>,
    options: &SolverOptions,
) -> Result<FitResult, FitError> {
    validate(model, obs)?;

    let b = bounds(model, obs);
    let (mut start, guess_source) = resolve_guess(model, obs, initial_guess)?;
    b.project(&mut start);

    let problem = Problem::new(model, obs, &b, &start);
    let solved = match model.strategy() {
        Strategy::LeastSquares => levenberg_marquardt(&problem, &start, options),
        Strategy::Minimize => projected_bfgs(&problem, &start, options),
    };

    match solved {
        Ok(out) => {
            let summary = SolverSummary {
                strategy: model.strategy(),
                guess_source,
                initial_guess: start,
                bounds: b.clone(),
                iterations: out.iterations,
                evaluations: out.evaluations,
                termination: out.termination,
            };
            Ok(assemble_result(model, obs, &out.params, summary, out.trace))
        }
        // On constant data the missing quality figure is the condition worth reporting.
        Err(failure) if is_constant(obs.y()) => Err(FitError::UndefinedGoodnessOfFit {
            model,
            params: failure.last_params,
        }),
        Err(failure) => Err(FitError::Divergence {
            model,
            reason: failure.reason,
            last_params: failure.last_params,
            iterations: failure.iterations,
        }),
    }
}

/// Check the model-specific requirements on an observation set.
pub fn validate(model: ModelKind, obs: &Observations) -> Result<(), DataError> {
    let required = model.param_count();
    if obs.len() < required {
        return Err(DataError::TooFewObservations {
            model,
            required,
            got: obs.len(),
        });
    }

    let axes = [
        (Axis::ShearRate, model.shear_domain(), obs.x()),
        (Axis::Response, model.response_domain(), obs.y()),
    ];
    for (axis, domain, values) in axes {
        if let Some(index) = values.iter().position(|v| !domain.admits(*v)) {
            return Err(DataError::OutOfDomain {
                model,
                axis,
                requirement: domain.requirement(axis),
                index,
                value: values[index],
            });
        }
    }

    Ok(())
}

/// Decide where the solver starts.
///
/// No guess, an empty guess, or a guess whose every component is zero all
/// mean "use the default". Any other vector is used as-is, without merging
/// defaults into its zero components; a deliberate zero in every slot is
/// therefore indistinguishable from no guess at all.
pub fn resolve_guess(
    model: ModelKind,
    obs: &Observations,
    guess: Option<&[f64]>,
) -> Result<(Vec<f64>, GuessSource), DataError> {
    let guess = match guess {
        Some(g) if g.iter().any(|v| *v != 0.0) => g,
        _ => return Ok((default_guess(model, obs), GuessSource::Default)),
    };

    let expected = model.param_count();
    if guess.len() != expected {
        return Err(DataError::GuessLength {
            model,
            expected,
            got: guess.len(),
        });
    }
    if let Some(i) = guess.iter().position(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteGuess {
            name: param_specs(model)[i].name,
        });
    }

    Ok((guess.to_vec(), GuessSource::Caller))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GoodnessOfFit, Termination};
    use crate::error::DivergenceReason;

    fn obs(x: &[f64], y: &[f64]) -> Observations {
        Observations::new(x.to_vec(), y.to_vec()).unwrap()
    }

    #[test]
    fn zero_guess_means_default() {
        let o = obs(&[1.0, 2.0, 4.0], &[10.0, 7.0, 5.0]);
        let (g, src) = resolve_guess(ModelKind::PowerLaw, &o, Some(&[0.0, 0.0])).unwrap();
        assert_eq!(src, GuessSource::Default);
        assert_eq!(g, default_guess(ModelKind::PowerLaw, &o));

        let (_, src) = resolve_guess(ModelKind::PowerLaw, &o, None).unwrap();
        assert_eq!(src, GuessSource::Default);
    }

    #[test]
    fn partial_guess_is_used_verbatim() {
        let o = obs(&[1.0, 2.0, 4.0], &[10.0, 7.0, 5.0]);
        let (g, src) = resolve_guess(ModelKind::PowerLaw, &o, Some(&[0.0, 0.7])).unwrap();
        assert_eq!(src, GuessSource::Caller);
        assert_eq!(g, vec![0.0, 0.7]);
    }

    #[test]
    fn malformed_guesses_are_data_errors() {
        let o = obs(&[1.0, 2.0, 4.0], &[10.0, 7.0, 5.0]);
        assert_eq!(
            resolve_guess(ModelKind::PowerLaw, &o, Some(&[1.0, 2.0, 3.0])),
            Err(DataError::GuessLength {
                model: ModelKind::PowerLaw,
                expected: 2,
                got: 3
            })
        );
        assert_eq!(
            resolve_guess(ModelKind::PowerLaw, &o, Some(&[1.0, f64::NAN])),
            Err(DataError::NonFiniteGuess { name: "flow_index" })
        );
    }

    #[test]
    fn domain_checks_name_the_offending_value() {
        let o = obs(&[0.0, 1.0, 2.0], &[3.0, 2.0, 1.5]);
        match validate(ModelKind::PowerLaw, &o) {
            Err(DataError::OutOfDomain { axis, index, .. }) => {
                assert_eq!(axis, Axis::ShearRate);
                assert_eq!(index, 0);
            }
            other => panic!("unexpected: {other:?}"),
        }
        // Yield-stress models accept a zero shear rate.
        assert!(validate(ModelKind::Bingham, &o).is_ok());

        let o = obs(&[1.0, 2.0, 3.0], &[3.0, -2.0, 1.5]);
        assert!(matches!(
            validate(ModelKind::Cross, &o),
            Err(DataError::TooFewObservations { required: 4, got: 3, .. })
        ));
        assert!(matches!(
            validate(ModelKind::Williamson, &o),
            Err(DataError::OutOfDomain { axis: Axis::Response, index: 1, .. })
        ));
    }

    #[test]
    fn bingham_line_is_fitted_exactly() {
        let r = fit(
            ModelKind::Bingham,
            &[0.0, 1.0, 2.0, 3.0, 4.0],
            &[2.0, 5.0, 8.0, 11.0, 14.0],
            None,
        )
        .unwrap();
        assert!((r.values()[0] - 2.0).abs() < 1e-9);
        assert!((r.values()[1] - 3.0).abs() < 1e-9);
        assert_eq!(r.solver.termination, Termination::ZeroResidual);
        assert_eq!(r.solver.guess_source, GuessSource::Default);
    }

    #[test]
    fn constant_response_has_no_quality_figure() {
        let r = fit(ModelKind::Bingham, &[1.0, 2.0, 3.0, 4.0], &[5.0; 4], None).unwrap();
        assert_eq!(r.r_squared, GoodnessOfFit::Undefined);
        assert!((r.values()[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn divergence_keeps_the_last_parameters() {
        // One iteration cannot bring a far-off Cross start to convergence.
        let x: Vec<f64> = (0..12).map(|i| 10f64.powf(-2.0 + 0.5 * i as f64)).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 + 498.0 / (1.0 + (2.5 * v).powf(0.75))).collect();
        let o = obs(&x, &y);
        let options = SolverOptions {
            max_iter: 1,
            ..SolverOptions::default()
        };
        let err = fit_observations(ModelKind::Cross, &o, Some(&[50.0, 1.0, 1e-3, 0.3]), &options)
            .unwrap_err();
        match err {
            FitError::Divergence {
                reason,
                last_params,
                iterations,
                ..
            } => {
                assert_eq!(reason, DivergenceReason::IterationLimit);
                assert_eq!(last_params.len(), 4);
                assert_eq!(iterations, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
