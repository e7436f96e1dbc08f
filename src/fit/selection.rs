//! Model comparison using BIC with guardrails.
//!
//! The tool fits each requested model and computes:
//! - SSE / RMSE
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Exclude underdetermined models: require `n >= k + 1`
//! 2. Choose the model with minimum BIC
//! 3. If a simpler model is within ΔBIC < 2 of the best, pick the simpler model

use rayon::prelude::*;

use crate::domain::{FitResult, ModelKind, Observations, SolverOptions};
use crate::error::{DataError, FitError};
use crate::fit::fitter::fit_observations;

/// Minimum number of extra observations beyond parameter count.
const MIN_N_BUFFER: usize = 1;

/// BIC gap under which the simpler model is preferred.
const BIC_SIMPLICITY_MARGIN: f64 = 2.0;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct ModelComparison {
    pub best: FitResult,
    /// Successful fits, best BIC first.
    pub fits: Vec<FitResult>,
    /// Models that were not attempted, and why.
    pub skipped: Vec<(ModelKind, String)>,
    /// Models whose fit was attempted and failed.
    pub failed: Vec<(ModelKind, FitError)>,
}

/// Fit every model in `models` and select the best by BIC.
///
/// Fits run in parallel; the outcome does not depend on scheduling.
pub fn compare_models(
    obs: &Observations,
    models: &[ModelKind],
    options: &SolverOptions,
) -> Result<ModelComparison, FitError> {
    let n = obs.len();
    let mut skipped = Vec::new();
    let mut attempted = Vec::new();

    for &kind in models {
        let k = kind.param_count();
        if n < k + MIN_N_BUFFER {
            skipped.push((
                kind,
                format!("Underdetermined: n={n} < k+{MIN_N_BUFFER}={}", k + MIN_N_BUFFER),
            ));
        } else {
            attempted.push(kind);
        }
    }

    let outcomes: Vec<(ModelKind, Result<FitResult, FitError>)> = attempted
        .par_iter()
        .map(|&kind| (kind, fit_observations(kind, obs, None, options)))
        .collect();

    let mut fits = Vec::new();
    let mut failed = Vec::new();
    for (kind, outcome) in outcomes {
        match outcome {
            Ok(fit) => fits.push(fit),
            Err(err) => failed.push((kind, err)),
        }
    }

    if fits.is_empty() {
        if let Some((_, err)) = failed.first() {
            return Err(err.clone());
        }
        let simplest = models.iter().copied().min_by_key(|m| m.param_count());
        return Err(match simplest {
            Some(model) => DataError::TooFewObservations {
                model,
                required: model.param_count() + MIN_N_BUFFER,
                got: n,
            },
            None => DataError::Empty,
        }
        .into());
    }

    // Stable: equal BIC keeps the caller's order.
    fits.sort_by(|a, b| {
        a.quality
            .bic
            .partial_cmp(&b.quality.bic)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let best = select_by_bic(&fits);

    Ok(ModelComparison {
        best,
        fits,
        skipped,
        failed,
    })
}

/// Pick the least complex fit whose BIC is within the margin of the minimum.
fn select_by_bic(fits: &[FitResult]) -> FitResult {
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.quality.bic < best.quality.bic {
            best = f;
        }
    }
    let best_bic = best.quality.bic;

    // Iterate in order of increasing complexity and pick the first fit that
    // is close enough to the best.
    let mut by_complexity: Vec<&FitResult> = fits.iter().collect();
    by_complexity.sort_by_key(|f| f.params.len());
    by_complexity
        .into_iter()
        .find(|f| f.quality.bic - best_bic < BIC_SIMPLICITY_MARGIN)
        .unwrap_or(best)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_line() -> Observations {
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 + 3.0 * v + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        Observations::new(x, y).unwrap()
    }

    #[test]
    fn simpler_model_wins_on_linear_data() {
        let obs = noisy_line();
        let models = [ModelKind::HerschelBulkley, ModelKind::Bingham];
        let cmp = compare_models(&obs, &models, &SolverOptions::default()).unwrap();
        assert_eq!(cmp.best.model, ModelKind::Bingham);
        assert!(cmp.skipped.is_empty());
        assert_eq!(cmp.fits.len() + cmp.failed.len(), 2);
    }

    #[test]
    fn fits_are_ranked_by_bic() {
        let obs = noisy_line();
        let cmp = compare_models(
            &obs,
            &[ModelKind::Bingham, ModelKind::Casson, ModelKind::HerschelBulkley],
            &SolverOptions::default(),
        )
        .unwrap();
        for pair in cmp.fits.windows(2) {
            assert!(pair[0].quality.bic <= pair[1].quality.bic);
        }
    }

    #[test]
    fn underdetermined_models_are_skipped() {
        let obs = Observations::new(vec![1.0, 2.0, 4.0, 8.0], vec![10.0, 7.6, 5.7, 4.4]).unwrap();
        let models = [ModelKind::CarreauYasuda, ModelKind::Cross, ModelKind::PowerLaw];
        let cmp = compare_models(&obs, &models, &SolverOptions::default()).unwrap();
        let skipped: Vec<ModelKind> = cmp.skipped.iter().map(|(m, _)| *m).collect();
        assert_eq!(skipped, vec![ModelKind::CarreauYasuda, ModelKind::Cross]);
        assert_eq!(cmp.best.model, ModelKind::PowerLaw);
    }

    #[test]
    fn nothing_to_fit_is_a_data_error() {
        let obs = Observations::new(vec![1.0, 2.0], vec![3.0, 2.0]).unwrap();
        let err = compare_models(&obs, &[ModelKind::Cross], &SolverOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            FitError::Data(DataError::TooFewObservations { required: 5, got: 2, .. })
        ));
    }
}
